use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "https://api.firecrawl.dev/v1/scrape";
pub const DEFAULT_USER_AGENT: &str = "webclip/0.1";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ClipConfig {
    #[serde(default)]
    pub scrape: ScrapeSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ScrapeSection {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl ClipConfig {
    /// Resolve the scrape endpoint: env WEBCLIP_API_URL > config > default.
    pub fn api_url(&self) -> String {
        if let Some(value) = env_value("WEBCLIP_API_URL") {
            return value;
        }
        self.scrape
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Resolve the provider credential: env FIRECRAWL_API_KEY > config.
    /// `None` means no credential is configured anywhere.
    pub fn api_key(&self) -> Option<String> {
        if let Some(value) = env_value("FIRECRAWL_API_KEY") {
            return Some(value);
        }
        self.scrape
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Resolve user agent: env WEBCLIP_USER_AGENT > config > default.
    pub fn user_agent(&self) -> String {
        if let Some(value) = env_value("WEBCLIP_USER_AGENT") {
            return value;
        }
        self.scrape
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    /// Default per-fetch timeout when the CLI flag is absent.
    pub fn timeout_seconds(&self) -> u64 {
        self.scrape.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }
}

/// Load a ClipConfig from a TOML file. Returns defaults if the file doesn't
/// exist; a file that exists but fails to parse is a hard error.
pub fn load_config(config_path: &Path) -> Result<ClipConfig> {
    if !config_path.exists() {
        return Ok(ClipConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: ClipConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

fn env_value(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::tempdir;

    use super::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECONDS, DEFAULT_USER_AGENT, load_config};

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/webclip.toml")).expect("load config");
        assert_eq!(config.api_url(), DEFAULT_API_URL);
        assert_eq!(config.user_agent(), DEFAULT_USER_AGENT);
        assert_eq!(config.timeout_seconds(), DEFAULT_TIMEOUT_SECONDS);
    }

    #[test]
    fn load_config_parses_scrape_section() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("webclip.toml");
        fs::write(
            &config_path,
            r#"
[scrape]
api_url = "https://scrape.internal/v1/scrape"
api_key = "fc-test-key"
user_agent = "test-agent/1.0"
timeout_seconds = 15
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(
            config.scrape.api_url.as_deref(),
            Some("https://scrape.internal/v1/scrape")
        );
        assert_eq!(config.scrape.api_key.as_deref(), Some("fc-test-key"));
        assert_eq!(config.scrape.user_agent.as_deref(), Some("test-agent/1.0"));
        assert_eq!(config.timeout_seconds(), 15);
    }

    #[test]
    fn load_config_tolerates_partial_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("webclip.toml");
        fs::write(&config_path, "[other]\nkey = 1\n").expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert!(config.scrape.api_key.is_none());
        assert_eq!(config.timeout_seconds(), DEFAULT_TIMEOUT_SECONDS);
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("webclip.toml");
        fs::write(&config_path, "[scrape\napi_key = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }
}
