use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::ClipConfig;
use crate::normalize::host_of;

/// One fetched page as reported by the scrape provider. A call either
/// returns a complete result or fails; there is no partial success.
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub title: String,
    pub source_url: String,
    pub source_domain: String,
    pub status_code: Option<u16>,
    pub markdown: String,
}

/// Seam over the third-party scrape provider so the refresh pipeline can be
/// driven by a mock in tests. Retry policy lives in the caller.
pub trait ScrapeApi {
    fn scrape(&mut self, url: &str) -> Result<ScrapedPage>;
    fn request_count(&self) -> usize;
}

/// Blocking client for a Firecrawl-compatible scrape endpoint.
pub struct FirecrawlClient {
    client: Client,
    api_url: String,
    api_key: String,
    user_agent: String,
    request_count: usize,
}

impl FirecrawlClient {
    /// Build a client from resolved configuration. A missing credential is
    /// the one fatal configuration error: it aborts before any fetch.
    pub fn from_config(config: &ClipConfig, timeout: Duration) -> Result<Self> {
        let Some(api_key) = config.api_key() else {
            bail!(
                "FIRECRAWL_API_KEY is not set; provide it via the environment, a .env file, or webclip.toml"
            );
        };
        Self::new(config.api_url(), api_key, config.user_agent(), timeout)
    }

    pub fn new(
        api_url: String,
        api_key: String,
        user_agent: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build scrape HTTP client")?;
        Ok(Self {
            client,
            api_url,
            api_key,
            user_agent,
            request_count: 0,
        })
    }
}

impl ScrapeApi for FirecrawlClient {
    fn scrape(&mut self, url: &str) -> Result<ScrapedPage> {
        self.request_count = self.request_count.saturating_add(1);
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("User-Agent", self.user_agent.clone())
            .json(&serde_json::json!({ "url": url, "formats": ["markdown"] }))
            .send()
            .with_context(|| format!("failed to call scrape API for {url}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("scrape API returned HTTP {} for {url}", status.as_u16());
        }
        let payload: Value = response
            .json()
            .context("failed to decode scrape API JSON response")?;
        parse_scrape_payload(url, &payload)
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

/// Extract a [`ScrapedPage`] from a provider payload. The response shape has
/// drifted across provider versions, so field lookup is tolerant: the body
/// may live under `data.markdown`, `data.content`, or at the top level, and
/// metadata keys appear in both camelCase and snake_case.
pub fn parse_scrape_payload(requested_url: &str, payload: &Value) -> Result<ScrapedPage> {
    if payload.get("success").and_then(Value::as_bool) == Some(false) {
        let message = payload
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown provider error");
        bail!("scrape API error for {requested_url}: {message}");
    }

    let data = payload.get("data").unwrap_or(payload);
    let markdown = data
        .get("markdown")
        .or_else(|| data.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let metadata = data.get("metadata").unwrap_or(&Value::Null);
    let title = metadata
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback_title(requested_url));
    let source_url = metadata
        .get("sourceURL")
        .or_else(|| metadata.get("source_url"))
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(requested_url)
        .to_string();
    let status_code = metadata
        .get("statusCode")
        .or_else(|| metadata.get("status_code"))
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok());

    let source_domain = host_of(&source_url);
    Ok(ScrapedPage {
        title,
        source_url,
        source_domain,
        status_code,
        markdown,
    })
}

/// Display title for pages where the provider reported none: the URL with
/// its scheme and any trailing slash removed.
fn fallback_title(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, after)| after);
    rest.trim_end_matches('/').to_string()
}
