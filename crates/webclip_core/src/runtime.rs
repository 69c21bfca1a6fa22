use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const CONTENT_DIR_NAME: &str = "content";
pub const DATA_DIR_NAME: &str = "data";
pub const LOGS_DIR_NAME: &str = "logs";
pub const URLS_FILE_NAME: &str = "urls.txt";
pub const CATALOG_FILE_NAME: &str = "catalog.json";
pub const CONFIG_FILE_NAME: &str = "webclip.toml";
pub const LOG_FILE_NAME: &str = "webclip.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Heuristic,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Heuristic => "heuristic",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub project_root: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self { cwd })
    }
}

/// Everything the pipeline writes lives under one project root. Directories
/// are created on demand by the components that write into them.
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub project_root: PathBuf,
    pub content_dir: PathBuf,
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub urls_path: PathBuf,
    pub catalog_path: PathBuf,
    pub config_path: PathBuf,
    pub root_source: ValueSource,
    pub config_source: ValueSource,
}

impl ResolvedPaths {
    /// Catalog entries store document paths relative to the project root,
    /// with `/` separators, so the manifest stays portable.
    pub fn relative_document_path(&self, slug: &str) -> String {
        format!("{CONTENT_DIR_NAME}/{slug}.md")
    }

    pub fn diagnostics(&self) -> String {
        format!(
            "project_root={} ({})\ncontent_dir={}\ndata_dir={}\nlogs_dir={}\nurls_path={}\ncatalog_path={}\nconfig_path={} ({})",
            normalize_for_display(&self.project_root),
            self.root_source.as_str(),
            normalize_for_display(&self.content_dir),
            normalize_for_display(&self.data_dir),
            normalize_for_display(&self.logs_dir),
            normalize_for_display(&self.urls_path),
            normalize_for_display(&self.catalog_path),
            normalize_for_display(&self.config_path),
            self.config_source.as_str(),
        )
    }
}

pub fn resolve_paths(
    context: &ResolutionContext,
    overrides: &PathOverrides,
) -> Result<ResolvedPaths> {
    resolve_paths_with_lookup(context, overrides, |key| env::var(key).ok())
}

fn resolve_paths_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: F,
) -> Result<ResolvedPaths>
where
    F: Fn(&str) -> Option<String>,
{
    let (project_root, root_source) = resolve_project_root(context, overrides, &lookup_env);

    let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
        (absolutize(path, &project_root), ValueSource::Flag)
    } else if let Some(value) = lookup_env("WEBCLIP_CONFIG") {
        (
            absolutize(Path::new(value.trim()), &project_root),
            ValueSource::Env,
        )
    } else {
        (project_root.join(CONFIG_FILE_NAME), ValueSource::Default)
    };

    let data_dir = project_root.join(DATA_DIR_NAME);
    Ok(ResolvedPaths {
        content_dir: project_root.join(CONTENT_DIR_NAME),
        logs_dir: project_root.join(LOGS_DIR_NAME),
        urls_path: project_root.join(URLS_FILE_NAME),
        catalog_path: data_dir.join(CATALOG_FILE_NAME),
        data_dir,
        project_root,
        config_path,
        root_source,
        config_source,
    })
}

fn resolve_project_root<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: &F,
) -> (PathBuf, ValueSource)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = overrides.project_root.as_deref() {
        return (absolutize(path, &context.cwd), ValueSource::Flag);
    }
    if let Some(value) = lookup_env("WEBCLIP_PROJECT_ROOT") {
        return (
            absolutize(Path::new(value.trim()), &context.cwd),
            ValueSource::Env,
        );
    }
    for candidate in context.cwd.ancestors() {
        if candidate.join(URLS_FILE_NAME).exists() || candidate.join(CONTENT_DIR_NAME).is_dir() {
            return (candidate.to_path_buf(), ValueSource::Heuristic);
        }
    }
    (context.cwd.clone(), ValueSource::Default)
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use tempfile::tempdir;

    use super::{
        PathOverrides, ResolutionContext, ValueSource, resolve_paths_with_lookup,
    };

    #[test]
    fn resolve_paths_prefers_flag_over_env() {
        let temp = tempdir().expect("tempdir");
        let cwd = temp.path().join("cwd");
        let from_flag = temp.path().join("flag-root");
        fs::create_dir_all(&cwd).expect("create cwd");

        let overrides = PathOverrides {
            project_root: Some(from_flag.clone()),
            ..PathOverrides::default()
        };
        let context = ResolutionContext { cwd };
        let env = HashMap::from([(
            "WEBCLIP_PROJECT_ROOT".to_string(),
            temp.path().join("env-root").to_string_lossy().to_string(),
        )]);

        let resolved = resolve_paths_with_lookup(&context, &overrides, |key| env.get(key).cloned())
            .expect("resolve paths");
        assert_eq!(resolved.project_root, from_flag);
        assert_eq!(resolved.root_source, ValueSource::Flag);
    }

    #[test]
    fn heuristic_finds_root_containing_urls_file() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("project");
        let nested = root.join("content").join("deep");
        fs::create_dir_all(&nested).expect("create nested");
        fs::write(root.join("urls.txt"), "").expect("write urls");

        let context = ResolutionContext { cwd: nested };
        let resolved = resolve_paths_with_lookup(&context, &PathOverrides::default(), |_| None)
            .expect("resolve paths");
        assert_eq!(resolved.project_root, root);
        assert_eq!(resolved.root_source, ValueSource::Heuristic);
    }

    #[test]
    fn defaults_to_cwd_when_nothing_found() {
        let temp = tempdir().expect("tempdir");
        let cwd = temp.path().join("empty");
        fs::create_dir_all(&cwd).expect("create cwd");

        let context = ResolutionContext { cwd: cwd.clone() };
        let resolved = resolve_paths_with_lookup(&context, &PathOverrides::default(), |_| None)
            .expect("resolve paths");
        assert_eq!(resolved.project_root, cwd);
        assert_eq!(resolved.root_source, ValueSource::Default);
        assert_eq!(resolved.content_dir, cwd.join("content"));
        assert_eq!(resolved.catalog_path, cwd.join("data").join("catalog.json"));
        assert_eq!(resolved.config_path, cwd.join("webclip.toml"));
        assert_eq!(resolved.config_source, ValueSource::Default);
    }

    #[test]
    fn relative_document_path_uses_forward_slashes() {
        let temp = tempdir().expect("tempdir");
        let context = ResolutionContext {
            cwd: temp.path().to_path_buf(),
        };
        let resolved = resolve_paths_with_lookup(&context, &PathOverrides::default(), |_| None)
            .expect("resolve paths");
        assert_eq!(
            resolved.relative_document_path("example-com-intro-guide"),
            "content/example-com-intro-guide.md"
        );
    }
}
