use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub title: String,
    pub path: String,
    pub url: String,
    pub hash: String,
    pub fetched_at: String,
}

/// Manifest of every fetched document. Loaded once per run, mutated in
/// memory, saved once at the end; at most one entry per URL and per path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn find_by_url(&self, url: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.url == url)
    }

    /// Update the entry matching `url` (first) or `path` (second) in place,
    /// or append a new one. `fetched_at` is refreshed on every upsert so the
    /// catalog always records when a URL was last checked, even when its
    /// content did not change.
    pub fn upsert(&mut self, title: &str, path: &str, url: &str, hash: &str, fetched_at: &str) {
        let existing = self
            .items
            .iter()
            .position(|item| item.url == url)
            .or_else(|| self.items.iter().position(|item| item.path == path));
        match existing {
            Some(index) => {
                let item = &mut self.items[index];
                item.title = title.to_string();
                item.path = path.to_string();
                item.url = url.to_string();
                item.hash = hash.to_string();
                item.fetched_at = fetched_at.to_string();
            }
            None => self.items.push(CatalogItem {
                title: title.to_string(),
                path: path.to_string(),
                url: url.to_string(),
                hash: hash.to_string(),
                fetched_at: fetched_at.to_string(),
            }),
        }
    }
}

/// Read the manifest. A missing file yields an empty catalog; unreadable or
/// malformed content logs a warning and also yields an empty catalog so a
/// corrupt manifest never aborts a run.
pub fn load_catalog(path: &Path) -> Catalog {
    if !path.exists() {
        return Catalog::default();
    }
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) => {
            warn!("failed to read {}; starting fresh: {error}", path.display());
            return Catalog::default();
        }
    };
    match serde_json::from_str(&text) {
        Ok(catalog) => catalog,
        Err(error) => {
            warn!("{} is invalid JSON; starting fresh: {error}", path.display());
            Catalog::default()
        }
    }
}

pub fn save_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("catalog path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    let rendered =
        serde_json::to_string_pretty(catalog).context("failed to serialize catalog JSON")?;
    fs::write(path, format!("{rendered}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
