use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::normalize::normalize_url;

/// Read `urls.txt`: one URL per line, trimmed, blanks dropped. A missing
/// file is an empty list.
pub fn load_urls(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Persist the list sorted and deduplicated, one URL per line with a
/// trailing newline; an empty list writes an empty file.
pub fn save_urls(path: &Path, urls: &[String]) -> Result<()> {
    let unique: BTreeSet<&str> = urls
        .iter()
        .map(String::as_str)
        .filter(|url| !url.is_empty())
        .collect();
    let mut content = String::new();
    for url in &unique {
        content.push_str(url);
        content.push('\n');
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Normalize every entry, dropping empties and duplicates. The `bool`
/// reports whether the result differs from the input, so callers know when
/// to rewrite the file.
pub fn normalize_all(urls: &[String]) -> (Vec<String>, bool) {
    let normalized: Vec<String> = urls
        .iter()
        .map(|url| normalize_url(url))
        .filter(|url| !url.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let changed = normalized != urls;
    (normalized, changed)
}
