use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::scrape::ScrapedPage;

#[derive(Debug, Deserialize)]
struct StoredHeader {
    hash: Option<String>,
}

pub fn document_path(content_dir: &Path, slug: &str) -> PathBuf {
    content_dir.join(format!("{slug}.md"))
}

/// Serialize a fetched page: delimited metadata header, a blank line, then
/// the raw Markdown body verbatim.
pub fn render_document(page: &ScrapedPage, content_hash: &str, fetched_at: &str) -> String {
    let header = [
        "---".to_string(),
        format!("title: \"{}\"", page.title.replace('"', "\\\"")),
        format!("source_url: {}", page.source_url),
        format!("source_domain: {}", page.source_domain),
        format!("date_fetched: {fetched_at}"),
        format!("hash: {content_hash}"),
        "---".to_string(),
    ]
    .join("\n");
    format!("{header}\n\n{}", page.markdown)
}

/// Write `<content_dir>/<slug>.md`, creating the directory if absent. The
/// write is unconditional; slug resolution is what prevents overwriting a
/// file that holds different content.
pub fn write_document(
    content_dir: &Path,
    slug: &str,
    page: &ScrapedPage,
    content_hash: &str,
    fetched_at: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(content_dir)
        .with_context(|| format!("failed to create {}", content_dir.display()))?;
    let path = document_path(content_dir, slug);
    fs::write(&path, render_document(page, content_hash, fetched_at))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Content hash recorded in an existing document's metadata header, if the
/// file exists and carries a well-formed 64-hex-char `hash` field.
pub fn read_stored_hash(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    let rest = text.strip_prefix("---\n")?;
    let (header, _) = rest.split_once("\n---\n")?;
    let parsed: StoredHeader = serde_yaml::from_str(header).ok()?;
    parsed
        .hash
        .filter(|hash| hash.len() == 64 && hash.chars().all(|ch| ch.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::hash::content_hash;
    use crate::scrape::ScrapedPage;

    use super::{document_path, read_stored_hash, render_document, write_document};

    fn sample_page() -> ScrapedPage {
        ScrapedPage {
            title: "Intro \"Guide\"".to_string(),
            source_url: "https://example.com/docs/intro".to_string(),
            source_domain: "example.com".to_string(),
            status_code: Some(200),
            markdown: "# Intro\nFirst line.".to_string(),
        }
    }

    #[test]
    fn rendered_document_has_header_blank_line_and_body() {
        let page = sample_page();
        let hash = content_hash(&page.markdown);
        let text = render_document(&page, &hash, "2026-08-06T00:00:00Z");

        assert!(text.starts_with("---\n"));
        assert!(text.contains("title: \"Intro \\\"Guide\\\"\""));
        assert!(text.contains("source_url: https://example.com/docs/intro"));
        assert!(text.contains("source_domain: example.com"));
        assert!(text.contains("date_fetched: 2026-08-06T00:00:00Z"));
        assert!(text.contains(&format!("hash: {hash}")));
        assert!(text.ends_with(&format!("---\n\n{}", page.markdown)));
    }

    #[test]
    fn write_then_read_back_stored_hash() {
        let temp = tempdir().expect("tempdir");
        let content_dir = temp.path().join("content");
        let page = sample_page();
        let hash = content_hash(&page.markdown);

        let path = write_document(&content_dir, "example-com-intro-guide", &page, &hash, "2026-08-06T00:00:00Z")
            .expect("write document");
        assert_eq!(path, document_path(&content_dir, "example-com-intro-guide"));
        assert_eq!(read_stored_hash(&path).as_deref(), Some(hash.as_str()));
    }

    #[test]
    fn stored_hash_is_none_for_missing_or_malformed_files() {
        let temp = tempdir().expect("tempdir");
        assert_eq!(read_stored_hash(&temp.path().join("absent.md")), None);

        let no_header = temp.path().join("plain.md");
        std::fs::write(&no_header, "# Just markdown\n").expect("write file");
        assert_eq!(read_stored_hash(&no_header), None);

        let short_hash = temp.path().join("short.md");
        std::fs::write(&short_hash, "---\nhash: abc123\n---\n\nBody").expect("write file");
        assert_eq!(read_stored_hash(&short_hash), None);
    }
}
