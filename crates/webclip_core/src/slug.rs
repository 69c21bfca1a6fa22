use sha1::{Digest, Sha1};

use crate::normalize::{host_of, last_path_segment};

/// Number of SHA-1 hex chars used when a slug cannot be derived from text.
const FALLBACK_DIGEST_LEN: usize = 10;

/// Number of content-hash hex chars appended when a slug would collide with
/// a file holding different content.
const COLLISION_SUFFIX_LEN: usize = 6;

/// Reduce arbitrary text to the `[a-z0-9-]` alphabet: lowercase, runs of
/// other characters become a single hyphen, no leading or trailing hyphen.
/// May return an empty string for degenerate input.
pub fn slugify(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut previous_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            output.push(ch.to_ascii_lowercase());
            previous_dash = false;
        } else if !previous_dash && !output.is_empty() {
            output.push('-');
            previous_dash = true;
        }
    }
    while output.ends_with('-') {
        output.pop();
    }
    output
}

/// Derive the filesystem identifier for a page: `<domain>-<base>`, where the
/// base token is the slugified title, else the slugified last path segment,
/// else the domain token itself (not repeated). Degenerate inputs that leave
/// nothing slug-safe fall back to a SHA-1 prefix of the URL, so the result
/// is never empty.
pub fn page_slug(title: &str, url: &str) -> String {
    let domain_token = slugify(&host_of(url));
    let base = {
        let from_title = slugify(title);
        if !from_title.is_empty() {
            from_title
        } else {
            last_path_segment(url)
                .map(|segment| slugify(&segment))
                .filter(|segment| !segment.is_empty())
                .unwrap_or_else(|| domain_token.clone())
        }
    };

    let combined = if domain_token.is_empty() || base == domain_token {
        base
    } else {
        format!("{domain_token}-{base}")
    };
    if combined.is_empty() {
        return sha1_hex(url)[..FALLBACK_DIGEST_LEN].to_string();
    }
    combined
}

/// Slug variant used when `slug` already names a file with different
/// content: suffix with the first hex chars of the new content hash.
pub fn collided_slug(slug: &str, content_hash: &str) -> String {
    let suffix = &content_hash[..COLLISION_SUFFIX_LEN.min(content_hash.len())];
    format!("{slug}-{suffix}")
}

fn sha1_hex(value: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::{collided_slug, page_slug, slugify};

    fn assert_slug_alphabet(slug: &str) {
        assert!(!slug.is_empty());
        assert!(
            slug.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-'),
            "slug {slug:?} leaves the [a-z0-9-] alphabet"
        );
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Intro Guide"), "intro-guide");
        assert_eq!(slugify("  A -- B  "), "a-b");
        assert_eq!(slugify("example.com"), "example-com");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn page_slug_prefers_title() {
        assert_eq!(
            page_slug("Intro Guide", "https://example.com/docs/intro"),
            "example-com-intro-guide"
        );
    }

    #[test]
    fn page_slug_falls_back_to_path_segment() {
        assert_eq!(
            page_slug("", "https://example.com/docs/getting-started"),
            "example-com-getting-started"
        );
    }

    #[test]
    fn page_slug_bare_domain_is_not_repeated() {
        assert_eq!(page_slug("", "https://example.com/"), "example-com");
    }

    #[test]
    fn page_slug_never_empty() {
        for (title, url) in [
            ("", "https://example.com"),
            ("", "https://***/"),
            ("!!!", "https://---/..."),
            ("", ""),
        ] {
            assert_slug_alphabet(&page_slug(title, url));
        }
    }

    #[test]
    fn degenerate_inputs_use_digest_fallback() {
        let slug = page_slug("", "https://***/");
        assert_eq!(slug.len(), 10);
        assert_slug_alphabet(&slug);
        // Deterministic for the same URL.
        assert_eq!(slug, page_slug("", "https://***/"));
    }

    #[test]
    fn collided_slug_appends_hash_prefix() {
        let hash = "abcdef0123456789";
        assert_eq!(collided_slug("example-com-intro", hash), "example-com-intro-abcdef");
    }
}
