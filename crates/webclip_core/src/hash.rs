use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the raw Markdown body. Byte-identical input is
/// required for equality; this is the sole change-detection signal.
pub fn content_hash(markdown: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(markdown.as_bytes());
    format!("{:x}", hasher.finalize())
}
