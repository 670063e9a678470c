//! Content digest of obligation text.
//!
//! The digest backs the uniqueness constraint that stops the same
//! obligation text from being registered under two topics. It is computed
//! over the raw UTF-8 bytes; no normalization is applied, so texts that
//! differ only in whitespace are distinct.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the given text.
pub fn text_digest(text: &str) -> String {
    let hash = Sha256::digest(text.as_bytes());
    hash.iter().map(|b| format!("{b:02x}")).collect()
}
