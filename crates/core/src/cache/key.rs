//! Request identity for cache addressing.

use sha2::{Digest, Sha256};

/// Identity of a request within a region: SHA-256 over method and resolved
/// URL.
///
/// Only GET requests are ever stored, but the method participates in the
/// hash so a non-GET probe can never alias a cached GET entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey(String);

impl RequestKey {
    /// Compute the key for an arbitrary method and resolved URL.
    pub fn new(method: &str, url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(b"\n");
        hasher.update(url.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Key for a GET of the given resolved URL, the only cacheable shape.
    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
