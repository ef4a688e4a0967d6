//! Freshness policy: maximum cache age by file extension.
//!
//! The table enumerates the extensions that expire; anything absent (media,
//! unknown or missing extensions) never expires once cached, encoding the
//! assumption that binary assets are immutable per filename.

use std::collections::HashMap;

/// Sentinel extension for URLs whose path ends in a slash.
pub const ROOT_MARKER: &str = "/";

/// Extension→seconds freshness table. Loaded once at startup, never mutated.
#[derive(Debug, Clone)]
pub struct TtlTable {
    seconds: HashMap<String, u64>,
}

impl TtlTable {
    pub fn new(seconds: HashMap<String, u64>) -> Self {
        Self { seconds }
    }

    /// Maximum age in seconds for the resource at `url`.
    ///
    /// None means "never expire". Total over any string input; an extension
    /// with no table entry is a valid, non-error outcome.
    pub fn ttl_for(&self, url: &str) -> Option<u64> {
        let ext = file_extension(url)?;
        self.seconds.get(&ext.to_ascii_lowercase()).copied()
    }
}

/// Extract the file extension from a URL: the substring after the last dot
/// of the final path segment, ignoring query string and fragment. A path
/// ending in a slash yields the root marker; a segment without a dot yields
/// None.
pub fn file_extension(url: &str) -> Option<&str> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..end];
    if path.ends_with('/') {
        return Some(ROOT_MARKER);
    }
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TtlTable {
        TtlTable::new(HashMap::from([
            (ROOT_MARKER.to_string(), 86_400),
            ("html".to_string(), 86_400),
            ("css".to_string(), 3_600),
        ]))
    }

    #[test]
    fn test_extension_basic() {
        assert_eq!(file_extension("https://example.com/css/style.css"), Some("css"));
    }

    #[test]
    fn test_extension_ignores_query() {
        assert_eq!(file_extension("https://example.com/a.html?v=2"), Some("html"));
        assert_eq!(file_extension("https://example.com/a.html#top"), Some("html"));
    }

    #[test]
    fn test_extension_root() {
        assert_eq!(file_extension("https://example.com/"), Some(ROOT_MARKER));
        assert_eq!(file_extension("https://example.com/docs/?page=1"), Some(ROOT_MARKER));
    }

    #[test]
    fn test_extension_missing() {
        assert_eq!(file_extension("https://example.com/about"), None);
    }

    #[test]
    fn test_ttl_listed_extension() {
        assert_eq!(table().ttl_for("https://example.com/index.html"), Some(86_400));
        assert_eq!(table().ttl_for("https://example.com/style.css"), Some(3_600));
    }

    #[test]
    fn test_ttl_case_insensitive() {
        assert_eq!(table().ttl_for("https://example.com/INDEX.HTML"), Some(86_400));
    }

    #[test]
    fn test_ttl_root() {
        assert_eq!(table().ttl_for("https://example.com/"), Some(86_400));
    }

    #[test]
    fn test_ttl_unlisted_never_expires() {
        assert_eq!(table().ttl_for("https://example.com/images/logo.png"), None);
        assert_eq!(table().ttl_for("https://example.com/video.mp4"), None);
    }

    #[test]
    fn test_ttl_no_extension_never_expires() {
        assert_eq!(table().ttl_for("https://example.com/about"), None);
    }

    #[test]
    fn test_ttl_total_over_garbage() {
        assert_eq!(table().ttl_for(""), None);
        assert_eq!(table().ttl_for("not a url at all"), None);
    }
}
