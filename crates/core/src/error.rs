//! Unified error types for stow.
//!
//! Every failure the engine can hit maps onto one of these variants. The
//! interceptor never lets any of them escape to the presentation layer; they
//! exist for logging, for operator-visible install/cleanup reports, and for
//! routing inside the engine (network failures route to stale-serve or the
//! offline fallback, corrupt entries route to uncached passthrough).

use tokio_rusqlite::rusqlite;

/// Unified error type for the stow engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One or more manifest assets could not be fetched during install.
    /// Non-fatal to the host lifecycle; the engine still transitions.
    #[error("install incomplete: {failed} of {total} manifest assets failed")]
    InstallIncomplete { failed: usize, total: usize },

    /// A stale region could not be deleted during activation.
    /// Non-fatal; deletion is retried on the next activation.
    #[error("cleanup failed for region {region}: {reason}")]
    CleanupFailed { region: String, reason: String },

    /// Database operation failed.
    #[error("cache store error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("cache store error: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry could not be decoded (bad headers or timestamp).
    /// Fatal for that single request only; the engine falls back to a
    /// direct, uncached network passthrough.
    #[error("corrupt cache entry: {0}")]
    CorruptEntry(String),

    /// URL could not be parsed or resolved against the configured origin.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Transport-level fetch failure (offline, DNS, connection reset).
    #[error("network unavailable: {0}")]
    Network(String),

    /// Fetch did not resolve within the configured timeout.
    #[error("fetch timed out: {0}")]
    Timeout(String),

    /// Fetched response exceeded the configured size cap.
    #[error("response too large: {0}")]
    TooLarge(String),

    /// Upstream answered with an error status.
    #[error("upstream status {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// Command payload did not decode to a known action.
    #[error("malformed command: {0}")]
    BadCommand(String),
}

impl Error {
    /// True for transport failures that the interceptor treats as
    /// "network unavailable" (timeouts included).
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_incomplete_display() {
        let err = Error::InstallIncomplete { failed: 2, total: 8 };
        assert!(err.to_string().contains("2 of 8"));
    }

    #[test]
    fn test_is_network() {
        assert!(Error::Network("connection refused".into()).is_network());
        assert!(Error::Timeout("20s elapsed".into()).is_network());
        assert!(!Error::UpstreamStatus { status: 404, url: "/x".into() }.is_network());
        assert!(!Error::CorruptEntry("bad headers".into()).is_network());
    }
}
