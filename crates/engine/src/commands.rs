//! The asynchronous command channel from the external application.
//!
//! Payloads are decoded once at the boundary into a tagged enum; unknown or
//! malformed messages are logged and ignored, never fatal.

use serde::Deserialize;

use crate::engine::CacheEngine;
use stow_core::{Error, RegionRole, RequestKey};

/// A decoded command message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Command {
    /// Eagerly cache a URL without serving it.
    Cache { url: String },
}

impl Command {
    /// Decode a raw JSON payload.
    pub fn decode(raw: &str) -> Result<Command, Error> {
        serde_json::from_str(raw).map_err(|e| Error::BadCommand(e.to_string()))
    }
}

impl CacheEngine {
    /// Handle one raw command message from the host.
    pub fn handle_message(&self, raw: &str) {
        match Command::decode(raw) {
            Ok(command) => self.dispatch(command),
            Err(e) => tracing::warn!(error = %e, "ignoring unrecognized command message"),
        }
    }

    /// Dispatch a decoded command. Cache population runs detached so it
    /// completes even when the requester has moved on.
    pub fn dispatch(&self, command: Command) {
        match command {
            Command::Cache { url } => {
                let engine = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = engine.precache(&url).await {
                        tracing::debug!(url, error = %e, "precache failed");
                    }
                });
            }
        }
    }

    /// Fetch and store a URL into the content region unless already held.
    ///
    /// Concurrent invocations for the same URL are tolerated: the overwrite
    /// is idempotent, so the last writer wins.
    pub async fn precache(&self, url: &str) -> Result<(), Error> {
        let url = self.resolve(url)?;
        let key = RequestKey::get(url.as_str());
        let content = self.region(RegionRole::Content);

        if content.contains(&key).await? {
            return Ok(());
        }

        let response = self.fetcher.get(&url).await?;
        if response.status.as_u16() >= 400 {
            return Err(Error::UpstreamStatus { status: response.status.as_u16(), url: url.to_string() });
        }

        content.put(&key, &response.to_stored()).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::testing::{StubFetch, engine_with};
    use stow_core::EngineConfig;

    const ORIGIN: &str = "https://app.example.com";

    #[test]
    fn test_decode_cache_command() {
        let command = Command::decode(r#"{"action": "cache", "url": "/slides/3.json"}"#).unwrap();
        assert_eq!(command, Command::Cache { url: "/slides/3.json".to_string() });
    }

    #[test]
    fn test_decode_unknown_action() {
        let result = Command::decode(r#"{"action": "evict", "url": "/a.html"}"#);
        assert!(matches!(result, Err(Error::BadCommand(_))));
    }

    #[test]
    fn test_decode_malformed_payload() {
        assert!(Command::decode("not json").is_err());
        assert!(Command::decode(r#"{"url": "/a.html"}"#).is_err());
        assert!(Command::decode(r#"{"action": "cache"}"#).is_err());
    }

    #[tokio::test]
    async fn test_precache_stores_entry() {
        let fetch = Arc::new(StubFetch::new());
        fetch.respond(&format!("{ORIGIN}/slides/3.json"), 200, "{\"slide\":3}");
        let engine = engine_with(EngineConfig::default(), fetch).await;

        engine.precache("/slides/3.json").await.unwrap();

        let stored = engine
            .region(RegionRole::Content)
            .get(&RequestKey::get(&format!("{ORIGIN}/slides/3.json")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.body, b"{\"slide\":3}");
        assert!(stored.fetched_at.is_some());
    }

    #[tokio::test]
    async fn test_precache_idempotent() {
        let fetch = Arc::new(StubFetch::new());
        fetch.respond(&format!("{ORIGIN}/slides/3.json"), 200, "{\"slide\":3}");
        let engine = engine_with(EngineConfig::default(), fetch.clone()).await;

        engine.precache("/slides/3.json").await.unwrap();
        let first = engine
            .region(RegionRole::Content)
            .get(&RequestKey::get(&format!("{ORIGIN}/slides/3.json")))
            .await
            .unwrap()
            .unwrap();

        engine.precache("/slides/3.json").await.unwrap();
        let second = engine
            .region(RegionRole::Content)
            .get(&RequestKey::get(&format!("{ORIGIN}/slides/3.json")))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(fetch.calls(), 1);
    }

    #[tokio::test]
    async fn test_precache_skips_upstream_error() {
        let fetch = Arc::new(StubFetch::new());
        fetch.respond(&format!("{ORIGIN}/gone.html"), 404, "nope");
        let engine = engine_with(EngineConfig::default(), fetch).await;

        let result = engine.precache("/gone.html").await;

        assert!(matches!(result, Err(Error::UpstreamStatus { status: 404, .. })));
        assert_eq!(engine.region(RegionRole::Content).entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_handle_message_dispatches_cache() {
        let fetch = Arc::new(StubFetch::new());
        fetch.respond(&format!("{ORIGIN}/slides/4.json"), 200, "{\"slide\":4}");
        let engine = engine_with(EngineConfig::default(), fetch).await;

        engine.handle_message(r#"{"action": "cache", "url": "/slides/4.json"}"#);

        // the spawned population task is detached; give it a moment
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(
            engine
                .region(RegionRole::Content)
                .contains(&RequestKey::get(&format!("{ORIGIN}/slides/4.json")))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_handle_message_ignores_unknown() {
        let fetch = Arc::new(StubFetch::new());
        let engine = engine_with(EngineConfig::default(), fetch).await;

        // neither panics nor touches the store
        engine.handle_message(r#"{"action": "evict", "url": "/a.html"}"#);
        engine.handle_message("garbage");

        assert_eq!(engine.region(RegionRole::Content).entry_count().await.unwrap(), 0);
    }
}
