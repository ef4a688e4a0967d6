//! Engine configuration with layered loading.
//!
//! Configuration is loaded via figment from multiple sources:
//!
//! 1. Environment variables (STOW_*)
//! 2. TOML config file (if STOW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

use crate::ttl::{ROOT_MARKER, TtlTable};

/// Engine configuration: storage location, cache version, install manifest,
/// freshness table, and fetch limits. All static, supplied at startup.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STOW_*)
/// 2. TOML config file (if STOW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the SQLite region store.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin that root-relative request and manifest paths resolve against.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Version tag scoping all region names. Bumping it creates fresh
    /// regions and marks prior ones for deletion at activation.
    #[serde(default = "default_cache_version")]
    pub cache_version: u32,

    /// Root-relative paths installed into the assets region at install time.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Fallback page served when the network is unreachable.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Fallback page served on upstream status >= 400.
    #[serde(default = "default_not_found_page")]
    pub not_found_page: String,

    /// Extension→seconds freshness table. Extensions absent from the table
    /// never expire.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: HashMap<String, u64>,

    /// User-Agent string for outbound fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes accepted per fetched response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Outbound fetch timeout in milliseconds. A fetch that exceeds it is
    /// treated as a network failure.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Hosts and CIDR blocks whose requests bypass the cache entirely
    /// (local/dev origins). Loopback IPs always bypass.
    #[serde(default = "default_passthrough_hosts")]
    pub passthrough_hosts: Vec<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./stow-cache.sqlite")
}

fn default_origin() -> String {
    "https://app.example.com".into()
}

fn default_cache_version() -> u32 {
    1
}

fn default_manifest() -> Vec<String> {
    vec!["/index.html".into(), "/manifest.json".into()]
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_not_found_page() -> String {
    "/404.html".into()
}

fn default_ttl_seconds() -> HashMap<String, u64> {
    // One day for page-like types; media extensions are deliberately absent
    // (immutable per filename, never expire).
    const DAY: u64 = 86_400;
    HashMap::from([
        (ROOT_MARKER.to_string(), DAY),
        ("html".to_string(), DAY),
        ("css".to_string(), DAY),
        ("js".to_string(), DAY),
        ("json".to_string(), DAY),
    ])
}

fn default_user_agent() -> String {
    "stow/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_passthrough_hosts() -> Vec<String> {
    vec!["localhost".into(), "127.0.0.0/8".into(), "::1".into()]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_version: default_cache_version(),
            manifest: default_manifest(),
            offline_page: default_offline_page(),
            not_found_page: default_not_found_page(),
            ttl_seconds: default_ttl_seconds(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            passthrough_hosts: default_passthrough_hosts(),
        }
    }
}

impl EngineConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The freshness table as a policy object.
    pub fn ttl_table(&self) -> TtlTable {
        TtlTable::new(self.ttl_seconds.clone())
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STOW_`
    /// 2. TOML file from `STOW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or parsed, or if
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STOW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STOW_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./stow-cache.sqlite"));
        assert_eq!(config.cache_version, 1);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_bytes, 5_242_880);
        assert!(config.manifest.iter().all(|p| p.starts_with('/')));
        assert!(config.passthrough_hosts.contains(&"localhost".to_string()));
    }

    #[test]
    fn test_timeout_duration() {
        let config = EngineConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_default_ttl_table() {
        let table = EngineConfig::default().ttl_table();
        assert_eq!(table.ttl_for("https://app.example.com/"), Some(86_400));
        assert_eq!(table.ttl_for("https://app.example.com/js/app.js"), Some(86_400));
        // media is absent from the table: never expires
        assert_eq!(table.ttl_for("https://app.example.com/images/logo.png"), None);
    }
}
