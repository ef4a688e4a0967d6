//! The cache engine object and its lifecycle dispatch.

use std::sync::Arc;

use stow_client::{Fetch, FetchClient, FetchConfig, Passthrough, Url, parse_origin, resolve};
use stow_core::{CacheDb, EngineConfig, Error, Region, RegionRole, Registry, TtlTable};

/// Lifecycle signals delivered by the host.
///
/// The host must not proceed past `Activate` until `on_event` resolves:
/// activation includes retiring prior-version regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Populate the assets and fallback regions from the manifest.
    Install,
    /// Make this version authoritative and clean up prior versions.
    Activate,
}

/// The offline cache engine.
///
/// Owns all regions of one cache version plus the injected configuration;
/// constructed once per process, no ambient global state. Cloning is cheap
/// and clones share the underlying store, so the engine can be handed to
/// concurrently running request handlers and detached tasks.
#[derive(Clone)]
pub struct CacheEngine {
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) origin: Url,
    pub(crate) registry: Registry,
    pub(crate) ttl: TtlTable,
    pub(crate) passthrough: Passthrough,
    pub(crate) fetcher: Arc<dyn Fetch>,
}

impl CacheEngine {
    /// Construct from pre-built parts. The seam used by tests to inject a
    /// scripted fetcher.
    pub fn new(config: EngineConfig, db: CacheDb, fetcher: Arc<dyn Fetch>) -> Result<Self, Error> {
        let origin = parse_origin(&config.origin)?;
        let registry = Registry::new(db, config.cache_version);
        let ttl = config.ttl_table();
        let passthrough = Passthrough::new(&config.passthrough_hosts);
        Ok(Self { config: Arc::new(config), origin, registry, ttl, passthrough, fetcher })
    }

    /// Open the store at the configured path and wire up a real HTTP client.
    pub async fn open(config: EngineConfig) -> Result<Self, Error> {
        let fetch_config = FetchConfig {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..FetchConfig::default()
        };
        let client = FetchClient::new(fetch_config)?;
        let db = CacheDb::open(&config.db_path).await?;
        Self::new(config, db, Arc::new(client))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn region(&self, role: RegionRole) -> Region {
        self.registry.open(role)
    }

    pub(crate) fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.origin, input).map_err(Error::from)
    }

    /// Route a host lifecycle event to its handler.
    pub async fn on_event(&self, event: LifecycleEvent) -> Result<(), Error> {
        match event {
            LifecycleEvent::Install => self.install().await,
            LifecycleEvent::Activate => self.activate().await,
        }
    }
}
