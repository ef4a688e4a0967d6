//! Request interception: serve from cache, revalidate, or fall back.
//!
//! Every inbound request resolves to exactly one response. Freshness is
//! judged from the stored capture timestamp against the extension TTL
//! alone; no cache-control negotiation with the origin server. A stale
//! entry beats no entry: failed revalidation serves the stale copy, a dead
//! network serves the offline page, and when even the fallback pages are
//! missing a minimal synthesized response goes out. Nothing here ever
//! returns an error to the caller.

use chrono::Utc;

use crate::engine::CacheEngine;
use stow_client::{HeaderMap, Method, Url};
use stow_core::{Error, Region, RegionRole, RequestKey, StoredResponse};

/// An inbound HTTP-shaped request from the presentation layer.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
}

impl Request {
    /// A plain GET, the shape of every cacheable request.
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: Method::GET, url: url.into(), headers: HeaderMap::new() }
    }
}

/// Terminal outcome of one interception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// Cache hit within its TTL, never-expiring, or without a timestamp.
    FreshHit,
    /// Stale hit refreshed from the network; the region now holds the new
    /// response.
    Revalidated,
    /// Stale hit served unchanged because revalidation failed.
    StaleOnRevalidateFailure,
    /// Cache miss filled from the network and stored.
    NetworkMiss,
    /// Upstream answered >= 400; the stored not-found page was served.
    NotFoundFallback,
    /// Network unreachable; the stored offline page was served.
    OfflineFallback,
    /// Non-GET or local/dev target; relayed without interception.
    Bypass,
    /// Region unreadable for this request; direct network passthrough,
    /// nothing stored.
    UncachedPassthrough,
}

/// A response together with the path that produced it.
#[derive(Debug, Clone)]
pub struct Intercepted {
    pub response: StoredResponse,
    pub served: Served,
}

impl CacheEngine {
    /// Decide and produce a response for an inbound request.
    ///
    /// Infallible by design: every failure path degrades to a stale entry,
    /// a fallback page, or a synthesized last resort.
    pub async fn handle(&self, request: Request) -> Intercepted {
        if request.method != Method::GET {
            return self.bypass(request).await;
        }

        let url = match self.resolve(&request.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "unresolvable request url");
                return self.not_found_fallback().await;
            }
        };

        if self.passthrough.matches(&url) {
            return self.bypass_resolved(request.method, url, request.headers).await;
        }

        let key = RequestKey::get(url.as_str());
        let hit = match self.lookup(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "region unreadable; passing request through uncached");
                return self.uncached_passthrough(&url).await;
            }
        };

        match hit {
            Some((region, entry)) => self.serve_hit(region, key, &url, entry).await,
            None => self.fill_miss(&url, key).await,
        }
    }

    /// Look up the key in `content`, then in the installed `assets`.
    async fn lookup(&self, key: &RequestKey) -> Result<Option<(Region, StoredResponse)>, Error> {
        let content = self.region(RegionRole::Content);
        if let Some(entry) = content.get(key).await? {
            return Ok(Some((content, entry)));
        }
        let assets = self.region(RegionRole::Assets);
        if let Some(entry) = assets.get(key).await? {
            return Ok(Some((assets, entry)));
        }
        Ok(None)
    }

    async fn serve_hit(&self, region: Region, key: RequestKey, url: &Url, entry: StoredResponse) -> Intercepted {
        // No capture timestamp: permanently fresh.
        let Some(fetched_at) = entry.fetched_at else {
            return Intercepted { response: entry, served: Served::FreshHit };
        };

        let age = (Utc::now() - fetched_at).num_seconds().max(0) as u64;
        match self.ttl.ttl_for(url.as_str()) {
            None => Intercepted { response: entry, served: Served::FreshHit },
            Some(ttl) if age < ttl => Intercepted { response: entry, served: Served::FreshHit },
            Some(_) => self.revalidate(region, key, url, entry).await,
        }
    }

    /// Refresh an expired entry. Runs detached so the overwrite completes
    /// even if the requester stops waiting mid-fetch.
    async fn revalidate(&self, region: Region, key: RequestKey, url: &Url, stale: StoredResponse) -> Intercepted {
        let fetcher = self.fetcher.clone();
        let url = url.clone();
        let task = tokio::spawn(async move {
            let response = fetcher.get(&url).await?;
            if response.status.as_u16() >= 400 {
                return Err(Error::UpstreamStatus { status: response.status.as_u16(), url: url.to_string() });
            }
            let stored = response.to_stored();
            region.put(&key, &stored).await?;
            Ok::<StoredResponse, Error>(stored)
        });

        match task.await {
            Ok(Ok(fresh)) => Intercepted { response: fresh, served: Served::Revalidated },
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "revalidation failed; serving stale entry");
                Intercepted { response: stale, served: Served::StaleOnRevalidateFailure }
            }
            Err(e) => {
                tracing::warn!(error = %e, "revalidation task aborted; serving stale entry");
                Intercepted { response: stale, served: Served::StaleOnRevalidateFailure }
            }
        }
    }

    /// Cache miss: fetch, store anything usable, fall back otherwise.
    async fn fill_miss(&self, url: &Url, key: RequestKey) -> Intercepted {
        match self.fetcher.get(url).await {
            Ok(response) if response.status.as_u16() < 400 => {
                let stored = response.to_stored();
                if let Err(e) = self.region(RegionRole::Content).put(&key, &stored).await {
                    tracing::warn!(url = %url, error = %e, "could not store fresh response");
                }
                Intercepted { response: stored, served: Served::NetworkMiss }
            }
            Ok(response) => {
                tracing::debug!(url = %url, status = response.status.as_u16(), "upstream error; serving not-found page");
                self.not_found_fallback().await
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "fetch failed; serving offline page");
                self.offline_fallback().await
            }
        }
    }

    /// Relay a request unmodified: non-GET methods and local/dev targets.
    async fn bypass(&self, request: Request) -> Intercepted {
        match self.resolve(&request.url) {
            Ok(url) => self.bypass_resolved(request.method, url, request.headers).await,
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "unresolvable bypass url");
                self.not_found_fallback().await
            }
        }
    }

    async fn bypass_resolved(&self, method: Method, url: Url, headers: HeaderMap) -> Intercepted {
        match self.fetcher.forward(method, &url, headers).await {
            Ok(response) => Intercepted { response: response.to_stored(), served: Served::Bypass },
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "bypass fetch failed; serving offline page");
                self.offline_fallback().await
            }
        }
    }

    /// Single-request degradation when a region cannot be read: go straight
    /// to the network and store nothing.
    async fn uncached_passthrough(&self, url: &Url) -> Intercepted {
        match self.fetcher.get(url).await {
            Ok(response) => Intercepted { response: response.to_stored(), served: Served::UncachedPassthrough },
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "uncached passthrough failed; serving offline page");
                self.offline_fallback().await
            }
        }
    }

    pub(crate) async fn not_found_fallback(&self) -> Intercepted {
        self.fallback(RegionRole::NotFound, &self.config.not_found_page, 404, Served::NotFoundFallback)
            .await
    }

    pub(crate) async fn offline_fallback(&self) -> Intercepted {
        self.fallback(RegionRole::Offline, &self.config.offline_page, 503, Served::OfflineFallback)
            .await
    }

    async fn fallback(&self, role: RegionRole, page: &str, status: u16, served: Served) -> Intercepted {
        if let Ok(url) = self.resolve(page) {
            let key = RequestKey::get(url.as_str());
            match self.region(role).get(&key).await {
                Ok(Some(entry)) => return Intercepted { response: entry, served },
                Ok(None) => {
                    tracing::warn!(page, region = role.as_str(), "fallback page not installed");
                }
                Err(e) => {
                    tracing::warn!(page, error = %e, "fallback region unreadable");
                }
            }
        }
        Intercepted { response: synthesized(status), served }
    }
}

/// Last resort when even the fallback page is unavailable: the consumer is
/// never left without a response.
fn synthesized(status: u16) -> StoredResponse {
    let body: &[u8] = if status == 404 { b"Not Found" } else { b"Offline" };
    StoredResponse {
        url: String::new(),
        status,
        content_type: Some("text/plain".to_string()),
        headers: Vec::new(),
        body: body.to_vec(),
        fetched_at: None,
    }
}
