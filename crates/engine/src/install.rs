//! Install: populate the assets and fallback regions from the manifest.

use std::slice;

use crate::engine::CacheEngine;
use stow_core::{Error, Region, RegionRole, RequestKey};

impl CacheEngine {
    /// Fetch every manifest path into the assets region and the two
    /// fallback pages into their own regions.
    ///
    /// A failed fetch is logged and counted but does not stop the rest of
    /// the install; the error reports how much of the manifest is missing.
    /// The host treats that error as operator-visible, not fatal: the
    /// engine still transitions to installed.
    pub async fn install(&self) -> Result<(), Error> {
        let config = self.config.clone();
        let total = config.manifest.len() + 2;
        let mut failed = 0;

        failed += self.add_all(&self.region(RegionRole::Assets), &config.manifest).await;
        failed += self
            .add_all(&self.region(RegionRole::Offline), slice::from_ref(&config.offline_page))
            .await;
        failed += self
            .add_all(&self.region(RegionRole::NotFound), slice::from_ref(&config.not_found_page))
            .await;

        if failed > 0 {
            tracing::error!(failed, total, "install finished with missing assets");
            return Err(Error::InstallIncomplete { failed, total });
        }

        tracing::info!(total, version = self.registry.version(), "install complete");
        Ok(())
    }

    /// Bulk fetch-and-store into one region. Stores every path that fetches
    /// cleanly and returns how many did not.
    async fn add_all(&self, region: &Region, paths: &[String]) -> usize {
        let mut failed = 0;
        for path in paths {
            if let Err(e) = self.fetch_into(region, path).await {
                tracing::error!(region = region.name(), path, error = %e, "install fetch failed");
                failed += 1;
            }
        }
        failed
    }

    async fn fetch_into(&self, region: &Region, path: &str) -> Result<(), Error> {
        let url = self.resolve(path)?;
        let response = self.fetcher.get(&url).await?;
        if response.status.as_u16() >= 400 {
            return Err(Error::UpstreamStatus { status: response.status.as_u16(), url: url.to_string() });
        }
        let key = RequestKey::get(url.as_str());
        region.put(&key, &response.to_stored()).await
    }
}
