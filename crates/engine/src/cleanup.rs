//! Activation cleanup: retire regions belonging to prior cache versions.

use crate::engine::CacheEngine;
use stow_core::Error;

impl CacheEngine {
    /// Delete every known region that does not belong to the current
    /// version.
    ///
    /// Idempotent: with nothing stale this is a no-op, and deleting an
    /// already-deleted region is not an error. A failed delete is logged
    /// and retried on the next activation; it never blocks the host.
    pub async fn activate(&self) -> Result<(), Error> {
        let current = self.registry.current_names();

        let known = match self.registry.known_regions().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate regions; skipping cleanup until next activation");
                return Ok(());
            }
        };

        for name in known.iter().filter(|name| !current.contains(*name)) {
            match self.registry.delete_region(name).await {
                Ok(deleted) => {
                    tracing::debug!(region = %name, deleted, "retired stale region");
                }
                Err(e) => {
                    let err = Error::CleanupFailed { region: name.clone(), reason: e.to_string() };
                    tracing::warn!(error = %err, "stale region delete failed; will retry next activation");
                }
            }
        }

        tracing::info!(version = self.registry.version(), "activation complete");
        Ok(())
    }
}
