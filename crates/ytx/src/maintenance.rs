//! Start-up cache maintenance

use std::time::Duration;
use ytx_cache::{ArtifactStore, CacheKey};

/// Remove cache entries older than `ttl`
///
/// Runs once at start-up. Failures are logged and reported as an empty
/// sweep; maintenance never prevents a run.
pub fn run_startup_sweep(store: &ArtifactStore, ttl: Option<Duration>) -> Vec<CacheKey> {
    let Some(ttl) = ttl else {
        return Vec::new();
    };
    match store.expire(ttl) {
        Ok(removed) => {
            for key in &removed {
                tracing::info!(key = %key, "Expired cache entry");
            }
            if !removed.is_empty() {
                tracing::info!(
                    removed = removed.len(),
                    ttl_seconds = ttl.as_secs(),
                    "Cache sweep finished"
                );
            }
            removed
        }
        Err(e) => {
            tracing::warn!(error = %e, root = %store.root().display(), "Cache sweep failed");
            Vec::new()
        }
    }
}
