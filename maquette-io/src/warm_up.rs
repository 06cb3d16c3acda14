//! Cache warm-up after the page becomes ready

use std::time::Duration;

use log::{debug, warn};
use tokio::task::JoinHandle;

use crate::cache::AssetCache;

/// Limits for [`AssetCache::warm_up`]
#[derive(Debug, Clone, PartialEq)]
pub struct WarmUpConfig {
    /// Wait before the first load starts
    pub delay: Duration,
    /// Paths past this count are skipped
    pub max_assets: usize,
}

impl Default for WarmUpConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            max_assets: 8,
        }
    }
}

/// What a warm-up pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmUpReport {
    pub loaded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl AssetCache {
    /// Pre-populate the cache with `paths` in the background.
    ///
    /// Runs at most once per cache; later calls return `None`. Failures are
    /// logged and otherwise ignored. Dropping the returned handle does not
    /// cancel the warm-up.
    pub fn warm_up<I, S>(&self, paths: I, config: WarmUpConfig) -> Option<JoinHandle<WarmUpReport>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.mark_warmed_up() {
            debug!("warm-up already ran, ignoring");
            return None;
        }

        let mut paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        let skipped = paths.len().saturating_sub(config.max_assets);
        if skipped > 0 {
            warn!("warm-up limited to {} assets, skipping {}", config.max_assets, skipped);
            paths.truncate(config.max_assets);
        }

        let cache = self.clone();
        Some(self.runtime().spawn(async move {
            tokio::time::sleep(config.delay).await;

            let mut report = WarmUpReport {
                skipped,
                ..WarmUpReport::default()
            };
            for path in paths {
                match cache.load(&path).await {
                    Ok(_) => report.loaded += 1,
                    Err(err) => {
                        warn!("warm-up of {} failed: {}", path, err);
                        report.failed += 1;
                    }
                }
            }
            debug!("warm-up finished: {:?}", report);
            report
        }))
    }
}
