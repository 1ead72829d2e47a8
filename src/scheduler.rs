//! Background task that keeps the rate cache fresh.

use crate::core::{CacheState, RateCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// Owns the refresh task. Dropping the handle stops the loop.
pub struct RefreshHandle {
    handle: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn shutdown(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Refreshes `cache` every `period`, starting at `first_tick`.
///
/// Each refresh is awaited before the next tick is taken, so two refreshes never
/// run at once. The provider call is bounded by the cache's fetch timeout, which
/// keeps a hung upstream from holding up later ticks.
pub fn spawn_refresh_loop(
    cache: Arc<RateCache>,
    period: Duration,
    first_tick: Instant,
) -> RefreshHandle {
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(first_tick, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            refresh_once(&cache).await;
        }
    });

    info!(period_secs = period.as_secs(), "Scheduled exchange rate refresh");
    RefreshHandle { handle }
}

/// Runs one refresh and logs the outcome. Never fails.
pub async fn refresh_once(cache: &RateCache) {
    match cache.refresh().await {
        Ok(outcome) => {
            info!(
                currencies = outcome.currencies,
                fetched_at = %outcome.fetched_at,
                provider_updated_at = ?outcome.provider_updated_at,
                "Exchange rates updated"
            );
        }
        Err(e) => match cache.state() {
            CacheState::Populated => {
                warn!(error = %e, "Refresh failed, keeping previous rates");
            }
            CacheState::Empty => {
                error!(error = %e, "Refresh failed and no rates are loaded yet");
            }
        },
    }
}
