//! Periodic refresh, one independent task per feed.
//!
//! Each task fetches immediately, then once per interval. A slow or failing
//! feed only delays its own task. Outcomes are applied to the shared state
//! in a single short lock; errors are logged and retried on the next tick.

use crate::engine::{lock_state, SharedState};
use crate::feed::{FeedFetcher, FeedSource, FetchError};
use crate::shutdown::{ShutdownCoordinator, ShutdownSignal};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

pub struct RefreshScheduler {
    fetcher: Arc<dyn FeedFetcher>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(fetcher: Arc<dyn FeedFetcher>, interval: Duration) -> Self {
        Self { fetcher, interval }
    }

    /// Spawns one refresh task per configured feed on the coordinator.
    pub fn start(
        &self,
        coordinator: &mut ShutdownCoordinator,
        state: SharedState,
        redraw: Arc<Notify>,
    ) {
        let sources: Vec<FeedSource> = lock_state(&state).store.sources().to_vec();

        for (index, source) in sources.into_iter().enumerate() {
            let task = RefreshTask {
                index,
                source,
                fetcher: Arc::clone(&self.fetcher),
                interval: self.interval,
                state: Arc::clone(&state),
                redraw: Arc::clone(&redraw),
            };
            let name = format!("refresh:{}", task.source.display_name);
            let signal = coordinator.signal();
            coordinator.spawn(name, task.run(signal));
        }
    }
}

struct RefreshTask {
    index: usize,
    source: FeedSource,
    fetcher: Arc<dyn FeedFetcher>,
    interval: Duration,
    state: SharedState,
    redraw: Arc<Notify>,
}

impl RefreshTask {
    async fn run(self, shutdown: ShutdownSignal) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // An abandoned fetch is never applied.
            let outcome = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                outcome = self.fetcher.fetch(&self.source) => outcome,
            };

            match &outcome {
                Ok(feed) => tracing::info!(
                    feed = %self.source.display_name,
                    articles = feed.len(),
                    "Feed refreshed"
                ),
                Err(FetchError::Empty) => tracing::info!(
                    feed = %self.source.display_name,
                    "Feed has no entries"
                ),
                Err(e) => tracing::warn!(
                    feed = %self.source.display_name,
                    url = %self.source.url,
                    error = %e,
                    "Feed refresh failed, will retry"
                ),
            }

            let changed = lock_state(&self.state).apply_fetch(self.index, outcome);
            if changed {
                self.redraw.notify_one();
            }
        }

        tracing::debug!(feed = %self.source.display_name, "Refresh task stopped");
    }
}
