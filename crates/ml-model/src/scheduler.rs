//! Background task that keeps the ranking model fresh.
//!
//! Fires one rebuild immediately, then one per interval. Training runs on
//! the blocking pool; a failed or panicking rebuild is logged and the next
//! tick still fires.

use crate::builder::{ModelBuilder, RebuildOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Default time between rebuilds
pub const DEFAULT_REBUILD_INTERVAL: Duration = Duration::from_secs(48 * 60 * 60);

pub struct RebuildScheduler {
    builder: Arc<ModelBuilder>,
    interval: Duration,
}

impl RebuildScheduler {
    /// # Arguments
    /// * `builder` - Shared builder invoked on every tick
    /// * `interval` - Time between rebuilds (default: 48 hours)
    pub fn new(builder: Arc<ModelBuilder>, interval: Duration) -> Self {
        Self {
            builder,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Spawn the background rebuild task
    ///
    /// # Returns
    /// - `watch::Sender<()>` - Send (or drop) to stop the scheduler
    /// - `JoinHandle<()>` - Completes once the loop has exited
    pub fn spawn(self) -> (watch::Sender<()>, JoinHandle<()>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(());

        let handle = tokio::spawn(async move {
            info!(
                interval_secs = self.interval.as_secs(),
                "RebuildScheduler started"
            );

            let mut timer = interval(self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        info!("RebuildScheduler received shutdown signal");
                        break;
                    }
                    _ = timer.tick() => {
                        self.run_once().await;
                    }
                }
            }

            info!("RebuildScheduler stopped");
        });

        (shutdown_tx, handle)
    }

    /// Run one rebuild on the blocking pool
    pub async fn run_once(&self) -> Option<RebuildOutcome> {
        let builder = self.builder.clone();
        match tokio::task::spawn_blocking(move || builder.rebuild()).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(error = %e, "Model rebuild task aborted");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knn::ItemKnnTrainer;
    use crate::registry::ModelRegistry;
    use data_loader::{DataLoadError, InteractionStore, ItemId, Rating, TagId, UserId};
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose rating counts always fail, counting how often it was asked
    #[derive(Default)]
    struct FlakyStore {
        calls: AtomicUsize,
    }

    impl InteractionStore for FlakyStore {
        fn all_ratings(&self) -> data_loader::Result<Vec<Rating>> {
            Ok(Vec::new())
        }

        fn count_ratings(&self) -> data_loader::Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(DataLoadError::unavailable("ratings", "connection reset"))
        }

        fn count_distinct_users(&self) -> data_loader::Result<usize> {
            Ok(0)
        }

        fn count_distinct_items(&self) -> data_loader::Result<usize> {
            Ok(0)
        }

        fn recent_browsed_item_ids(&self, _: UserId, _: usize) -> data_loader::Result<Vec<ItemId>> {
            Ok(Vec::new())
        }

        fn recent_liked_item_ids(&self, _: UserId, _: usize) -> data_loader::Result<Vec<ItemId>> {
            Ok(Vec::new())
        }

        fn user_interest_tags(&self, _: UserId) -> data_loader::Result<BTreeSet<TagId>> {
            Ok(BTreeSet::new())
        }
    }

    fn flaky_builder() -> (Arc<FlakyStore>, Arc<ModelBuilder>) {
        let store = Arc::new(FlakyStore::default());
        let builder = ModelBuilder::new(
            store.clone(),
            Arc::new(ItemKnnTrainer::new()),
            Arc::new(ModelRegistry::new()),
        );
        (store, Arc::new(builder))
    }

    #[tokio::test]
    async fn test_failed_rebuild_does_not_stop_ticks() {
        let (store, builder) = flaky_builder();
        let scheduler = RebuildScheduler::new(builder.clone(), Duration::from_millis(10));
        let (shutdown_tx, handle) = scheduler.spawn();

        tokio::time::sleep(Duration::from_millis(120)).await;
        let _ = shutdown_tx.send(());
        handle.await.unwrap();

        assert!(store.calls.load(Ordering::SeqCst) >= 2);
        assert!(builder.registry().snapshot().is_none());
    }

    #[tokio::test]
    async fn test_run_once_reports_failure() {
        let (_store, builder) = flaky_builder();
        let scheduler = RebuildScheduler::new(builder, DEFAULT_REBUILD_INTERVAL);

        let outcome = scheduler.run_once().await;
        assert!(matches!(outcome, Some(RebuildOutcome::Failed { .. })));
    }

    #[tokio::test]
    async fn test_first_tick_fires_immediately() {
        let (store, builder) = flaky_builder();
        let scheduler = RebuildScheduler::new(builder, DEFAULT_REBUILD_INTERVAL);
        let (shutdown_tx, handle) = scheduler.spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(shutdown_tx);
        handle.await.unwrap();

        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }
}
