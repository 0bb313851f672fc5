//! Rebuilds the ranking model from the full rating snapshot.
//!
//! A rebuild never fails from the caller's point of view: every problem
//! is turned into a [`RebuildOutcome`] and logged, and the previously
//! published model stays in place unless training fully succeeds.

use crate::error::{ModelError, Result};
use crate::registry::{ModelRegistry, TrainingStats};
use crate::traits::Trainer;
use data_loader::{InteractionStore, ItemId, Rating, UserId};
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

/// Minimum data required before a model is (re)trained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SufficiencyGate {
    pub min_ratings: usize,
    pub min_users: usize,
    pub min_items: usize,
}

impl Default for SufficiencyGate {
    fn default() -> Self {
        Self {
            min_ratings: 5,
            min_users: 2,
            min_items: 2,
        }
    }
}

impl SufficiencyGate {
    pub fn check(&self, stats: TrainingStats) -> Result<()> {
        if stats.ratings < self.min_ratings
            || stats.users < self.min_users
            || stats.items < self.min_items
        {
            return Err(ModelError::InsufficientData(stats));
        }
        Ok(())
    }
}

impl TrainingStats {
    /// Count ratings, distinct users and distinct items in a snapshot
    pub fn from_ratings(ratings: &[Rating]) -> Self {
        let users: HashSet<UserId> = ratings.iter().map(|r| r.user_id).collect();
        let items: HashSet<ItemId> = ratings.iter().map(|r| r.item_id).collect();
        Self {
            ratings: ratings.len(),
            users: users.len(),
            items: items.len(),
        }
    }
}

/// What a call to [`ModelBuilder::rebuild`] did
#[derive(Debug, Clone, PartialEq)]
pub enum RebuildOutcome {
    /// A new model replaced the previous one
    Published {
        generation: u64,
        stats: TrainingStats,
        elapsed: Duration,
    },
    /// Thresholds unmet; nothing changed
    Skipped { stats: TrainingStats },
    /// Reading or training failed; nothing changed
    Failed { reason: String },
}

impl RebuildOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RebuildOutcome::Published { .. })
    }
}

pub struct ModelBuilder {
    store: Arc<dyn InteractionStore>,
    trainer: Arc<dyn Trainer>,
    registry: Arc<ModelRegistry>,
    gate: SufficiencyGate,
}

impl ModelBuilder {
    pub fn new(
        store: Arc<dyn InteractionStore>,
        trainer: Arc<dyn Trainer>,
        registry: Arc<ModelRegistry>,
    ) -> Self {
        Self {
            store,
            trainer,
            registry,
            gate: SufficiencyGate::default(),
        }
    }

    /// Configure the sufficiency thresholds (default: 5 ratings, 2 users, 2 items)
    pub fn with_gate(mut self, gate: SufficiencyGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Retrain from all current ratings and publish the result.
    ///
    /// Never panics and never returns an error; see [`RebuildOutcome`].
    #[instrument(skip(self), fields(generation = self.registry.generation()))]
    pub fn rebuild(&self) -> RebuildOutcome {
        match self.try_rebuild() {
            Ok(outcome) => outcome,
            Err(ModelError::InsufficientData(stats)) => {
                info!(%stats, "Not enough ratings to train, keeping current model");
                RebuildOutcome::Skipped { stats }
            }
            Err(e) => {
                error!(error = %e, "Model rebuild failed, keeping current model");
                RebuildOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn try_rebuild(&self) -> Result<RebuildOutcome> {
        let start = Instant::now();

        // Cheap counts first so an underpopulated store is never fully read
        let counted = TrainingStats {
            ratings: self.store.count_ratings()?,
            users: self.store.count_distinct_users()?,
            items: self.store.count_distinct_items()?,
        };
        self.gate.check(counted)?;

        let ratings = self.store.all_ratings()?;
        let stats = TrainingStats::from_ratings(&ratings);
        self.gate.check(stats)?;

        let trainer = &self.trainer;
        let model = panic::catch_unwind(AssertUnwindSafe(|| trainer.train(&ratings)))
            .map_err(|payload| ModelError::Training(panic_message(payload.as_ref())))??;

        let generation = self.registry.publish(model, stats);
        let elapsed = start.elapsed();
        info!(
            generation,
            %stats,
            elapsed_ms = elapsed.as_millis() as u64,
            "Published new ranking model"
        );

        Ok(RebuildOutcome::Published {
            generation,
            stats,
            elapsed,
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("trainer panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("trainer panicked: {}", s)
    } else {
        "trainer panicked".to_string()
    }
}
