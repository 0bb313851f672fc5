//! Single owner of the currently published model.
//!
//! Readers take an `Arc<ModelSnapshot>` and keep it for the whole request;
//! a rebuild swaps the pointer. The lock only ever guards that swap, so
//! readers never wait on training.

use crate::traits::RankingModel;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Size of the rating snapshot a model was (or would have been) trained on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrainingStats {
    pub ratings: usize,
    pub users: usize,
    pub items: usize,
}

impl fmt::Display for TrainingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ratings from {} users over {} items",
            self.ratings, self.users, self.items
        )
    }
}

/// A published model plus bookkeeping about when and from what it was built
pub struct ModelSnapshot {
    pub model: Arc<dyn RankingModel>,
    /// Increases by one with every successful publish, starting at 1
    pub generation: u64,
    pub trained_at: DateTime<Utc>,
    pub stats: TrainingStats,
}

impl fmt::Debug for ModelSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSnapshot")
            .field("model", &self.model.name())
            .field("generation", &self.generation)
            .field("trained_at", &self.trained_at)
            .field("stats", &self.stats)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ModelRegistry {
    current: RwLock<Option<Arc<ModelSnapshot>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current model, if one was ever published
    pub fn snapshot(&self) -> Option<Arc<ModelSnapshot>> {
        self.current.read().clone()
    }

    /// Generation of the current model (0 when none is loaded)
    pub fn generation(&self) -> u64 {
        self.current.read().as_ref().map_or(0, |s| s.generation)
    }

    /// Replace the current model wholesale; returns the new generation
    pub fn publish(&self, model: Arc<dyn RankingModel>, stats: TrainingStats) -> u64 {
        let mut current = self.current.write();
        let generation = current.as_ref().map_or(1, |s| s.generation + 1);
        *current = Some(Arc::new(ModelSnapshot {
            model,
            generation,
            trained_at: Utc::now(),
            stats,
        }));
        generation
    }
}
