//! Seams between the rebuild machinery and the ranking algorithm.
//!
//! The builder only knows how to hand a rating snapshot to a [`Trainer`]
//! and publish whatever [`RankingModel`] comes back. Swapping the
//! algorithm means providing another pair of implementations.

use crate::error::Result;
use data_loader::{ItemId, Rating, UserId};
use std::sync::Arc;

/// One entry of a user's ranking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredItem {
    pub item_id: ItemId,
    /// Higher is a better match; only comparable within one ranking
    pub affinity: f32,
}

/// An immutable trained model.
///
/// ## Design Note
/// - `Send + Sync` so one published model can serve every request thread
/// - Models are never mutated after training; a rebuild replaces them
pub trait RankingModel: Send + Sync {
    /// Returns the name of the algorithm (for logging/debugging)
    fn name(&self) -> &str;

    /// True if the user contributed ratings to the training snapshot
    fn contains_user(&self, user_id: UserId) -> bool;

    /// Best `limit` items for the user, best first.
    ///
    /// Returns an empty list for users unknown to the model. Items the
    /// user already rated are never returned.
    fn rank(&self, user_id: UserId, limit: usize) -> Vec<ScoredItem>;
}

/// Builds a [`RankingModel`] from a full rating snapshot
pub trait Trainer: Send + Sync {
    fn train(&self, ratings: &[Rating]) -> Result<Arc<dyn RankingModel>>;
}
