//! Personalized source: the trained model's ranking for one user
//!
//! ## Algorithm
//! 1. Take the currently published model snapshot (no model => empty)
//! 2. Users the model never saw get an empty list, not an error
//! 3. Ask for `ceil(limit * overfetch_factor)` ids so that items later
//!    dropped as disabled or duplicate still leave enough to fill a page
//! 4. Resolve ids to enabled catalog items, keeping the model's order

use anyhow::{Context, Result};
use data_loader::{ContentCatalog, Item, ItemId, UserId};
use ml_model::ModelRegistry;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Over-fetch bounds; callers cannot configure outside these
const MIN_OVERFETCH: f32 = 1.5;
const MAX_OVERFETCH: f32 = 2.0;

pub struct PersonalizedSource {
    registry: Arc<ModelRegistry>,
    catalog: Arc<dyn ContentCatalog>,
    overfetch_factor: f32,
}

impl PersonalizedSource {
    pub fn new(registry: Arc<ModelRegistry>, catalog: Arc<dyn ContentCatalog>) -> Self {
        Self {
            registry,
            catalog,
            overfetch_factor: MAX_OVERFETCH,
        }
    }

    /// Configure the over-fetch factor (default: 2.0, clamped to [1.5, 2.0])
    pub fn with_overfetch_factor(mut self, factor: f32) -> Self {
        self.overfetch_factor = if factor.is_nan() {
            MAX_OVERFETCH
        } else {
            factor.clamp(MIN_OVERFETCH, MAX_OVERFETCH)
        };
        self
    }

    /// Number of ids requested from the model for a wanted count
    pub fn fetch_size(&self, limit: usize) -> usize {
        (limit as f32 * self.overfetch_factor).ceil() as usize
    }

    /// Ranked item ids for the user, best first.
    ///
    /// Empty when no model is loaded, the user is unknown to it, or
    /// `limit` is 0. Never fails.
    #[instrument(skip(self))]
    pub fn personalized(&self, user_id: UserId, limit: usize) -> Vec<ItemId> {
        if limit == 0 {
            return Vec::new();
        }
        let snapshot = match self.registry.snapshot() {
            Some(snapshot) => snapshot,
            None => {
                debug!("No ranking model published yet");
                return Vec::new();
            }
        };
        if !snapshot.model.contains_user(user_id) {
            debug!(generation = snapshot.generation, "User unknown to the ranking model");
            return Vec::new();
        }

        let ids: Vec<ItemId> = snapshot
            .model
            .rank(user_id, self.fetch_size(limit))
            .into_iter()
            .map(|scored| scored.item_id)
            .collect();

        debug!(
            generation = snapshot.generation,
            model = snapshot.model.name(),
            ranked = ids.len(),
            "Ranked personalized candidates"
        );
        ids
    }

    /// Up to `limit` enabled items from the user's ranking, best first
    pub fn candidates(&self, user_id: UserId, limit: usize) -> Result<Vec<Item>> {
        let ids = self.personalized(user_id, limit);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut items = self
            .catalog
            .find_by_ids_enabled(&ids)
            .context("Failed to resolve personalized candidates")?;
        items.truncate(limit);
        Ok(items)
    }
}
