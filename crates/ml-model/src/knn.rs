//! Item-based k-nearest-neighbours collaborative filtering.
//!
//! ## Algorithm
//! 1. Group ratings by user, scaling each score to a [0, 1] weight
//! 2. For every pair of items co-rated by a user, accumulate the dot
//!    product of their rating vectors (parallel fold/reduce over users)
//! 3. Cosine similarity = dot / (norm_a * norm_b); keep the top-k
//!    neighbours of each item
//! 4. A user's affinity for an unrated item k is
//!    `sum(similarity(j, k) * weight(j))` over the items j they rated

use crate::error::{ModelError, Result};
use crate::traits::{RankingModel, ScoredItem, Trainer};
use data_loader::{ItemId, Rating, UserId, MAX_RATING_SCORE};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Trains [`ItemKnnModel`]s
#[derive(Debug, Clone)]
pub struct ItemKnnTrainer {
    /// Neighbours kept per item
    neighbors: usize,

    /// Pairs below this similarity are dropped
    min_similarity: f32,

    /// Only a user's highest-rated items feed the pair accumulation,
    /// which keeps training cost bounded for very active users
    max_items_per_user: usize,
}

impl ItemKnnTrainer {
    pub fn new() -> Self {
        Self {
            neighbors: 20,
            min_similarity: 0.0,
            max_items_per_user: 500,
        }
    }

    /// Configure neighbours kept per item (default: 20)
    pub fn with_neighbors(mut self, k: usize) -> Self {
        self.neighbors = k.max(1);
        self
    }

    /// Configure the minimum similarity for a neighbour (default: 0.0)
    pub fn with_min_similarity(mut self, min: f32) -> Self {
        self.min_similarity = min;
        self
    }

    /// Configure the per-user item cap used during training (default: 500)
    pub fn with_max_items_per_user(mut self, max: usize) -> Self {
        self.max_items_per_user = max.max(2);
        self
    }

    /// Sum of weight products for every co-rated item pair (a < b)
    fn pair_dots(&self, by_user: &HashMap<UserId, Vec<(ItemId, f32)>>) -> HashMap<(ItemId, ItemId), f32> {
        by_user
            .par_iter()
            .fold(
                HashMap::new,
                |mut local: HashMap<(ItemId, ItemId), f32>, (_, rated)| {
                    let mut rated: Vec<(ItemId, f32)> = rated.clone();
                    if rated.len() > self.max_items_per_user {
                        rated.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
                        rated.truncate(self.max_items_per_user);
                    }
                    for (i, &(a, wa)) in rated.iter().enumerate() {
                        for &(b, wb) in &rated[i + 1..] {
                            let key = if a < b { (a, b) } else { (b, a) };
                            *local.entry(key).or_insert(0.0) += wa * wb;
                        }
                    }
                    local
                },
            )
            .reduce(HashMap::new, |mut acc, local| {
                for (pair, dot) in local {
                    *acc.entry(pair).or_insert(0.0) += dot;
                }
                acc
            })
    }
}

impl Default for ItemKnnTrainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemKnnTrainer {
    /// Train and return the concrete model
    pub fn train_model(&self, ratings: &[Rating]) -> Result<ItemKnnModel> {
        if ratings.is_empty() {
            return Err(ModelError::Training("rating snapshot is empty".to_string()));
        }

        let mut by_user: HashMap<UserId, Vec<(ItemId, f32)>> = HashMap::new();
        let mut squared: HashMap<ItemId, f32> = HashMap::new();
        for rating in ratings {
            let weight = rating.score / MAX_RATING_SCORE;
            by_user
                .entry(rating.user_id)
                .or_default()
                .push((rating.item_id, weight));
            *squared.entry(rating.item_id).or_insert(0.0) += weight * weight;
        }
        let norms: HashMap<ItemId, f32> = squared.into_iter().map(|(id, s)| (id, s.sqrt())).collect();

        let dots = self.pair_dots(&by_user);

        let mut neighbors: HashMap<ItemId, Vec<(ItemId, f32)>> = HashMap::new();
        for ((a, b), dot) in dots {
            let (na, nb) = match (norms.get(&a), norms.get(&b)) {
                (Some(&na), Some(&nb)) if na > 0.0 && nb > 0.0 => (na, nb),
                _ => continue,
            };
            let similarity = dot / (na * nb);
            if similarity <= self.min_similarity {
                continue;
            }
            neighbors.entry(a).or_default().push((b, similarity));
            neighbors.entry(b).or_default().push((a, similarity));
        }
        neighbors.par_iter_mut().for_each(|(_, list)| {
            list.sort_by(|x, y| y.1.total_cmp(&x.1).then(x.0.cmp(&y.0)));
            list.truncate(self.neighbors);
        });

        debug!(
            users = by_user.len(),
            items = norms.len(),
            items_with_neighbors = neighbors.len(),
            "Trained item-kNN model"
        );

        Ok(ItemKnnModel {
            user_ratings: by_user,
            neighbors,
        })
    }
}

impl Trainer for ItemKnnTrainer {
    fn train(&self, ratings: &[Rating]) -> Result<Arc<dyn RankingModel>> {
        Ok(Arc::new(self.train_model(ratings)?))
    }
}

/// Trained item-kNN model; immutable once built
#[derive(Debug)]
pub struct ItemKnnModel {
    /// Each user's rated items with their [0, 1] weights
    user_ratings: HashMap<UserId, Vec<(ItemId, f32)>>,

    /// Top-k most similar items per item, most similar first
    neighbors: HashMap<ItemId, Vec<(ItemId, f32)>>,
}

impl ItemKnnModel {
    /// Neighbours of an item, most similar first
    pub fn neighbors_of(&self, item_id: ItemId) -> &[(ItemId, f32)] {
        self.neighbors
            .get(&item_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

impl RankingModel for ItemKnnModel {
    fn name(&self) -> &str {
        "item-knn"
    }

    fn contains_user(&self, user_id: UserId) -> bool {
        self.user_ratings.contains_key(&user_id)
    }

    fn rank(&self, user_id: UserId, limit: usize) -> Vec<ScoredItem> {
        let rated = match self.user_ratings.get(&user_id) {
            Some(rated) => rated,
            None => return Vec::new(),
        };
        let already_rated: HashSet<ItemId> = rated.iter().map(|(id, _)| *id).collect();

        let mut scores: HashMap<ItemId, f32> = HashMap::new();
        for &(item_id, weight) in rated {
            for &(neighbor, similarity) in self.neighbors_of(item_id) {
                if already_rated.contains(&neighbor) {
                    continue;
                }
                *scores.entry(neighbor).or_insert(0.0) += similarity * weight;
            }
        }

        let mut ranked: Vec<ScoredItem> = scores
            .into_iter()
            .map(|(item_id, affinity)| ScoredItem { item_id, affinity })
            .collect();
        ranked.sort_by(|a, b| b.affinity.total_cmp(&a.affinity).then(a.item_id.cmp(&b.item_id)));
        ranked.truncate(limit);
        ranked
    }
}
