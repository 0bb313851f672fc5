//! Turns signal hits into one ranked list of scored posts.
//!
//! ## Algorithm
//! 1. Every hit lands in a per-item [`CandidateScore`] keyed by item id;
//!    items remember the order in which they were first discovered
//! 2. Interest, history and like hits set their fixed membership value,
//!    hot hits set the engagement score, recent hits only admit the item
//! 3. Each candidate gets its freshness from its own creation time
//! 4. `total = 0.35*interest + 0.25*history + 0.15*like + 0.15*hot + 0.10*freshness`,
//!    multiplied by 0.6 for items the user already browsed
//! 5. Stable sort by total, descending; ties keep discovery order

use chrono::{DateTime, Utc};
use data_loader::{Item, ItemId};
use rayon::prelude::*;
use serde::Serialize;
use sources::{SignalHit, SignalKind, UserContext};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

pub const INTEREST_WEIGHT: f64 = 0.35;
pub const HISTORY_WEIGHT: f64 = 0.25;
pub const LIKE_WEIGHT: f64 = 0.15;
pub const HOT_WEIGHT: f64 = 0.15;
pub const FRESHNESS_WEIGHT: f64 = 0.10;

/// Multiplier applied to the total of an already-browsed item
pub const VIEWED_PENALTY: f64 = 0.6;

/// Freshness of a brand-new item
pub const FRESHNESS_MAX: f64 = 10.0;
/// Age at which freshness reaches zero
pub const FRESHNESS_HORIZON_HOURS: f64 = 72.0;

/// `max(0, 10 * (1 - hours_since_creation / 72))`; future items count as age 0
pub fn freshness_score(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = (now - created_at).num_seconds().max(0) as f64 / 3600.0;
    (FRESHNESS_MAX * (1.0 - hours / FRESHNESS_HORIZON_HOURS)).max(0.0)
}

/// Per-signal breakdown of a post's score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateScore {
    pub interest: f64,
    pub history: f64,
    pub like: f64,
    pub hot: f64,
    pub freshness: f64,
    /// 1.0, or [`VIEWED_PENALTY`] when the user already browsed the item
    pub viewed_penalty: f64,
    pub total: f64,
}

impl Default for CandidateScore {
    fn default() -> Self {
        Self {
            interest: 0.0,
            history: 0.0,
            like: 0.0,
            hot: 0.0,
            freshness: 0.0,
            viewed_penalty: 1.0,
            total: 0.0,
        }
    }
}

impl CandidateScore {
    /// Weighted sum of the signal values, before the viewed penalty
    pub fn weighted_sum(&self) -> f64 {
        INTEREST_WEIGHT * self.interest
            + HISTORY_WEIGHT * self.history
            + LIKE_WEIGHT * self.like
            + HOT_WEIGHT * self.hot
            + FRESHNESS_WEIGHT * self.freshness
    }

    fn record(&mut self, kind: SignalKind, value: f64) {
        match kind {
            SignalKind::Interest => self.interest = value,
            SignalKind::History => self.history = value,
            SignalKind::Like => self.like = value,
            SignalKind::Hot => self.hot = value,
            SignalKind::Recent => {}
        }
    }

    fn finalize(mut self, freshness: f64, viewed: bool) -> Self {
        self.freshness = freshness;
        self.viewed_penalty = if viewed { VIEWED_PENALTY } else { 1.0 };
        self.total = self.weighted_sum() * self.viewed_penalty;
        self
    }
}

/// A post together with the score that ranked it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPost {
    pub item: Item,
    pub score: CandidateScore,
}

impl ScoredPost {
    /// A post served without scoring (degraded path)
    pub fn unscored(item: Item) -> Self {
        Self {
            item,
            score: CandidateScore::default(),
        }
    }
}

/// Per-request accumulator of signal hits.
///
/// ## Design Note
/// - Keyed by item id, so an item found by several signals is scored once
/// - `order` remembers first discovery, which is the tie order after sorting
#[derive(Debug, Default)]
pub struct ScoreBoard {
    order: Vec<ItemId>,
    entries: HashMap<ItemId, (Item, CandidateScore)>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one signal's hits into the board
    pub fn add(&mut self, kind: SignalKind, hits: Vec<SignalHit>) {
        for hit in hits {
            let id = hit.item.id;
            match self.entries.entry(id) {
                Entry::Occupied(mut slot) => slot.get_mut().1.record(kind, hit.value),
                Entry::Vacant(slot) => {
                    let mut score = CandidateScore::default();
                    score.record(kind, hit.value);
                    slot.insert((hit.item, score));
                    self.order.push(id);
                }
            }
        }
    }

    /// Number of distinct candidates
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Compute final scores (in parallel) and return posts best first
    pub fn into_ranked(mut self, context: &UserContext, now: DateTime<Utc>) -> Vec<ScoredPost> {
        let discovered: Vec<(Item, CandidateScore)> = self
            .order
            .iter()
            .filter_map(|id| self.entries.remove(id))
            .collect();

        let mut ranked: Vec<ScoredPost> = discovered
            .into_par_iter()
            .map(|(item, score)| {
                let freshness = freshness_score(item.created_at, now);
                let score = score.finalize(freshness, context.has_viewed(item.id));
                ScoredPost { item, score }
            })
            .collect();

        // sort_by is stable, so equal totals keep discovery order
        ranked.sort_by(|a, b| b.score.total.total_cmp(&a.score.total));

        debug!(
            candidates = ranked.len(),
            viewed = ranked.iter().filter(|p| p.score.viewed_penalty < 1.0).count(),
            "Ranked scored posts"
        );
        ranked
    }
}
