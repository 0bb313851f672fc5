//! # Multi-Signal Scorer
//!
//! Ranks posts for a user by combining five independent signals.
//!
//! ## Algorithm
//! 1. Build the user's context once (interests, browses, likes)
//! 2. Run every signal in parallel on the rayon pool
//! 3. Fold the hits into a [`ScoreBoard`] in signal order, so discovery
//!    order (and therefore tie order) is deterministic
//! 4. Rank, then slice the requested page
//!
//! Any error or panic along the way degrades the request to the newest
//! posts instead of failing it.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use data_loader::{ContentCatalog, InteractionStore, UserId};
use pipeline::{Page, ScoreBoard, ScoredPost};
use rayon::prelude::*;
use sources::{
    build_user_context, standard_signals, ContextLimits, Signal, SignalHit, SignalKind,
    DEFAULT_HISTORY_WINDOW, DEFAULT_SIGNAL_CAP,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

pub struct MultiSignalScorer {
    store: Arc<dyn InteractionStore>,
    catalog: Arc<dyn ContentCatalog>,
    signals: Vec<Arc<dyn Signal>>,
    limits: ContextLimits,
}

impl MultiSignalScorer {
    /// Scorer with the five standard signals at their default caps
    pub fn new(store: Arc<dyn InteractionStore>, catalog: Arc<dyn ContentCatalog>) -> Self {
        let signals = standard_signals(catalog.clone(), DEFAULT_SIGNAL_CAP, DEFAULT_HISTORY_WINDOW);
        Self {
            store,
            catalog,
            signals,
            limits: ContextLimits::default(),
        }
    }

    /// Replace the signal set
    pub fn with_signals(mut self, signals: Vec<Arc<dyn Signal>>) -> Self {
        self.signals = signals;
        self
    }

    /// Configure how much user history is read per request
    pub fn with_limits(mut self, limits: ContextLimits) -> Self {
        self.limits = limits;
        self
    }

    /// One page of scored posts. Never fails.
    pub fn recommend_posts(&self, user_id: UserId, page: usize, page_size: usize) -> Page<ScoredPost> {
        self.recommend_posts_at(user_id, page, page_size, Utc::now())
    }

    /// Same as [`Self::recommend_posts`] with an explicit clock
    #[instrument(skip(self, now))]
    pub fn recommend_posts_at(
        &self,
        user_id: UserId,
        page: usize,
        page_size: usize,
        now: DateTime<Utc>,
    ) -> Page<ScoredPost> {
        if page_size == 0 {
            return Page::empty(page, page_size);
        }
        let start = Instant::now();

        let scored = panic::catch_unwind(AssertUnwindSafe(|| self.rank(user_id, now)))
            .unwrap_or_else(|_| Err(anyhow::anyhow!("post scoring panicked")));

        match scored {
            Ok(ranked) => {
                let result = Page::slice(ranked, page, page_size);
                info!(
                    candidates = result.total,
                    returned = result.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Scored posts"
                );
                result
            }
            Err(e) => {
                warn!(error = format!("{:#}", e), "Post scoring failed, serving recent posts (degraded)");
                self.recent_posts(page, page_size)
            }
        }
    }

    /// Every candidate for the user, best first
    pub fn rank(&self, user_id: UserId, now: DateTime<Utc>) -> Result<Vec<ScoredPost>> {
        let context = build_user_context(self.store.as_ref(), user_id, self.limits)
            .context("Failed to build user context")?;

        let results: Vec<(SignalKind, Result<Vec<SignalHit>>)> = self
            .signals
            .par_iter()
            .map(|signal| (signal.kind(), signal.generate(&context, now)))
            .collect();

        let mut board = ScoreBoard::new();
        for (kind, result) in results {
            let hits = result.with_context(|| format!("{} signal failed", kind))?;
            debug!(signal = %kind, hits = hits.len(), "Signal generated");
            board.add(kind, hits);
        }
        debug!(candidates = board.len(), "Merged signal hits");

        Ok(board.into_ranked(&context, now))
    }

    /// Degraded path: newest posts, unscored
    fn recent_posts(&self, page: usize, page_size: usize) -> Page<ScoredPost> {
        let limit = page.saturating_add(1).saturating_mul(page_size);
        match self.catalog.find_enabled_order_by_created_desc(limit) {
            Ok(items) => {
                let posts: Vec<ScoredPost> = items.into_iter().map(ScoredPost::unscored).collect();
                Page::slice(posts, page, page_size)
            }
            Err(e) => {
                error!(error = %e, "Degraded recent-posts query failed, returning empty page");
                Page::empty(page, page_size)
            }
        }
    }
}
