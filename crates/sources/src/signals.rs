//! The five candidate signals behind post scoring
//!
//! Every signal is an independent, bounded catalog query driven by a
//! [`UserContext`]. None of them filter "viewed" items except where noted;
//! demotion of viewed items is the scorer's job.
//!
//! | Signal   | Candidates                                        | Value            |
//! |----------|---------------------------------------------------|------------------|
//! | Interest | tags intersect the user's interest tags           | 10               |
//! | History  | tags shared with the last N browsed, not browsed  | 8                |
//! | Like     | tags shared with recent likes, not liked          | 7                |
//! | Hot      | created in the last 7 days, top by engagement     | engagement score |
//! | Recent   | created in the last 3 days, newest first          | 0 (membership)   |

use crate::types::{SignalHit, SignalKind, UserContext};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use data_loader::{ContentCatalog, Item, ItemId, TagId};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Hard per-signal candidate cap
pub const DEFAULT_SIGNAL_CAP: usize = 50;

pub const INTEREST_MATCH_SCORE: f64 = 10.0;
pub const HISTORY_MATCH_SCORE: f64 = 8.0;
pub const LIKE_MATCH_SCORE: f64 = 7.0;

/// Browsed items whose tags feed the history signal
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

pub fn hot_window() -> Duration {
    Duration::days(7)
}

pub fn recent_window() -> Duration {
    Duration::days(3)
}

/// A source of scored candidates for one user.
///
/// ## Design Note
/// - `Send + Sync` so the scorer can run all signals on the rayon pool
/// - Signals are read-only; the same instance serves every request
pub trait Signal: Send + Sync {
    fn kind(&self) -> SignalKind;

    /// Returns the name of the signal (for logging/debugging)
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// At most the signal's cap of hits, in the signal's own order
    fn generate(&self, context: &UserContext, now: DateTime<Utc>) -> Result<Vec<SignalHit>>;
}

fn hits(items: Vec<Item>, value: f64) -> Vec<SignalHit> {
    items.into_iter().map(|item| SignalHit::new(item, value)).collect()
}

/// Union of the tags of the given items (disabled items are skipped)
fn tags_of(catalog: &dyn ContentCatalog, ids: &[ItemId]) -> Result<BTreeSet<TagId>> {
    let items = catalog
        .find_by_ids_enabled(ids)
        .context("Failed to load tag sources")?;
    Ok(items.into_iter().flat_map(|item| item.tags).collect())
}

// =============================================================================
// Interest
// =============================================================================

pub struct InterestSignal {
    catalog: Arc<dyn ContentCatalog>,
    cap: usize,
}

impl InterestSignal {
    pub fn new(catalog: Arc<dyn ContentCatalog>) -> Self {
        Self {
            catalog,
            cap: DEFAULT_SIGNAL_CAP,
        }
    }

    /// Configure the candidate cap (default: 50)
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }
}

impl Signal for InterestSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Interest
    }

    #[instrument(skip(self, context, _now), fields(user_id = context.user_id))]
    fn generate(&self, context: &UserContext, _now: DateTime<Utc>) -> Result<Vec<SignalHit>> {
        if context.interest_tags.is_empty() {
            return Ok(Vec::new());
        }
        let items = self
            .catalog
            .find_by_tags_excluding(&context.interest_tags, &HashSet::new(), self.cap)
            .context("Interest signal query failed")?;
        debug!(hits = items.len(), "Interest signal");
        Ok(hits(items, INTEREST_MATCH_SCORE))
    }
}

// =============================================================================
// History
// =============================================================================

pub struct HistorySignal {
    catalog: Arc<dyn ContentCatalog>,
    cap: usize,
    window: usize,
}

impl HistorySignal {
    pub fn new(catalog: Arc<dyn ContentCatalog>) -> Self {
        Self {
            catalog,
            cap: DEFAULT_SIGNAL_CAP,
            window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    /// Configure how many recent browses contribute tags (default: 10)
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }
}

impl Signal for HistorySignal {
    fn kind(&self) -> SignalKind {
        SignalKind::History
    }

    #[instrument(skip(self, context, _now), fields(user_id = context.user_id))]
    fn generate(&self, context: &UserContext, _now: DateTime<Utc>) -> Result<Vec<SignalHit>> {
        let recent: Vec<ItemId> = context.recent_browsed.iter().take(self.window).copied().collect();
        if recent.is_empty() {
            return Ok(Vec::new());
        }
        let tags = tags_of(self.catalog.as_ref(), &recent)?;
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let items = self
            .catalog
            .find_by_tags_excluding(&tags, &context.browsed, self.cap)
            .context("History signal query failed")?;
        debug!(tags = tags.len(), hits = items.len(), "History signal");
        Ok(hits(items, HISTORY_MATCH_SCORE))
    }
}

// =============================================================================
// Like
// =============================================================================

pub struct LikeSignal {
    catalog: Arc<dyn ContentCatalog>,
    cap: usize,
}

impl LikeSignal {
    pub fn new(catalog: Arc<dyn ContentCatalog>) -> Self {
        Self {
            catalog,
            cap: DEFAULT_SIGNAL_CAP,
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }
}

impl Signal for LikeSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Like
    }

    #[instrument(skip(self, context, _now), fields(user_id = context.user_id))]
    fn generate(&self, context: &UserContext, _now: DateTime<Utc>) -> Result<Vec<SignalHit>> {
        if context.recent_liked.is_empty() {
            return Ok(Vec::new());
        }
        let tags = tags_of(self.catalog.as_ref(), &context.recent_liked)?;
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let items = self
            .catalog
            .find_by_tags_excluding(&tags, &context.liked, self.cap)
            .context("Like signal query failed")?;
        debug!(tags = tags.len(), hits = items.len(), "Like signal");
        Ok(hits(items, LIKE_MATCH_SCORE))
    }
}

// =============================================================================
// Hot
// =============================================================================

pub struct HotSignal {
    catalog: Arc<dyn ContentCatalog>,
    cap: usize,
}

impl HotSignal {
    pub fn new(catalog: Arc<dyn ContentCatalog>) -> Self {
        Self {
            catalog,
            cap: DEFAULT_SIGNAL_CAP,
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }
}

impl Signal for HotSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Hot
    }

    #[instrument(skip(self, context, now), fields(user_id = context.user_id))]
    fn generate(&self, context: &UserContext, now: DateTime<Utc>) -> Result<Vec<SignalHit>> {
        // The catalog ranks the whole window; only the top `cap` come back
        let scored: Vec<SignalHit> = self
            .catalog
            .find_enabled_created_since_order_by_hot(now - hot_window(), self.cap)
            .context("Hot signal query failed")?
            .into_iter()
            .map(|item| {
                let value = item.hot_score();
                SignalHit::new(item, value)
            })
            .collect();

        debug!(hits = scored.len(), "Hot signal");
        Ok(scored)
    }
}

// =============================================================================
// Recent
// =============================================================================

pub struct RecentSignal {
    catalog: Arc<dyn ContentCatalog>,
    cap: usize,
}

impl RecentSignal {
    pub fn new(catalog: Arc<dyn ContentCatalog>) -> Self {
        Self {
            catalog,
            cap: DEFAULT_SIGNAL_CAP,
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }
}

impl Signal for RecentSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Recent
    }

    #[instrument(skip(self, context, now), fields(user_id = context.user_id))]
    fn generate(&self, context: &UserContext, now: DateTime<Utc>) -> Result<Vec<SignalHit>> {
        let items = self
            .catalog
            .find_enabled_created_since(now - recent_window(), self.cap)
            .context("Recent signal query failed")?;
        debug!(hits = items.len(), "Recent signal");
        Ok(hits(items, 0.0))
    }
}

/// The five signals in scoring order, sharing one catalog.
///
/// `cap` can only lower the per-signal limit below [`DEFAULT_SIGNAL_CAP`].
pub fn standard_signals(
    catalog: Arc<dyn ContentCatalog>,
    cap: usize,
    history_window: usize,
) -> Vec<Arc<dyn Signal>> {
    let cap = cap.min(DEFAULT_SIGNAL_CAP);
    vec![
        Arc::new(InterestSignal::new(catalog.clone()).with_cap(cap)),
        Arc::new(
            HistorySignal::new(catalog.clone())
                .with_cap(cap)
                .with_window(history_window),
        ),
        Arc::new(LikeSignal::new(catalog.clone()).with_cap(cap)),
        Arc::new(HotSignal::new(catalog.clone()).with_cap(cap)),
        Arc::new(RecentSignal::new(catalog).with_cap(cap)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_context::{build_user_context, ContextLimits};
    use chrono::TimeZone;
    use data_loader::{CatalogView, ContentKind, DataIndex, LikeEvent};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn post(id: ItemId, hours_old: i64, tags: &[TagId]) -> Item {
        Item::new(id, ContentKind::Post, now() - Duration::hours(hours_old)).with_tags(tags.iter().copied())
    }

    fn catalog_of(items: Vec<Item>) -> Arc<dyn ContentCatalog> {
        let mut index = DataIndex::new();
        for item in items {
            index.insert_item(item);
        }
        Arc::new(CatalogView::new(Arc::new(index), ContentKind::Post))
    }

    fn ids(hits: &[SignalHit]) -> Vec<ItemId> {
        hits.iter().map(|h| h.item.id).collect()
    }

    #[test]
    fn test_interest_signal() {
        let catalog = catalog_of(vec![post(1, 1, &[1]), post(2, 2, &[2]), post(3, 3, &[1, 3])]);
        let context = UserContext::new(1).with_interest_tags([1].into_iter().collect());

        let result = InterestSignal::new(catalog).generate(&context, now()).unwrap();
        assert_eq!(ids(&result), vec![1, 3]);
        assert!(result.iter().all(|h| h.value == INTEREST_MATCH_SCORE));
    }

    #[test]
    fn test_interest_signal_empty_without_interests() {
        let catalog = catalog_of(vec![post(1, 1, &[1])]);
        let result = InterestSignal::new(catalog).generate(&UserContext::new(1), now()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_history_signal_excludes_browsed() {
        let catalog = catalog_of(vec![post(1, 1, &[5]), post(2, 2, &[5]), post(3, 3, &[6])]);
        let context = UserContext::new(1).with_browse_history(vec![1], 1);

        let result = HistorySignal::new(catalog).generate(&context, now()).unwrap();
        assert_eq!(ids(&result), vec![2]);
        assert_eq!(result[0].value, HISTORY_MATCH_SCORE);
    }

    #[test]
    fn test_history_window_limits_tag_sources() {
        let catalog = catalog_of(vec![post(1, 1, &[5]), post(2, 2, &[6]), post(3, 3, &[6]), post(4, 4, &[5])]);
        // Only item 1 (most recent browse) contributes tags
        let context = UserContext::new(1).with_browse_history(vec![1, 2], 2);

        let result = HistorySignal::new(catalog)
            .with_window(1)
            .generate(&context, now())
            .unwrap();
        assert_eq!(ids(&result), vec![4]);
    }

    #[test]
    fn test_like_signal_excludes_liked() {
        let catalog = catalog_of(vec![post(1, 1, &[7]), post(2, 2, &[7]), post(3, 3, &[8])]);
        let context = UserContext::new(1).with_like_history(vec![2], 1);

        let result = LikeSignal::new(catalog).generate(&context, now()).unwrap();
        assert_eq!(ids(&result), vec![1]);
        assert_eq!(result[0].value, LIKE_MATCH_SCORE);
    }

    #[test]
    fn test_like_signal_excludes_likes_older_than_tag_window() {
        let mut index = DataIndex::new();
        for id in 1..=27 {
            index.insert_item(post(id, 30 - id as i64, &[7]));
        }
        for id in 1..=25 {
            index.insert_like(LikeEvent {
                user_id: 1,
                item_id: id,
                created_at: now() - Duration::minutes(60 - id as i64),
            });
        }
        let index = Arc::new(index);
        let context = build_user_context(index.as_ref(), 1, ContextLimits::default()).unwrap();
        let catalog = Arc::new(CatalogView::new(index, ContentKind::Post));

        let result = LikeSignal::new(catalog).generate(&context, now()).unwrap();
        assert_eq!(ids(&result), vec![27, 26]);
    }

    #[test]
    fn test_history_signal_excludes_browses_older_than_tag_window() {
        let mut index = DataIndex::new();
        for id in 1..=15 {
            index.insert_item(post(id, 20 - id as i64, &[3]));
        }
        for id in 1..=12 {
            index.record_browse(1, id, now() - Duration::minutes(60 - id as i64));
        }
        let index = Arc::new(index);
        // Only the five newest browses count as viewed; all twelve are excluded
        let limits = ContextLimits {
            viewed_lookback: 5,
            ..ContextLimits::default()
        };
        let context = build_user_context(index.as_ref(), 1, limits).unwrap();
        assert_eq!(context.recent_browsed.len(), 5);
        let catalog = Arc::new(CatalogView::new(index, ContentKind::Post));

        let result = HistorySignal::new(catalog).generate(&context, now()).unwrap();
        assert_eq!(ids(&result), vec![15, 14, 13]);
    }

    #[test]
    fn test_hot_signal_window_and_order() {
        let catalog = catalog_of(vec![
            post(1, 10, &[]).with_counters(10, 0, 0),
            post(2, 20, &[]).with_counters(100, 0, 0),
            post(3, 24 * 8, &[]).with_counters(1000, 0, 0),
        ]);
        let result = HotSignal::new(catalog).generate(&UserContext::new(1), now()).unwrap();

        assert_eq!(ids(&result), vec![2, 1]);
        assert!((result[0].value - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_hot_signal_sees_past_a_crowded_window() {
        let mut items: Vec<Item> = (1..=600).map(|id| post(id, 10, &[])).collect();
        items.push(post(9999, 24 * 5, &[]).with_counters(10_000, 5_000, 5_000));
        let catalog = catalog_of(items);

        let result = HotSignal::new(catalog).generate(&UserContext::new(1), now()).unwrap();
        assert_eq!(result.len(), DEFAULT_SIGNAL_CAP);
        assert_eq!(result[0].item.id, 9999);
        assert!((result[0].value - 7_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_recent_signal_window() {
        let catalog = catalog_of(vec![post(1, 1, &[]), post(2, 71, &[]), post(3, 24 * 4, &[])]);
        let result = RecentSignal::new(catalog).generate(&UserContext::new(1), now()).unwrap();
        assert_eq!(ids(&result), vec![1, 2]);
    }

    #[test]
    fn test_signals_respect_cap() {
        let items: Vec<Item> = (1..=80).map(|id| post(id, 1, &[1]).with_counters(id, 0, 0)).collect();
        let catalog = catalog_of(items);
        let context = UserContext::new(1).with_interest_tags([1].into_iter().collect());

        for signal in standard_signals(catalog, DEFAULT_SIGNAL_CAP, DEFAULT_HISTORY_WINDOW) {
            let result = signal.generate(&context, now()).unwrap();
            assert!(result.len() <= DEFAULT_SIGNAL_CAP, "{} exceeded cap", signal.name());
        }
    }
}
