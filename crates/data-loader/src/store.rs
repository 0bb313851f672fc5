//! Read interfaces of the external stores.
//!
//! The recommenders never talk to a database directly. They go through
//! these two traits, which production deployments implement over their
//! persistence layer and which [`DataIndex`] implements in memory.

use crate::error::Result;
use crate::types::*;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Read side of the content catalog for one content kind.
///
/// Every `limit` is a hard cap on the number of rows returned.
pub trait ContentCatalog: Send + Sync {
    /// Fetch a single item, enabled or not
    fn find_by_id(&self, id: ItemId) -> Result<Option<Item>>;

    /// Fetch the enabled items among `ids`, preserving the order of `ids`.
    /// Missing and disabled ids are dropped.
    fn find_by_ids_enabled(&self, ids: &[ItemId]) -> Result<Vec<Item>>;

    /// Enabled items by average score desc, then view count desc
    fn find_enabled_order_by_score_then_views(&self, limit: usize) -> Result<Vec<Item>>;

    /// Enabled items, newest first
    fn find_enabled_order_by_created_desc(&self, limit: usize) -> Result<Vec<Item>>;

    /// Enabled curated items, most recently updated first
    fn find_enabled_curated_order_by_updated_desc(&self, limit: usize) -> Result<Vec<Item>>;

    /// Enabled items carrying at least one of `tags`, minus `exclude`, newest first
    fn find_by_tags_excluding(
        &self,
        tags: &BTreeSet<TagId>,
        exclude: &HashSet<ItemId>,
        limit: usize,
    ) -> Result<Vec<Item>>;

    /// Enabled items created at or after `since`, newest first
    fn find_enabled_created_since(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<Item>>;

    /// Enabled items created at or after `since`, highest [`Item::hot_score`]
    /// first. Ranks the whole window before applying `limit`.
    fn find_enabled_created_since_order_by_hot(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Item>>;
}

/// Read side of the interaction store (ratings, browsing, likes, interests)
pub trait InteractionStore: Send + Sync {
    /// Full snapshot of every rating
    fn all_ratings(&self) -> Result<Vec<Rating>>;

    fn count_ratings(&self) -> Result<usize>;

    /// Number of users with at least one rating
    fn count_distinct_users(&self) -> Result<usize>;

    /// Number of items with at least one rating
    fn count_distinct_items(&self) -> Result<usize>;

    /// Browsed item ids, most recently visited first
    fn recent_browsed_item_ids(&self, user_id: UserId, limit: usize) -> Result<Vec<ItemId>>;

    /// Liked item ids, most recently liked first
    fn recent_liked_item_ids(&self, user_id: UserId, limit: usize) -> Result<Vec<ItemId>>;

    /// Declared interest tags (empty when the user has no profile)
    fn user_interest_tags(&self, user_id: UserId) -> Result<BTreeSet<TagId>>;
}

/// Newest first; ids break ties so results are stable across calls
fn newest_first(a: &Item, b: &Item) -> Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

/// [`ContentCatalog`] over the items of one [`ContentKind`] in a shared [`DataIndex`]
#[derive(Debug, Clone)]
pub struct CatalogView {
    index: Arc<DataIndex>,
    kind: ContentKind,
}

impl CatalogView {
    pub fn new(index: Arc<DataIndex>, kind: ContentKind) -> Self {
        Self { index, kind }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    fn enabled_items(&self) -> impl Iterator<Item = &Item> {
        self.index
            .items
            .values()
            .filter(move |item| item.kind == self.kind && item.enabled)
    }
}

fn sorted_limited(
    mut items: Vec<Item>,
    order: impl FnMut(&Item, &Item) -> Ordering,
    limit: usize,
) -> Vec<Item> {
    items.sort_by(order);
    items.truncate(limit);
    items
}

impl ContentCatalog for CatalogView {
    fn find_by_id(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self
            .index
            .get_item(id)
            .filter(|item| item.kind == self.kind)
            .cloned())
    }

    fn find_by_ids_enabled(&self, ids: &[ItemId]) -> Result<Vec<Item>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.index.get_item(*id))
            .filter(|item| item.kind == self.kind && item.enabled)
            .cloned()
            .collect())
    }

    fn find_enabled_order_by_score_then_views(&self, limit: usize) -> Result<Vec<Item>> {
        let items = self.enabled_items().cloned().collect();
        Ok(sorted_limited(
            items,
            |a, b| {
                b.average_score
                    .total_cmp(&a.average_score)
                    .then(b.view_count.cmp(&a.view_count))
                    .then(a.id.cmp(&b.id))
            },
            limit,
        ))
    }

    fn find_enabled_order_by_created_desc(&self, limit: usize) -> Result<Vec<Item>> {
        let items = self.enabled_items().cloned().collect();
        Ok(sorted_limited(items, newest_first, limit))
    }

    fn find_enabled_curated_order_by_updated_desc(&self, limit: usize) -> Result<Vec<Item>> {
        let items = self.enabled_items().filter(|i| i.curated).cloned().collect();
        Ok(sorted_limited(
            items,
            |a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)),
            limit,
        ))
    }

    fn find_by_tags_excluding(
        &self,
        tags: &BTreeSet<TagId>,
        exclude: &HashSet<ItemId>,
        limit: usize,
    ) -> Result<Vec<Item>> {
        let mut matched: HashSet<ItemId> = HashSet::new();
        for &tag in tags {
            matched.extend(
                self.index
                    .get_items_by_tag(tag)
                    .iter()
                    .filter(|id| !exclude.contains(*id)),
            );
        }
        let items = matched
            .into_iter()
            .filter_map(|id| self.index.get_item(id))
            .filter(|item| item.kind == self.kind && item.enabled)
            .cloned()
            .collect();
        Ok(sorted_limited(items, newest_first, limit))
    }

    fn find_enabled_created_since(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<Item>> {
        let items = self
            .enabled_items()
            .filter(|item| item.created_at >= since)
            .cloned()
            .collect();
        Ok(sorted_limited(items, newest_first, limit))
    }

    fn find_enabled_created_since_order_by_hot(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Item>> {
        let mut scored: Vec<(f64, Item)> = self
            .enabled_items()
            .filter(|item| item.created_at >= since)
            .cloned()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|item| (item.hot_score(), item))
            .collect();
        scored.par_sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then_with(|| newest_first(a, b)));
        Ok(scored.into_iter().take(limit).map(|(_, item)| item).collect())
    }
}

impl InteractionStore for DataIndex {
    fn all_ratings(&self) -> Result<Vec<Rating>> {
        Ok(self.ratings.values().copied().collect())
    }

    fn count_ratings(&self) -> Result<usize> {
        Ok(self.ratings.len())
    }

    fn count_distinct_users(&self) -> Result<usize> {
        let users: HashSet<UserId> = self.ratings.keys().map(|(user, _)| *user).collect();
        Ok(users.len())
    }

    fn count_distinct_items(&self) -> Result<usize> {
        let items: HashSet<ItemId> = self.ratings.keys().map(|(_, item)| *item).collect();
        Ok(items.len())
    }

    fn recent_browsed_item_ids(&self, user_id: UserId, limit: usize) -> Result<Vec<ItemId>> {
        let mut events: Vec<&BrowseEvent> = match self.browse.get(&user_id) {
            Some(rows) => rows.values().collect(),
            None => return Ok(Vec::new()),
        };
        events.sort_by(|a, b| b.last_time.cmp(&a.last_time).then(b.item_id.cmp(&a.item_id)));
        Ok(events.into_iter().take(limit).map(|e| e.item_id).collect())
    }

    fn recent_liked_item_ids(&self, user_id: UserId, limit: usize) -> Result<Vec<ItemId>> {
        let mut likes: Vec<&LikeEvent> = match self.likes.get(&user_id) {
            Some(rows) => rows.values().collect(),
            None => return Ok(Vec::new()),
        };
        likes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.item_id.cmp(&a.item_id)));
        Ok(likes.into_iter().take(limit).map(|l| l.item_id).collect())
    }

    fn user_interest_tags(&self, user_id: UserId) -> Result<BTreeSet<TagId>> {
        Ok(self
            .interests
            .get(&user_id)
            .map(|profile| profile.tags.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn create_test_index() -> Arc<DataIndex> {
        let mut index = DataIndex::new();
        index.insert_item(
            Item::new(1, ContentKind::Artwork, t0())
                .with_tags([1, 2])
                .with_average_score(80.0)
                .with_counters(10, 0, 0),
        );
        index.insert_item(
            Item::new(2, ContentKind::Artwork, t0() + Duration::hours(1))
                .with_tags([2])
                .with_average_score(80.0)
                .with_counters(50, 0, 0)
                .curated(t0() + Duration::hours(5)),
        );
        index.insert_item(
            Item::new(3, ContentKind::Artwork, t0() + Duration::hours(2))
                .with_tags([3])
                .with_average_score(95.0)
                .disabled(),
        );
        index.insert_item(
            Item::new(4, ContentKind::Post, t0() + Duration::hours(3)).with_tags([2]),
        );
        Arc::new(index)
    }

    #[test]
    fn test_find_by_ids_enabled_preserves_order_and_drops_disabled() {
        let catalog = CatalogView::new(create_test_index(), ContentKind::Artwork);
        let items = catalog.find_by_ids_enabled(&[2, 3, 99, 1, 4]).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_popular_orders_by_score_then_views() {
        let catalog = CatalogView::new(create_test_index(), ContentKind::Artwork);
        let items = catalog.find_enabled_order_by_score_then_views(10).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id).collect();
        // Item 3 scores highest but is disabled
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_tags_query_respects_kind_and_exclusions() {
        let catalog = CatalogView::new(create_test_index(), ContentKind::Artwork);
        let tags: BTreeSet<TagId> = [2].into_iter().collect();
        let exclude: HashSet<ItemId> = [2].into_iter().collect();
        let items = catalog.find_by_tags_excluding(&tags, &exclude, 10).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_created_since_window() {
        let catalog = CatalogView::new(create_test_index(), ContentKind::Artwork);
        let items = catalog
            .find_enabled_created_since(t0() + Duration::minutes(30), 10)
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 2);
    }

    #[test]
    fn test_hot_order_ranks_whole_window() {
        let mut index = DataIndex::new();
        // Plenty of fresh posts without engagement
        for id in 1..=600 {
            index.insert_item(Item::new(id, ContentKind::Post, t0() - Duration::minutes(id as i64)));
        }
        // Older, but still inside the window and far more engaged
        index.insert_item(
            Item::new(9999, ContentKind::Post, t0() - Duration::days(5)).with_counters(10_000, 5_000, 5_000),
        );
        index.insert_item(
            Item::new(9998, ContentKind::Post, t0() - Duration::days(9)).with_counters(90_000, 0, 0),
        );
        let catalog = CatalogView::new(Arc::new(index), ContentKind::Post);

        let items = catalog
            .find_enabled_created_since_order_by_hot(t0() - Duration::days(7), 3)
            .unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id).collect();
        // Ties fall back to newest first
        assert_eq!(ids, vec![9999, 1, 2]);
    }

    #[test]
    fn test_hot_score_formula() {
        let item = Item::new(1, ContentKind::Post, t0()).with_counters(100, 50, 10);
        assert!((item.hot_score() - 58.0).abs() < 1e-9);
    }

    #[test]
    fn test_recent_browsed_orders_by_last_visit() {
        let mut index = DataIndex::new();
        index.record_browse(7, 10, t0());
        index.record_browse(7, 11, t0() + Duration::hours(1));
        index.record_browse(7, 10, t0() + Duration::hours(2));

        let ids = index.recent_browsed_item_ids(7, 10).unwrap();
        assert_eq!(ids, vec![10, 11]);
        assert_eq!(index.get_browse_event(7, 10).unwrap().count, 2);
        assert!(index.recent_browsed_item_ids(8, 10).unwrap().is_empty());
    }

    #[test]
    fn test_rating_counts() {
        let mut index = DataIndex::new();
        index.insert_rating(Rating::new(1, 10, 90.0).unwrap());
        index.insert_rating(Rating::new(1, 10, 40.0).unwrap());
        index.insert_rating(Rating::new(2, 11, 70.0).unwrap());

        assert_eq!(index.count_ratings().unwrap(), 2);
        assert_eq!(index.count_distinct_users().unwrap(), 2);
        assert_eq!(index.count_distinct_items().unwrap(), 2);
        assert_eq!(index.get_rating(1, 10).unwrap().score, 40.0);
    }
}
