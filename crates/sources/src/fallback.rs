//! Non-personalized pools used to top up a page
//!
//! Each pool is a single catalog query with no per-user state, so the
//! composer can call them in any order and skip any that fail.

use crate::types::CandidateSource;
use anyhow::{Context, Result};
use data_loader::{ContentCatalog, Item};
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct FallbackPools {
    catalog: Arc<dyn ContentCatalog>,
}

impl FallbackPools {
    pub fn new(catalog: Arc<dyn ContentCatalog>) -> Self {
        Self { catalog }
    }

    /// Enabled curated items, most recently updated first
    #[instrument(skip(self))]
    pub fn curated(&self, limit: usize) -> Result<Vec<Item>> {
        self.query(CandidateSource::Curated, limit, |catalog, limit| {
            catalog.find_enabled_curated_order_by_updated_desc(limit)
        })
    }

    /// Enabled items by average score, then view count, both descending
    #[instrument(skip(self))]
    pub fn popular(&self, limit: usize) -> Result<Vec<Item>> {
        self.query(CandidateSource::Popular, limit, |catalog, limit| {
            catalog.find_enabled_order_by_score_then_views(limit)
        })
    }

    /// Enabled items, newest first
    #[instrument(skip(self))]
    pub fn recent(&self, limit: usize) -> Result<Vec<Item>> {
        self.query(CandidateSource::Recent, limit, |catalog, limit| {
            catalog.find_enabled_order_by_created_desc(limit)
        })
    }

    /// Dispatch by pool; `Personalized` is not a fallback pool
    pub fn pool(&self, source: CandidateSource, limit: usize) -> Result<Vec<Item>> {
        match source {
            CandidateSource::Curated => self.curated(limit),
            CandidateSource::Popular => self.popular(limit),
            CandidateSource::Recent => self.recent(limit),
            CandidateSource::Personalized => Ok(Vec::new()),
        }
    }

    fn query<F>(&self, source: CandidateSource, limit: usize, fetch: F) -> Result<Vec<Item>>
    where
        F: FnOnce(&dyn ContentCatalog, usize) -> data_loader::Result<Vec<Item>>,
    {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let items = fetch(self.catalog.as_ref(), limit)
            .with_context(|| format!("Failed to query {} pool", source))?;
        debug!(pool = %source, fetched = items.len(), "Queried fallback pool");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use data_loader::{CatalogView, ContentKind, DataIndex};

    fn create_pools() -> FallbackPools {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut index = DataIndex::new();
        index.insert_item(
            Item::new(1, ContentKind::Artwork, t0)
                .with_average_score(90.0)
                .curated(t0 + Duration::days(1)),
        );
        index.insert_item(
            Item::new(2, ContentKind::Artwork, t0 + Duration::hours(1))
                .with_average_score(70.0)
                .with_counters(500, 0, 0),
        );
        index.insert_item(
            Item::new(3, ContentKind::Artwork, t0 + Duration::hours(2))
                .with_average_score(70.0)
                .with_counters(900, 0, 0)
                .curated(t0 + Duration::days(3)),
        );
        index.insert_item(Item::new(4, ContentKind::Artwork, t0 + Duration::hours(3)).disabled());
        FallbackPools::new(Arc::new(CatalogView::new(Arc::new(index), ContentKind::Artwork)))
    }

    fn ids(items: Vec<Item>) -> Vec<u64> {
        items.into_iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_curated_pool_order() {
        let pools = create_pools();
        assert_eq!(ids(pools.curated(10).unwrap()), vec![3, 1]);
    }

    #[test]
    fn test_popular_pool_breaks_ties_by_views() {
        let pools = create_pools();
        assert_eq!(ids(pools.popular(10).unwrap()), vec![1, 3, 2]);
    }

    #[test]
    fn test_recent_pool_skips_disabled() {
        let pools = create_pools();
        assert_eq!(ids(pools.recent(2).unwrap()), vec![3, 2]);
    }

    #[test]
    fn test_zero_limit_is_empty() {
        let pools = create_pools();
        assert!(pools.pool(CandidateSource::Popular, 0).unwrap().is_empty());
        assert!(pools.pool(CandidateSource::Personalized, 10).unwrap().is_empty());
    }
}
