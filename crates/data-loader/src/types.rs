//! Core domain types for the catalog and the interaction store.
//!
//! This module defines the fundamental data structures used throughout the
//! system: catalog items, explicit ratings, implicit interactions and the
//! in-memory `DataIndex` that backs both stores.

use crate::error::{DataLoadError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u64;

/// Unique identifier for a catalog item (artwork or post)
pub type ItemId = u64;

/// Unique identifier for a tag
pub type TagId = u32;

/// Upper bound of the rating scale
pub const MAX_RATING_SCORE: f32 = 100.0;

// =============================================================================
// Catalog Types
// =============================================================================

/// The two content families served by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    Artwork,
    Post,
}

/// A catalog entry with the counters and flags the recommenders read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub kind: ContentKind,
    pub tags: BTreeSet<TagId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    /// Mean explicit rating on the 0-100 scale (0 when unrated)
    pub average_score: f32,
    /// Hand-picked by editors
    pub curated: bool,
    /// Disabled items are never served
    pub enabled: bool,
}

impl Item {
    /// Enabled, uncurated item with zeroed counters
    pub fn new(id: ItemId, kind: ContentKind, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            kind,
            tags: BTreeSet::new(),
            created_at,
            updated_at: created_at,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            average_score: 0.0,
            curated: false,
            enabled: true,
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = TagId>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn with_counters(mut self, views: u64, likes: u64, comments: u64) -> Self {
        self.view_count = views;
        self.like_count = likes;
        self.comment_count = comments;
        self
    }

    pub fn with_average_score(mut self, score: f32) -> Self {
        self.average_score = score;
        self
    }

    pub fn curated(mut self, updated_at: DateTime<Utc>) -> Self {
        self.curated = true;
        self.updated_at = updated_at;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Engagement score: `0.4 * views + 0.3 * likes + 0.3 * comments`
    pub fn hot_score(&self) -> f64 {
        0.4 * self.view_count as f64 + 0.3 * self.like_count as f64 + 0.3 * self.comment_count as f64
    }

    /// True if any of `tags` is on this item
    pub fn shares_tag_with(&self, tags: &BTreeSet<TagId>) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }
}

// =============================================================================
// Interaction Types
// =============================================================================

/// A single explicit rating from a user for an item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub item_id: ItemId,
    /// Rating value from 0.0 to 100.0
    pub score: f32,
}

impl Rating {
    /// Build a rating, rejecting scores outside [0, 100]
    pub fn new(user_id: UserId, item_id: ItemId, score: f32) -> Result<Self> {
        if !(0.0..=MAX_RATING_SCORE).contains(&score) {
            return Err(DataLoadError::InvalidValue {
                field: "score".to_string(),
                value: score.to_string(),
            });
        }
        Ok(Self {
            user_id,
            item_id,
            score,
        })
    }
}

/// Browse history row; one per (user, item), updated in place on revisits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrowseEvent {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub last_time: DateTime<Utc>,
    pub count: u32,
}

/// Like membership; the timestamp only orders "most recent" queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LikeEvent {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub created_at: DateTime<Utc>,
}

/// Tags a user declared interest in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInterestProfile {
    pub user_id: UserId,
    pub tags: BTreeSet<TagId>,
}

// =============================================================================
// DataIndex - The In-Memory Stores
// =============================================================================

/// In-memory catalog and interaction store.
///
/// Backs both [`crate::store::ContentCatalog`] (through
/// [`crate::store::CatalogView`]) and [`crate::store::InteractionStore`].
/// It is built once, then shared read-only behind an `Arc`.
#[derive(Debug, Default)]
pub struct DataIndex {
    pub(crate) items: HashMap<ItemId, Item>,

    /// At most one rating per (user, item); BTreeMap keeps snapshots ordered
    pub(crate) ratings: BTreeMap<(UserId, ItemId), Rating>,

    pub(crate) browse: HashMap<UserId, HashMap<ItemId, BrowseEvent>>,
    pub(crate) likes: HashMap<UserId, HashMap<ItemId, LikeEvent>>,
    pub(crate) interests: HashMap<UserId, UserInterestProfile>,

    /// Items carrying each tag (secondary index, maintained on insert)
    pub(crate) tag_index: HashMap<TagId, Vec<ItemId>>,
}

impl DataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// All items carrying `tag`
    pub fn get_items_by_tag(&self, tag: TagId) -> &[ItemId] {
        self.tag_index
            .get(&tag)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_rating(&self, user_id: UserId, item_id: ItemId) -> Option<&Rating> {
        self.ratings.get(&(user_id, item_id))
    }

    pub fn get_interest_profile(&self, user_id: UserId) -> Option<&UserInterestProfile> {
        self.interests.get(&user_id)
    }

    pub fn get_browse_event(&self, user_id: UserId, item_id: ItemId) -> Option<&BrowseEvent> {
        self.browse.get(&user_id).and_then(|m| m.get(&item_id))
    }

    /// Insert or replace an item, keeping the tag index in step
    pub fn insert_item(&mut self, item: Item) {
        if let Some(previous) = self.items.remove(&item.id) {
            for tag in &previous.tags {
                if let Some(ids) = self.tag_index.get_mut(tag) {
                    ids.retain(|&id| id != previous.id);
                }
            }
        }
        for &tag in &item.tags {
            self.tag_index.entry(tag).or_default().push(item.id);
        }
        self.items.insert(item.id, item);
    }

    /// Insert a rating; a second rating for the same pair replaces the first
    pub fn insert_rating(&mut self, rating: Rating) {
        self.ratings.insert((rating.user_id, rating.item_id), rating);
    }

    /// Record a visit: creates the row or bumps `count` and `last_time`
    pub fn record_browse(&mut self, user_id: UserId, item_id: ItemId, at: DateTime<Utc>) {
        self.browse
            .entry(user_id)
            .or_default()
            .entry(item_id)
            .and_modify(|event| {
                event.count += 1;
                if at > event.last_time {
                    event.last_time = at;
                }
            })
            .or_insert(BrowseEvent {
                user_id,
                item_id,
                last_time: at,
                count: 1,
            });
    }

    /// Insert a browse row as stored (used by the loader)
    pub fn insert_browse_event(&mut self, event: BrowseEvent) {
        self.browse
            .entry(event.user_id)
            .or_default()
            .insert(event.item_id, event);
    }

    /// Add a like; liking twice keeps the first timestamp
    pub fn insert_like(&mut self, like: LikeEvent) {
        self.likes
            .entry(like.user_id)
            .or_default()
            .entry(like.item_id)
            .or_insert(like);
    }

    pub fn set_interests(&mut self, user_id: UserId, tags: impl IntoIterator<Item = TagId>) {
        self.interests.insert(
            user_id,
            UserInterestProfile {
                user_id,
                tags: tags.into_iter().collect(),
            },
        );
    }

    /// (items, ratings, browse rows, likes) for debugging/validation
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        let browse = self.browse.values().map(|m| m.len()).sum();
        let likes = self.likes.values().map(|m| m.len()).sum();
        (self.items.len(), self.ratings.len(), browse, likes)
    }
}
