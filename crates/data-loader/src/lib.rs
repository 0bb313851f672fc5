//! # Data Loader Crate
//!
//! Domain types and store interfaces for the recommendation engine, plus an
//! in-memory implementation loaded from data files.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Item, Rating, BrowseEvent, LikeEvent, DataIndex)
//! - **store**: The `ContentCatalog` and `InteractionStore` read interfaces
//! - **parser**: Parse `.dat` files into Rust structs
//! - **index**: Build a `DataIndex` from a data directory
//! - **error**: Error types for loading and querying
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{CatalogView, ContentKind, DataIndex};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let index = Arc::new(DataIndex::load_from_files(Path::new("data/sample"))?);
//! let artworks = CatalogView::new(index.clone(), ContentKind::Artwork);
//! let newest = artworks.find_enabled_order_by_created_desc(20)?;
//! ```

pub mod error;
pub mod index;
pub mod parser;
pub mod store;
pub mod types;

pub use error::{DataLoadError, Result};
pub use store::{CatalogView, ContentCatalog, InteractionStore};
pub use types::{
    BrowseEvent, ContentKind, DataIndex, Item, ItemId, LikeEvent, Rating, TagId, UserId,
    UserInterestProfile, MAX_RATING_SCORE,
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_data_index_creation() {
        let index = DataIndex::new();
        assert_eq!(index.counts(), (0, 0, 0, 0));
    }

    #[test]
    fn test_insert_item_updates_tag_index() {
        let mut index = DataIndex::new();
        index.insert_item(Item::new(1, ContentKind::Artwork, Utc::now()).with_tags([5, 6]));
        assert_eq!(index.get_items_by_tag(5), &[1]);

        // Replacing the item drops its old tags from the index
        index.insert_item(Item::new(1, ContentKind::Artwork, Utc::now()).with_tags([6]));
        assert!(index.get_items_by_tag(5).is_empty());
        assert_eq!(index.get_items_by_tag(6), &[1]);
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(1, 1, 0.0).is_ok());
        assert!(Rating::new(1, 1, 100.0).is_ok());
        assert!(Rating::new(1, 1, -0.5).is_err());
        assert!(Rating::new(1, 1, 100.5).is_err());
        assert!(Rating::new(1, 1, f32::NAN).is_err());
    }

    #[test]
    fn test_duplicate_like_is_ignored() {
        let mut index = DataIndex::new();
        let first = Utc::now();
        index.insert_like(LikeEvent { user_id: 1, item_id: 2, created_at: first });
        index.insert_like(LikeEvent {
            user_id: 1,
            item_id: 2,
            created_at: first + chrono::Duration::hours(1),
        });
        assert_eq!(index.counts().3, 1);
    }

    #[test]
    fn test_empty_queries() {
        let index = DataIndex::new();
        assert!(index.get_item(999).is_none());
        assert!(index.get_rating(1, 999).is_none());
        assert!(index.get_items_by_tag(3).is_empty());
        assert!(index.user_interest_tags(1).unwrap().is_empty());
    }
}
