//! DataIndex building and indexing logic.
//!
//! Builds a `DataIndex` from the parsed data files:
//! - Insert items, ratings, browse rows, likes and interest profiles
//! - Recompute per-item average scores from the ratings
//! - Validate referential integrity

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

impl DataIndex {
    /// Load every data file from a directory.
    ///
    /// Steps:
    /// 1. Parse all five files in parallel
    /// 2. Insert into the primary stores
    /// 3. Compute item statistics
    /// 4. Validate data integrity
    pub fn load_from_files(data_dir: &Path) -> Result<Self> {
        info!("Loading dataset from {:?}", data_dir);

        let items_path = data_dir.join(parser::ITEMS_FILE);
        let ratings_path = data_dir.join(parser::RATINGS_FILE);
        let browse_path = data_dir.join(parser::BROWSE_FILE);
        let likes_path = data_dir.join(parser::LIKES_FILE);
        let interests_path = data_dir.join(parser::INTERESTS_FILE);

        // Nested joins give five-way parallelism
        let ((items, ratings), ((browse, likes), interests)) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_items(&items_path),
                    || parser::parse_ratings(&ratings_path),
                )
            },
            || {
                rayon::join(
                    || {
                        rayon::join(
                            || parser::parse_browse(&browse_path),
                            || parser::parse_likes(&likes_path),
                        )
                    },
                    || parser::parse_interests(&interests_path),
                )
            },
        );

        let items = items?;
        let ratings = ratings?;
        let browse = browse?;
        let likes = likes?;
        let interests = interests?;

        info!(
            "Parsed {} items, {} ratings, {} browse rows, {} likes, {} interest profiles",
            items.len(),
            ratings.len(),
            browse.len(),
            likes.len(),
            interests.len()
        );

        let mut index = DataIndex::new();
        for item in items {
            index.insert_item(item);
        }
        for rating in ratings {
            index.insert_rating(rating);
        }
        for event in browse {
            index.insert_browse_event(event);
        }
        for like in likes {
            index.insert_like(like);
        }
        for profile in interests {
            index.set_interests(profile.user_id, profile.tags);
        }

        index.compute_item_stats();
        index.validate()?;

        info!("DataIndex successfully built and validated");
        Ok(index)
    }

    /// Recompute `average_score` for every rated item.
    ///
    /// Items without ratings keep the score they were loaded with.
    pub fn compute_item_stats(&mut self) {
        let mut per_item: HashMap<ItemId, Vec<f32>> = HashMap::new();
        for rating in self.ratings.values() {
            per_item.entry(rating.item_id).or_default().push(rating.score);
        }

        let averages: HashMap<ItemId, f32> = per_item
            .par_iter()
            .map(|(&item_id, scores)| {
                let total: f32 = scores.iter().sum();
                (item_id, total / scores.len() as f32)
            })
            .collect();

        for (item_id, avg) in averages {
            if let Some(item) = self.items.get_mut(&item_id) {
                item.average_score = avg;
            }
        }
    }

    /// Validate data integrity
    ///
    /// Check that every rating, browse row and like references a known
    /// item, and that every rating is within [0, 100].
    pub fn validate(&self) -> Result<()> {
        for rating in self.ratings.values() {
            self.require_item(rating.item_id)?;
            if !(0.0..=MAX_RATING_SCORE).contains(&rating.score) {
                return Err(DataLoadError::InvalidValue {
                    field: "score".to_string(),
                    value: rating.score.to_string(),
                });
            }
        }
        for rows in self.browse.values() {
            for item_id in rows.keys() {
                self.require_item(*item_id)?;
            }
        }
        for rows in self.likes.values() {
            for item_id in rows.keys() {
                self.require_item(*item_id)?;
            }
        }
        Ok(())
    }

    fn require_item(&self, item_id: ItemId) -> Result<()> {
        if self.items.contains_key(&item_id) {
            Ok(())
        } else {
            Err(DataLoadError::MissingReference {
                entity: "Item".to_string(),
                id: item_id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::fs;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_compute_item_stats() {
        let mut index = DataIndex::new();
        index.insert_item(Item::new(1, ContentKind::Artwork, now()).with_average_score(10.0));
        index.insert_item(Item::new(2, ContentKind::Artwork, now()).with_average_score(42.0));
        index.insert_rating(Rating::new(1, 1, 80.0).unwrap());
        index.insert_rating(Rating::new(2, 1, 60.0).unwrap());

        index.compute_item_stats();

        assert_eq!(index.get_item(1).unwrap().average_score, 70.0);
        // Unrated item keeps its loaded score
        assert_eq!(index.get_item(2).unwrap().average_score, 42.0);
    }

    #[test]
    fn test_validate_rejects_dangling_rating() {
        let mut index = DataIndex::new();
        index.insert_rating(Rating::new(1, 99, 50.0).unwrap());
        let err = index.validate().unwrap_err();
        assert!(matches!(err, DataLoadError::MissingReference { id: 99, .. }));
    }

    #[test]
    fn test_load_from_files() {
        let dir = std::env::temp_dir().join(format!("data-loader-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(parser::ITEMS_FILE),
            "1::artwork::1|2::1714521600::1714521600::5::1::0::0::0::1\n\
             2::post::2::1714521600::1714521600::9::2::1::0::0::1\n",
        )
        .unwrap();
        fs::write(dir.join(parser::RATINGS_FILE), "7::1::90\n8::1::70\n").unwrap();
        fs::write(dir.join(parser::BROWSE_FILE), "7::2::1714521600::3\n").unwrap();
        fs::write(dir.join(parser::LIKES_FILE), "7::2::1714521600\n").unwrap();
        fs::write(dir.join(parser::INTERESTS_FILE), "7::1|2\n").unwrap();

        let index = DataIndex::load_from_files(&dir).unwrap();
        let (items, ratings, browse, likes) = index.counts();
        assert_eq!((items, ratings, browse, likes), (2, 2, 1, 1));
        assert_eq!(index.get_item(1).unwrap().average_score, 80.0);
        assert_eq!(index.get_items_by_tag(2).len(), 2);

        fs::remove_dir_all(&dir).ok();
    }
}
