//! Integration tests for the pipeline.
//!
//! These tests run the real signal generators over a small catalog and
//! check that scoring, deduplication and pagination work together.

use chrono::{DateTime, Duration, TimeZone, Utc};
use data_loader::{CatalogView, ContentCatalog, ContentKind, DataIndex, Item, LikeEvent};
use pipeline::{Page, ResultAssembler, ScoreBoard, ScoredPost, VIEWED_PENALTY};
use sources::{
    build_user_context, standard_signals, ContextLimits, FallbackPools, UserContext,
    DEFAULT_HISTORY_WINDOW, DEFAULT_SIGNAL_CAP,
};
use std::collections::HashSet;
use std::sync::Arc;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn create_test_setup() -> Arc<DataIndex> {
    let mut index = DataIndex::new();

    // Posts 1-4 share tag 1, posts 5-6 share tag 2, post 7 is old and untagged
    for id in 1..=4 {
        index.insert_item(
            Item::new(id, ContentKind::Post, now() - Duration::hours(id as i64 * 6))
                .with_tags([1])
                .with_counters(id * 10, id, 0),
        );
    }
    for id in 5..=6 {
        index.insert_item(
            Item::new(id, ContentKind::Post, now() - Duration::hours(30))
                .with_tags([2])
                .with_counters(5, 5, 5),
        );
    }
    index.insert_item(Item::new(7, ContentKind::Post, now() - Duration::days(30)).with_counters(10_000, 0, 0));

    // Artworks for the assembler tests
    for id in 100..110 {
        index.insert_item(
            Item::new(id, ContentKind::Artwork, now() - Duration::hours(id as i64 - 100))
                .with_average_score((id - 100) as f32 * 10.0),
        );
    }

    index.set_interests(1, [1]);
    index.record_browse(1, 2, now() - Duration::hours(1));
    index.insert_like(LikeEvent {
        user_id: 1,
        item_id: 5,
        created_at: now() - Duration::hours(2),
    });

    Arc::new(index)
}

fn score_posts(index: &Arc<DataIndex>, context: &UserContext) -> Vec<ScoredPost> {
    let catalog: Arc<dyn ContentCatalog> = Arc::new(CatalogView::new(index.clone(), ContentKind::Post));
    let mut board = ScoreBoard::new();
    for signal in standard_signals(catalog, DEFAULT_SIGNAL_CAP, DEFAULT_HISTORY_WINDOW) {
        let hits = signal.generate(context, now()).unwrap();
        board.add(signal.kind(), hits);
    }
    board.into_ranked(context, now())
}

#[test]
fn test_full_scoring_pipeline() {
    let index = create_test_setup();
    let context = build_user_context(index.as_ref(), 1, ContextLimits::default()).unwrap();
    let ranked = score_posts(&index, &context);

    let ids: Vec<u64> = ranked.iter().map(|p| p.item.id).collect();
    let distinct: HashSet<u64> = ids.iter().copied().collect();
    assert_eq!(ids.len(), distinct.len(), "scored list contains duplicates");

    // Only posts, never artworks
    assert!(ranked.iter().all(|p| p.item.kind == ContentKind::Post));

    // Totals are sorted descending
    for pair in ranked.windows(2) {
        assert!(pair[0].score.total >= pair[1].score.total);
    }

    // Browsed post 2 is demoted but still present
    let browsed = ranked.iter().find(|p| p.item.id == 2).unwrap();
    assert_eq!(browsed.score.viewed_penalty, VIEWED_PENALTY);

    // Post 6 shares a tag with liked post 5; post 5 itself is excluded from the like signal
    let six = ranked.iter().find(|p| p.item.id == 6).unwrap();
    assert_eq!(six.score.like, 7.0);
    let five = ranked.iter().find(|p| p.item.id == 5).unwrap();
    assert_eq!(five.score.like, 0.0);
}

#[test]
fn test_cold_user_ranks_by_hot_and_freshness_only() {
    let index = create_test_setup();
    let context = UserContext::new(42);
    let ranked = score_posts(&index, &context);

    assert!(!ranked.is_empty());
    for post in &ranked {
        assert_eq!(post.score.interest, 0.0);
        assert_eq!(post.score.history, 0.0);
        assert_eq!(post.score.like, 0.0);
        let expected = 0.15 * post.score.hot + 0.10 * post.score.freshness;
        assert!((post.score.total - expected).abs() < 1e-9);
    }
    // Post 7 is outside both the hot and the recent window
    assert!(ranked.iter().all(|p| p.item.id != 7));
}

#[test]
fn test_pagination_over_scored_posts() {
    let index = create_test_setup();
    let context = UserContext::new(42);
    let ranked = score_posts(&index, &context);
    let total = ranked.len();

    let first = Page::slice(ranked.clone(), 0, 2);
    let beyond = Page::slice(ranked, 100, 2);

    assert_eq!(first.len(), 2.min(total));
    assert_eq!(first.total, total);
    assert!(beyond.is_empty());
    assert_eq!(beyond.total, total);
}

#[test]
fn test_assembler_with_fallback_pools() {
    let index = create_test_setup();
    let pools = FallbackPools::new(Arc::new(CatalogView::new(index, ContentKind::Artwork)));

    let mut assembler = ResultAssembler::new(6);
    assembler.extend_unseen(pools.curated(6).unwrap(), 3);
    for pool in [pools.popular(6 + assembler.seen_count()), pools.recent(6 + assembler.seen_count())] {
        let quota = assembler.remaining();
        assembler.extend_unseen(pool.unwrap(), quota);
    }

    let items = assembler.into_items();
    assert_eq!(items.len(), 6);
    // Nothing curated, so popular fills first: highest average score first
    assert_eq!(items[0].id, 109);
    let distinct: HashSet<u64> = items.iter().map(|i| i.id).collect();
    assert_eq!(distinct.len(), 6);
}
