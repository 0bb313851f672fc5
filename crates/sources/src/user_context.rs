//! Build a [`UserContext`] from the interaction store
//!
//! The context is gathered once per request, so every signal generator
//! reads the same view of the user without re-querying the store.

use crate::types::UserContext;
use anyhow::{Context, Result};
use data_loader::{InteractionStore, UserId};
use tracing::{debug, instrument};

/// How far back into a user's activity the context reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    /// Most recent browses that make up the viewed set
    pub viewed_lookback: usize,
    /// Most recent likes whose tags feed the like signal
    pub liked_lookback: usize,
    /// Browse and like rows read for "already seen" exclusion
    pub exclusion_lookback: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            viewed_lookback: 200,
            liked_lookback: 20,
            exclusion_lookback: 5_000,
        }
    }
}

impl ContextLimits {
    fn browse_rows(&self) -> usize {
        self.viewed_lookback.max(self.exclusion_lookback)
    }

    fn like_rows(&self) -> usize {
        self.liked_lookback.max(self.exclusion_lookback)
    }
}

/// Build a UserContext for a given user
///
/// This function aggregates all the user information the signals need:
/// - Declared interest tags
/// - Browsed items, most recent first
/// - Liked items, most recent first
///
/// Browses and likes are each read once, deep enough for exclusion, and
/// the recent windows are cut from the front of those rows.
///
/// Unknown users are not an error: they simply get an empty (cold) context.
#[instrument(skip(store, limits))]
pub fn build_user_context(
    store: &dyn InteractionStore,
    user_id: UserId,
    limits: ContextLimits,
) -> Result<UserContext> {
    let interest_tags = store
        .user_interest_tags(user_id)
        .with_context(|| format!("Failed to read interests of user {}", user_id))?;
    let browsed = store
        .recent_browsed_item_ids(user_id, limits.browse_rows())
        .with_context(|| format!("Failed to read browse history of user {}", user_id))?;
    let liked = store
        .recent_liked_item_ids(user_id, limits.like_rows())
        .with_context(|| format!("Failed to read likes of user {}", user_id))?;

    let context = UserContext::new(user_id)
        .with_interest_tags(interest_tags)
        .with_browse_history(browsed, limits.viewed_lookback)
        .with_like_history(liked, limits.liked_lookback);

    debug!(
        interests = context.interest_tags.len(),
        browsed = context.browsed.len(),
        liked = context.liked.len(),
        cold = context.is_cold(),
        "Built user context"
    );

    Ok(context)
}
