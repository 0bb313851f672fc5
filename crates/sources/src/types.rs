//! Core types shared by the candidate sources and signal generators

use data_loader::{Item, ItemId, TagId, UserId};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Which pool a recommended item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    /// Ranked by the trained model for this user
    Personalized,
    /// Editorially picked, newest update first
    Curated,
    /// Highest average score, then most viewed
    Popular,
    /// Newest first
    Recent,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::Personalized => "personalized",
            CandidateSource::Curated => "curated",
            CandidateSource::Popular => "popular",
            CandidateSource::Recent => "recent",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five independent signals that feed post scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalKind {
    Interest,
    History,
    Like,
    Hot,
    Recent,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Interest => "interest",
            SignalKind::History => "history",
            SignalKind::Like => "like",
            SignalKind::Hot => "hot",
            SignalKind::Recent => "recent",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item produced by a signal generator, with that signal's value for it
#[derive(Debug, Clone)]
pub struct SignalHit {
    pub item: Item,
    pub value: f64,
}

impl SignalHit {
    pub fn new(item: Item, value: f64) -> Self {
        Self { item, value }
    }
}

/// Everything the signal generators need to know about one user.
///
/// Built once per request so the five generators can run in parallel
/// without touching the interaction store again. The `recent_*` lists are
/// short windows that feed tags; `browsed` and `liked` reach much further
/// back and only decide what the user has already seen.
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub user_id: UserId,

    /// Tags the user declared interest in
    pub interest_tags: BTreeSet<TagId>,

    /// Browsed item ids, most recent first
    pub recent_browsed: Vec<ItemId>,

    /// Ids of `recent_browsed`; these get the viewed penalty
    pub viewed: HashSet<ItemId>,

    /// Every browsed id read for the request, excluded by the history signal
    pub browsed: HashSet<ItemId>,

    /// Liked item ids, most recent first
    pub recent_liked: Vec<ItemId>,

    /// Every liked id read for the request, excluded by the like signal
    pub liked: HashSet<ItemId>,
}

impl UserContext {
    /// Context for a user with no recorded activity
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn with_interest_tags(mut self, tags: BTreeSet<TagId>) -> Self {
        self.interest_tags = tags;
        self
    }

    /// Browse history, most recent first; the first `window` ids are recent
    pub fn with_browse_history(mut self, history: Vec<ItemId>, window: usize) -> Self {
        self.browsed = history.iter().copied().collect();
        let mut recent = history;
        recent.truncate(window);
        self.viewed = recent.iter().copied().collect();
        self.recent_browsed = recent;
        self
    }

    /// Like history, most recent first; the first `window` ids are recent
    pub fn with_like_history(mut self, history: Vec<ItemId>, window: usize) -> Self {
        self.liked = history.iter().copied().collect();
        let mut recent = history;
        recent.truncate(window);
        self.recent_liked = recent;
        self
    }

    /// True when the user has no interests, browses or likes on record
    pub fn is_cold(&self) -> bool {
        self.interest_tags.is_empty() && self.browsed.is_empty() && self.liked.is_empty()
    }

    /// True if the item is among the recently browsed ones
    pub fn has_viewed(&self, item_id: ItemId) -> bool {
        self.viewed.contains(&item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cold_context() {
        let context = UserContext::new(7);
        assert_eq!(context.user_id, 7);
        assert!(context.is_cold());
        assert!(!context.has_viewed(1));
    }

    #[test]
    fn test_browsed_keeps_order_and_lookup() {
        let context = UserContext::new(1).with_browse_history(vec![30, 10, 20], 3);
        assert_eq!(context.recent_browsed, vec![30, 10, 20]);
        assert!(context.has_viewed(10));
        assert!(!context.is_cold());
    }

    #[test]
    fn test_history_splits_window_from_exclusions() {
        let context = UserContext::new(1)
            .with_browse_history(vec![5, 4, 3, 2, 1], 2)
            .with_like_history(vec![9, 8, 7], 1);

        assert_eq!(context.recent_browsed, vec![5, 4]);
        assert!(context.has_viewed(4));
        assert!(!context.has_viewed(3));
        assert!(context.browsed.contains(&1));
        assert_eq!(context.recent_liked, vec![9]);
        assert!(context.liked.contains(&7));
    }

    #[test]
    fn test_signal_kind_names() {
        let kinds = [
            SignalKind::Interest,
            SignalKind::History,
            SignalKind::Like,
            SignalKind::Hot,
            SignalKind::Recent,
        ];
        let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["interest", "history", "like", "hot", "recent"]);
        assert_eq!(CandidateSource::Curated.to_string(), "curated");
    }
}
