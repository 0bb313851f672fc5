//! Ordered, deduplicating accumulator for tiered result lists

use data_loader::{Item, ItemId};
use std::collections::HashSet;

const PREALLOC_LIMIT: usize = 1024;

/// Builds a result list tier by tier, never admitting an item id twice.
///
/// ## Usage
/// ```ignore
/// let mut assembler = ResultAssembler::new(page_size);
/// assembler.extend_unseen(personalized, assembler.remaining());
/// if !assembler.is_full() {
///     assembler.extend_unseen(curated, quota);
/// }
/// let items = assembler.into_items();
/// ```
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    items: Vec<Item>,
    seen: HashSet<ItemId>,
    target: usize,
}

impl ResultAssembler {
    /// An empty list that stops accepting items at `target`
    pub fn new(target: usize) -> Self {
        // Far pages have huge targets that the pools can never fill
        let capacity = target.min(PREALLOC_LIMIT);
        Self {
            items: Vec::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            target,
        }
    }

    /// Slots left before the target is reached
    pub fn remaining(&self) -> usize {
        self.target.saturating_sub(self.items.len())
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct ids admitted so far
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Append candidates in order, skipping ids already present.
    ///
    /// Stops after `quota` admissions or when the target is reached,
    /// whichever comes first. Returns how many were admitted.
    pub fn extend_unseen(&mut self, candidates: impl IntoIterator<Item = Item>, quota: usize) -> usize {
        let budget = quota.min(self.remaining());
        let mut admitted = 0;
        for item in candidates {
            if admitted == budget {
                break;
            }
            if self.seen.insert(item.id) {
                self.items.push(item);
                admitted += 1;
            }
        }
        admitted
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }
}
