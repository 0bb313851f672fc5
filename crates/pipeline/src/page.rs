//! Offset pagination over an already-ordered result list

use serde::Serialize;

/// One page of results.
///
/// `total` is the length of the list the page was cut from, so callers can
/// tell an out-of-range page (empty items, non-zero total) from an empty
/// result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn empty(page: usize, page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            page,
            page_size,
            total: 0,
        }
    }

    /// Cut `[page * page_size, page * page_size + page_size)` out of `all`,
    /// clamped to its bounds
    pub fn slice(all: Vec<T>, page: usize, page_size: usize) -> Self {
        let total = all.len();
        let offset = page.saturating_mul(page_size);
        let items = if offset >= total {
            Vec::new()
        } else {
            all.into_iter().skip(offset).take(page_size).collect()
        };
        Self {
            items,
            page,
            page_size,
            total,
        }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page() {
        let page = Page::slice((1..=25).collect::<Vec<u32>>(), 0, 10);
        assert_eq!(page.items, (1..=10).collect::<Vec<u32>>());
        assert_eq!(page.total, 25);
    }

    #[test]
    fn test_last_partial_page() {
        let page = Page::slice((1..=25).collect::<Vec<u32>>(), 2, 10);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_offset_beyond_end() {
        let page = Page::slice(vec![1, 2, 3], 5, 10);
        assert!(page.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_huge_page_number_does_not_overflow() {
        let page = Page::slice(vec![1, 2, 3], usize::MAX, 10);
        assert!(page.is_empty());
    }

    #[test]
    fn test_zero_page_size() {
        let page = Page::slice(vec![1, 2, 3], 0, 0);
        assert!(page.is_empty());
        assert_eq!(page.total, 3);
    }
}
