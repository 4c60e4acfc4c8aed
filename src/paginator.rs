//! Paginator
//!
//! Slices an ordered list into fixed-size pages and extracts the key set a
//! page needs resolved. Out-of-range requests clamp to an empty page.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::cache::EntityId;

/// Anything listed in a page that owns an aggregate.
pub trait Keyed {
    fn key(&self) -> EntityId;
}

// == Page ==
/// Position of one page within a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub index: usize,
    pub size: usize,
}

impl Page {
    pub fn new(index: usize, size: usize) -> Self {
        Self { index, size }
    }

    /// Offset of the first row, before clamping.
    pub fn start(&self) -> usize {
        self.index.saturating_mul(self.size)
    }

    /// One past the last row for a list of `total` items.
    pub fn end(&self, total: usize) -> usize {
        self.start().saturating_add(self.size).min(total)
    }

    /// True when this page lies past the end of a list of `total` items.
    pub fn is_past_end(&self, total: usize) -> bool {
        self.size == 0 || self.start() >= total
    }
}

// == Page Of ==
/// Returns the rows of page `page_index`, or an empty slice when the page
/// lies past the end of `items` or `page_size` is zero.
pub fn page_of<T>(items: &[T], page_index: usize, page_size: usize) -> &[T] {
    let page = Page::new(page_index, page_size);
    if page.is_past_end(items.len()) {
        return &[];
    }
    &items[page.start()..page.end(items.len())]
}

// == Keys For ==
/// Distinct keys of a page, in ascending order.
pub fn keys_for<T: Keyed>(slice: &[T]) -> BTreeSet<EntityId> {
    slice.iter().map(Keyed::key).collect()
}

/// Number of pages needed for `total` rows. Zero rows still yield one page.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size).max(1)
}
