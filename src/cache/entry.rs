//! Cache Entry Module
//!
//! Read-only view of a cached aggregate handed out to callers.

use serde::Serialize;

use crate::cache::{Aggregate, EntityId};

// == Cache Entry ==
/// A cached aggregate together with its recency rank.
///
/// Entries are copies; mutating one never touches the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    /// Entity the aggregate belongs to
    pub key: EntityId,
    /// Cached aggregate value
    pub value: Aggregate,
    /// 0 = most recently used
    pub rank: usize,
}

impl CacheEntry {
    pub fn new(key: EntityId, value: Aggregate, rank: usize) -> Self {
        Self { key, value, rank }
    }

    /// True for the entry that would survive longest under eviction pressure.
    pub fn is_most_recent(&self) -> bool {
        self.rank == 0
    }
}
