//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::{BTreeMap, HashMap};

use crate::cache::EntityId;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch stamps the key with a fresh tick from a monotonic clock.
/// `order` maps tick → key, so:
/// - First entry = Least recently used
/// - Last entry = Most recently used
///
/// `ticks` is the reverse index, which keeps touch and remove at O(log n).
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Recency order, oldest tick first
    order: BTreeMap<u64, EntityId>,
    /// Current tick of every tracked key
    ticks: HashMap<EntityId, u64>,
    /// Monotonic access clock
    clock: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, tracking it if new.
    pub fn touch(&mut self, key: EntityId) {
        if let Some(previous) = self.ticks.get(&key) {
            self.order.remove(previous);
        }
        self.clock += 1;
        self.ticks.insert(key, self.clock);
        self.order.insert(self.clock, key);
    }

    // == Remove ==
    /// Stops tracking a key. No-op if the key is unknown.
    pub fn remove(&mut self, key: EntityId) {
        if let Some(tick) = self.ticks.remove(&key) {
            self.order.remove(&tick);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<EntityId> {
        let (_, key) = self.order.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<EntityId> {
        self.order.first_key_value().map(|(_, key)| *key)
    }

    /// Keys from most to least recently used.
    pub fn most_recent_first(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.values().rev().copied()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.ticks.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn contains(&self, key: EntityId) -> bool {
        self.ticks.contains_key(&key)
    }
}
