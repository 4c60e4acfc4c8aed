//! Bounded Cache Module
//!
//! Fixed-capacity aggregate cache combining HashMap storage with LRU tracking,
//! shareable across threads and tasks.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;
use tracing::debug;

use crate::cache::{Aggregate, CacheEntry, CacheStats, EntityId, LruTracker};
use crate::error::{AggregateError, Result};

/// Shared slot for one in-flight read-through fetch.
type FlightSlot = Arc<OnceCell<Aggregate>>;

// == Cache State ==
/// Everything guarded by the cache mutex.
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<EntityId, Aggregate>,
    lru: LruTracker,
    stats: CacheStats,
    /// Cold keys currently being fetched through `get_or_compute`
    in_flight: HashMap<EntityId, FlightSlot>,
    /// Bumped by every invalidation
    generation: u64,
    /// Generation of the last `clear`
    cleared_at: u64,
    /// Generation of each key's last invalidation. Only kept while a batch
    /// fill is open.
    invalidated_at: HashMap<EntityId, u64>,
    /// Open batch fills, counted by the generation they started at
    open_fills: BTreeMap<u64, usize>,
}

impl CacheState {
    fn lookup(&mut self, key: EntityId) -> Option<Aggregate> {
        match self.entries.get(&key) {
            Some(value) => {
                let value = *value;
                self.stats.record_hit();
                self.lru.touch(key);
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// True if `key` may be written by a fill that started at `generation`.
    fn fill_allowed(&self, key: EntityId, generation: u64) -> bool {
        self.cleared_at <= generation
            && self
                .invalidated_at
                .get(&key)
                .map_or(true, |invalidated| *invalidated <= generation)
    }

    fn insert(&mut self, key: EntityId, value: Aggregate, capacity: usize) {
        if !self.entries.contains_key(&key) && self.entries.len() >= capacity {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
                debug!(key = evicted, "evicted least-recently-used aggregate");
            }
        }

        self.entries.insert(key, value);
        self.lru.touch(key);
        self.stats.set_total_entries(self.entries.len());
    }
}

// == Bounded Cache ==
/// Thread-safe LRU cache of per-entity aggregates.
///
/// All state transitions happen under one mutex, so size, recency order and
/// content stay consistent under concurrent callers. The lock is never held
/// across an await point.
#[derive(Debug)]
pub struct BoundedCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl BoundedCache {
    // == Constructor ==
    /// Creates a cache holding at most `capacity` aggregates.
    ///
    /// Fails with `CapacityMisconfigured` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(AggregateError::CapacityMisconfigured(capacity));
        }

        Ok(Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Get ==
    /// Returns a copy of the cached aggregate and marks it most recently used.
    pub fn get(&self, key: EntityId) -> Option<Aggregate> {
        self.lock().lookup(key)
    }

    // == Put ==
    /// Inserts or overwrites an aggregate, evicting the least recently used
    /// entry when the cache is full.
    pub fn put(&self, key: EntityId, value: Aggregate) {
        self.lock().insert(key, value, self.capacity);
    }

    // == Remove ==
    /// Invalidates a key. Any read-through fetch already running for it will
    /// not write its result back.
    pub fn remove(&self, key: EntityId) -> Option<Aggregate> {
        let mut state = self.lock();
        state.generation += 1;
        state.in_flight.remove(&key);
        if !state.open_fills.is_empty() {
            let generation = state.generation;
            state.invalidated_at.insert(key, generation);
        }

        let removed = state.entries.remove(&key);
        if removed.is_some() {
            state.lru.remove(key);
            state.stats.record_invalidation();
            let len = state.entries.len();
            state.stats.set_total_entries(len);
        }
        removed
    }

    // == Clear ==
    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.generation += 1;
        let generation = state.generation;
        state.cleared_at = generation;
        state.invalidated_at.clear();
        state.in_flight.clear();
        state.entries.clear();
        state.lru.clear();
        state.stats.set_total_entries(0);
    }

    // == Get Or Compute ==
    /// Read-through lookup with single-flight semantics.
    ///
    /// On a miss the supplier runs once per cold key no matter how many
    /// callers arrive concurrently; every caller receives the same value.
    /// A failed supplier is not cached and its error goes to that caller only.
    /// The in-flight slot is released when the last caller leaves, also when
    /// the fetch fails or the future is dropped.
    pub async fn get_or_compute<F, Fut>(&self, key: EntityId, supplier: F) -> Result<Aggregate>
    where
        F: FnOnce(EntityId) -> Fut,
        Fut: Future<Output = Result<Aggregate>>,
    {
        let flight = {
            let mut state = self.lock();
            if let Some(value) = state.lookup(key) {
                return Ok(value);
            }
            let slot = state
                .in_flight
                .entry(key)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone();
            Flight {
                cache: self,
                key,
                slot,
            }
        };

        let value = *flight.slot.get_or_try_init(|| supplier(key)).await?;
        Ok(value)
    }

    // == Batch Fill ==
    /// Opens a batch fill. Take it before the store round trip and hand it to
    /// [`put_batch`](Self::put_batch) afterwards.
    pub fn begin_fill(&self) -> FillTicket<'_> {
        let mut state = self.lock();
        let generation = state.generation;
        *state.open_fills.entry(generation).or_insert(0) += 1;
        FillTicket {
            cache: self,
            generation,
        }
    }

    /// Stores a batch of aggregates atomically, skipping keys invalidated
    /// since `ticket` was opened. Returns how many were stored.
    pub fn put_batch(
        &self,
        values: &HashMap<EntityId, Aggregate>,
        ticket: &FillTicket<'_>,
    ) -> usize {
        let mut state = self.lock();
        let mut stored = 0;
        for (key, value) in values {
            if state.fill_allowed(*key, ticket.generation) {
                state.insert(*key, *value, self.capacity);
                stored += 1;
            }
        }
        stored
    }

    // == Inspection ==
    /// True if the key is cached. Does not affect recency or stats.
    pub fn contains(&self, key: EntityId) -> bool {
        self.lock().entries.contains_key(&key)
    }

    /// Copies of all entries, most recently used first.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        let state = self.lock();
        state
            .lru
            .most_recent_first()
            .enumerate()
            .filter_map(|(rank, key)| {
                state
                    .entries
                    .get(&key)
                    .map(|value| CacheEntry::new(key, *value, rank))
            })
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.entries.len());
        stats
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

// == Flight ==
/// One caller's hold on an in-flight slot.
///
/// The first holder to leave with a value writes it back, unless the key was
/// invalidated meanwhile. The last holder to leave without a value drops the
/// slot so a later lookup starts over.
struct Flight<'a> {
    cache: &'a BoundedCache,
    key: EntityId,
    slot: FlightSlot,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        let mut state = self.cache.lock();
        let current = state
            .in_flight
            .get(&self.key)
            .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot));
        if !current {
            if self.slot.initialized() {
                debug!(key = self.key, "read-through result not written back, slot released");
            }
            return;
        }

        match self.slot.get() {
            Some(value) => {
                state.in_flight.remove(&self.key);
                state.insert(self.key, *value, self.cache.capacity);
            }
            // Slot held by the map and by this caller only.
            None if Arc::strong_count(&self.slot) <= 2 => {
                state.in_flight.remove(&self.key);
            }
            None => {}
        }
    }
}

// == Fill Ticket ==
/// An open batch fill; see [`BoundedCache::begin_fill`].
#[derive(Debug)]
pub struct FillTicket<'a> {
    cache: &'a BoundedCache,
    generation: u64,
}

impl Drop for FillTicket<'_> {
    fn drop(&mut self) {
        let mut state = self.cache.lock();
        if let Some(count) = state.open_fills.get_mut(&self.generation) {
            *count -= 1;
            if *count == 0 {
                state.open_fills.remove(&self.generation);
            }
        }

        let oldest_open = state.open_fills.keys().next().copied();
        match oldest_open {
            None => state.invalidated_at.clear(),
            Some(oldest) => state
                .invalidated_at
                .retain(|_, invalidated| *invalidated > oldest),
        }
    }
}
