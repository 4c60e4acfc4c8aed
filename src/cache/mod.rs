//! Cache Module
//!
//! Provides a bounded, thread-safe cache of per-entity aggregates with LRU
//! eviction and single-flight read-through.

mod bounded;
mod entry;
mod lru;
mod stats;


// Re-export public types
pub use bounded::{BoundedCache, FillTicket};
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::CacheStats;

// == Public Types ==
/// Identifier of the parent entity an aggregate belongs to
pub type EntityId = i64;

/// Derived numeric value, e.g. the summed quantity of a purchase's line items
pub type Aggregate = i64;
