//! Aggregate Cache - derived-metric caching for paginated list views
//!
//! Keeps per-entity aggregates (e.g. the summed quantity of a purchase's line
//! items) in a bounded LRU cache, resolves cache misses for a page in one
//! batched store call, and debounces search input into a single re-query.

pub mod api;
pub mod batch;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod paginator;
pub mod session;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{Aggregate, BoundedCache, EntityId};
pub use config::Config;
pub use coordinator::CacheCoordinator;
pub use error::{AggregateError, PageLoadError};
pub use session::{ListSession, PageView, SessionEvent};
