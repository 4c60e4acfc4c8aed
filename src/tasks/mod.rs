//! Background Tasks Module
//!
//! Timers and workers that run beside the request path.
//!
//! # Tasks
//! - Debounce: coalesces search-as-you-type bursts into one re-query

mod debounce;

pub use debounce::{Debouncer, DEFAULT_WINDOW};
