//! Store Module
//!
//! Collaborator contracts the cache consumes, the row model behind them and an
//! in-process implementation.

mod filter;
mod memory;
mod model;
mod traits;

pub use filter::{SearchFilter, SearchFilterBuilder};
pub use memory::MemoryStore;
pub use model::{CreditStatus, LineItem, NewLineItem, PaymentMethod, Purchase, MAX_QUANTITY};
pub use traits::{AggregateStore, EntitySource};
