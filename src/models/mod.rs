//! Request and Response models for the list API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    AddItemRequest, FilterRequest, PageQuery, SearchRequest, UpdateItemRequest, MAX_PAGE_SIZE,
};
pub use responses::{
    FilterResponse, HealthResponse, ItemResponse, LineItemsResponse, PageResponse,
    PurchaseRemovedResponse, PurchaseRow, SearchAcceptedResponse, StatsResponse,
};
