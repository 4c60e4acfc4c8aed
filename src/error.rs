//! Error types for the aggregate cache
//!
//! Provides unified error handling using thiserror.

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::cache::{Aggregate, EntityId};

// == Aggregate Error Enum ==
/// Unified error type for the aggregate cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// The aggregate store could not be reached or timed out
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A key collection was empty where a key is required.
    ///
    /// Batch paths never raise it: resolving the empty set is a no-op that
    /// yields an empty map.
    #[error("Invalid key set: {0}")]
    InvalidKeySet(String),

    /// Cache constructed with a capacity of zero
    #[error("Cache capacity must be greater than zero, got {0}")]
    CapacityMisconfigured(usize),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Entity not found in the row store
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AggregateError {
    /// Returns true when a later retry may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AggregateError::StoreUnavailable(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AggregateError {
    fn into_response(self) -> Response {
        let status = match &self {
            AggregateError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AggregateError::InvalidKeySet(_) => StatusCode::BAD_REQUEST,
            AggregateError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AggregateError::NotFound(_) => StatusCode::NOT_FOUND,
            AggregateError::CapacityMisconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Page Load Error ==
/// A page refresh that could not reach the store.
///
/// `partial` holds the aggregates that were already cached for the page, so the
/// caller can keep showing known values next to a refresh notice.
#[derive(Error, Debug, Clone)]
#[error("Page refresh failed: {source}")]
pub struct PageLoadError {
    /// Cache hits for the requested page
    pub partial: HashMap<EntityId, Aggregate>,
    /// Underlying failure
    #[source]
    pub source: AggregateError,
}

// == Result Type Alias ==
/// Convenience Result type for the aggregate cache.
pub type Result<T> = std::result::Result<T, AggregateError>;
