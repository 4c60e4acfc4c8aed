//! Response DTOs for the list API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::NaiveDate;
use serde::Serialize;

use crate::cache::{Aggregate, CacheStats, EntityId};
use crate::paginator::page_count;
use crate::session::PageView;
use crate::store::{LineItem, PaymentMethod, Purchase, SearchFilter};

/// One row of the purchase list.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRow {
    pub id: EntityId,
    pub invoice_number: String,
    pub category: String,
    pub description: String,
    pub purchased_at: NaiveDate,
    pub total: i64,
    pub payment_method: PaymentMethod,
    /// Summed line-item quantity; null when it could not be determined
    pub quantity: Option<Aggregate>,
}

/// Response body for `GET /purchases`
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    pub page: usize,
    pub size: usize,
    /// Rows in the whole filtered list
    pub total: usize,
    pub pages: usize,
    pub rows: Vec<PurchaseRow>,
    /// True when quantities come from the cache only
    pub refresh_failed: bool,
    /// Non-blocking notice for the view when the refresh failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl From<PageView<Purchase>> for PageResponse {
    fn from(view: PageView<Purchase>) -> Self {
        let rows = view
            .rows
            .into_iter()
            .map(|purchase| PurchaseRow {
                quantity: view.aggregates.get(&purchase.id).copied(),
                id: purchase.id,
                invoice_number: purchase.invoice_number,
                category: purchase.category,
                description: purchase.description,
                purchased_at: purchase.purchased_at,
                total: purchase.total,
                payment_method: purchase.payment_method,
            })
            .collect();

        Self {
            page: view.page.index,
            size: view.page.size,
            total: view.total,
            pages: page_count(view.total, view.page.size),
            rows,
            refresh_failed: view.refresh_error.is_some(),
            notice: view
                .refresh_error
                .map(|err| format!("Showing last known quantities: {}", err)),
        }
    }
}

/// Response body for `PUT /search`
#[derive(Debug, Clone, Serialize)]
pub struct SearchAcceptedResponse {
    pub message: String,
    pub text: String,
}

impl SearchAcceptedResponse {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            message: format!("Search for '{}' scheduled", text),
            text,
        }
    }
}

/// Response body for `PUT /filter`
#[derive(Debug, Clone, Serialize)]
pub struct FilterResponse {
    pub filter: SearchFilter,
    /// Rows matching the new filter
    pub total: usize,
}

/// Response body for line-item writes
#[derive(Debug, Clone, Serialize)]
pub struct ItemResponse {
    pub message: String,
    pub purchase_id: EntityId,
    /// Null when quantity times unit price overflows
    pub subtotal: Option<i64>,
    pub item: LineItem,
}

impl ItemResponse {
    pub fn new(action: &str, item: LineItem) -> Self {
        Self {
            message: format!("Line item {} {}", item.id, action),
            purchase_id: item.purchase_id,
            subtotal: item.subtotal(),
            item,
        }
    }
}

/// Response body for `GET /purchases/:id/items`
#[derive(Debug, Clone, Serialize)]
pub struct LineItemsResponse {
    pub purchase_id: EntityId,
    pub items: Vec<LineItem>,
}

/// Response body for `DELETE /purchases/:id`
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRemovedResponse {
    pub message: String,
    pub id: EntityId,
    /// Rows left in the current list
    pub total: usize,
}

impl PurchaseRemovedResponse {
    pub fn new(purchase: &Purchase, total: usize) -> Self {
        Self {
            message: format!("Purchase {} removed", purchase.invoice_number),
            id: purchase.id,
            total,
        }
    }
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
    pub total_entries: usize,
    pub capacity: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(stats: &CacheStats, capacity: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            invalidations: stats.invalidations,
            total_entries: stats.total_entries,
            capacity,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
