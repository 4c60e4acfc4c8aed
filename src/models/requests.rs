//! Request DTOs for the list API
//!
//! Defines the structure of incoming query strings and request bodies.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::cache::Aggregate;
use crate::store::{CreditStatus, NewLineItem, PaymentMethod, SearchFilter, MAX_QUANTITY};

/// Largest page a client may request
pub const MAX_PAGE_SIZE: usize = 200;

/// Query string for `GET /purchases`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    /// Zero-based page index (default 0)
    #[serde(default)]
    pub page: usize,
    /// Rows per page; the configured page size when absent
    #[serde(default)]
    pub size: Option<usize>,
}

impl PageQuery {
    /// Effective page size, or an error message when out of range.
    pub fn page_size(&self, default_size: usize) -> Result<usize, String> {
        match self.size.unwrap_or(default_size) {
            0 => Err("Page size must be greater than zero".to_string()),
            size if size > MAX_PAGE_SIZE => Err(format!(
                "Page size exceeds maximum of {} rows",
                MAX_PAGE_SIZE
            )),
            size => Ok(size),
        }
    }
}

/// Request body for `PUT /search`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub text: String,
}

/// Request body for `PUT /filter`; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    pub supplier_id: Option<i64>,
    pub text: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub credit_status: Option<CreditStatus>,
}

impl FilterRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => {
                Some("Date range start must not be after its end".to_string())
            }
            _ => None,
        }
    }

    pub fn into_filter(self) -> SearchFilter {
        let mut builder = SearchFilter::builder().text(&self.text);
        if let Some(supplier_id) = self.supplier_id {
            builder = builder.supplier_id(supplier_id);
        }
        if let Some(from) = self.from {
            builder = builder.from(from);
        }
        if let Some(to) = self.to {
            builder = builder.to(to);
        }
        if let Some(method) = self.payment_method {
            builder = builder.payment_method(method);
        }
        if let Some(status) = self.credit_status {
            builder = builder.credit_status(status);
        }
        builder.build()
    }
}

/// Request body for `POST /purchases/:id/items`
#[derive(Debug, Clone, Deserialize)]
pub struct AddItemRequest {
    pub quantity: Aggregate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub code: String,
    /// Minor currency units
    #[serde(default)]
    pub unit_price: i64,
}

impl AddItemRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if let Some(error_msg) = validate_quantity(self.quantity) {
            return Some(error_msg);
        }
        if self.unit_price < 0 {
            return Some("Unit price cannot be negative".to_string());
        }
        None
    }

    pub fn into_new_item(self) -> NewLineItem {
        NewLineItem {
            quantity: self.quantity,
            description: self.description,
            code: self.code,
            unit_price: self.unit_price,
        }
    }
}

/// Request body for `PATCH /purchases/:id/items/:item_id`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: Aggregate,
}

impl UpdateItemRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_quantity(self.quantity)
    }
}

fn validate_quantity(quantity: Aggregate) -> Option<String> {
    if quantity <= 0 {
        return Some("Quantity must be greater than zero".to_string());
    }
    if quantity > MAX_QUANTITY {
        return Some(format!("Quantity exceeds maximum of {}", MAX_QUANTITY));
    }
    None
}
