//! API Module
//!
//! HTTP handlers and routing for the purchase list REST API.
//!
//! # Endpoints
//! - `GET /purchases` - Paginated purchases with cached quantities
//! - `PUT /search` - Debounced search
//! - `PUT /filter` - Supplier, payment and date filter
//! - `DELETE /purchases/:id` - Remove a purchase
//! - `GET /purchases/:id/items` - List a purchase's line items
//! - `POST /purchases/:id/items` - Add a line item
//! - `PATCH /purchases/:id/items/:item_id` - Update a line item
//! - `DELETE /purchases/:id/items/:item_id` - Remove a line item
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
