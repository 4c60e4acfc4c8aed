//! API Routes
//!
//! Configures the Axum router with all list endpoints.

use axum::{
    routing::{delete, get, patch, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    add_item_handler, filter_handler, health_handler, list_handler, list_items_handler,
    remove_item_handler, remove_purchase_handler, search_handler, stats_handler,
    update_item_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /purchases?page=&size=` - One page of purchases with quantities
/// - `PUT /search` - Debounced search-as-you-type
/// - `PUT /filter` - Replace the whole filter immediately
/// - `DELETE /purchases/:id` - Remove a purchase and its line items
/// - `GET /purchases/:id/items` - Line items of a purchase
/// - `POST /purchases/:id/items` - Add a line item
/// - `PATCH /purchases/:id/items/:item_id` - Change a line item's quantity
/// - `DELETE /purchases/:id/items/:item_id` - Remove a line item
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/purchases", get(list_handler))
        .route("/search", put(search_handler))
        .route("/filter", put(filter_handler))
        .route("/purchases/:id", delete(remove_purchase_handler))
        .route(
            "/purchases/:id/items",
            get(list_items_handler).post(add_item_handler),
        )
        .route(
            "/purchases/:id/items/:item_id",
            patch(update_item_handler).delete(remove_item_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
