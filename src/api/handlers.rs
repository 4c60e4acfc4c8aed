//! API Handlers
//!
//! HTTP request handlers for the purchase list endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::cache::EntityId;
use crate::coordinator::CacheCoordinator;
use crate::error::{AggregateError, Result};
use crate::models::{
    AddItemRequest, FilterRequest, FilterResponse, HealthResponse, ItemResponse,
    LineItemsResponse, PageQuery, PageResponse, PurchaseRemovedResponse, SearchAcceptedResponse,
    SearchRequest, StatsResponse, UpdateItemRequest,
};
use crate::session::ListSession;
use crate::store::MemoryStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// List session backing every endpoint
    pub session: Arc<ListSession<MemoryStore>>,
    /// Page size used when the client does not pass one
    pub page_size: usize,
}

impl AppState {
    pub fn new(session: ListSession<MemoryStore>, page_size: usize) -> Self {
        Self {
            session: Arc::new(session),
            page_size,
        }
    }

    fn coordinator(&self) -> &Arc<CacheCoordinator<MemoryStore>> {
        self.session.coordinator()
    }
}

/// Handler for GET /purchases
///
/// A store outage still answers 200 with the cached quantities and
/// `refresh_failed` set.
pub async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse>> {
    let page_size = query
        .page_size(state.page_size)
        .map_err(AggregateError::InvalidRequest)?;

    let view = state.session.load_page(query.page, page_size).await;
    Ok(Json(PageResponse::from(view)))
}

/// Handler for PUT /search
///
/// Schedules a debounced re-query and returns immediately.
pub async fn search_handler(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> (StatusCode, Json<SearchAcceptedResponse>) {
    state.session.on_search_text_changed(&req.text);
    (
        StatusCode::ACCEPTED,
        Json(SearchAcceptedResponse::new(req.text.trim())),
    )
}

/// Handler for PUT /filter
///
/// Replaces the whole filter and reloads the list before answering.
pub async fn filter_handler(
    State(state): State<AppState>,
    Json(req): Json<FilterRequest>,
) -> Result<Json<FilterResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(AggregateError::InvalidRequest(error_msg));
    }

    let total = state.session.set_filter(req.into_filter()).await?;
    let filter = state.session.filter().await;
    Ok(Json(FilterResponse { filter, total }))
}

/// Handler for DELETE /purchases/:id
///
/// Drops the purchase and its line items, then reloads the list.
pub async fn remove_purchase_handler(
    State(state): State<AppState>,
    Path(purchase_id): Path<EntityId>,
) -> Result<Json<PurchaseRemovedResponse>> {
    let coordinator = state.coordinator();
    let purchase = coordinator
        .commit_mutation(purchase_id, coordinator.store().remove_purchase(purchase_id))
        .await?;

    let total = state.session.refresh().await?;
    Ok(Json(PurchaseRemovedResponse::new(&purchase, total)))
}

/// Handler for GET /purchases/:id/items
pub async fn list_items_handler(
    State(state): State<AppState>,
    Path(purchase_id): Path<EntityId>,
) -> Result<Json<LineItemsResponse>> {
    let items = state.coordinator().store().line_items(purchase_id).await?;
    Ok(Json(LineItemsResponse { purchase_id, items }))
}

/// Handler for POST /purchases/:id/items
pub async fn add_item_handler(
    State(state): State<AppState>,
    Path(purchase_id): Path<EntityId>,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>)> {
    if let Some(error_msg) = req.validate() {
        return Err(AggregateError::InvalidRequest(error_msg));
    }

    let coordinator = state.coordinator();
    let item = coordinator
        .commit_mutation(
            purchase_id,
            coordinator
                .store()
                .add_line_item(purchase_id, req.into_new_item()),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ItemResponse::new("added", item))))
}

/// Handler for PATCH /purchases/:id/items/:item_id
pub async fn update_item_handler(
    State(state): State<AppState>,
    Path((purchase_id, item_id)): Path<(EntityId, i64)>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(AggregateError::InvalidRequest(error_msg));
    }

    let coordinator = state.coordinator();
    let item = coordinator
        .commit_mutation(
            purchase_id,
            coordinator
                .store()
                .update_line_item_quantity(purchase_id, item_id, req.quantity),
        )
        .await?;

    Ok(Json(ItemResponse::new("updated", item)))
}

/// Handler for DELETE /purchases/:id/items/:item_id
pub async fn remove_item_handler(
    State(state): State<AppState>,
    Path((purchase_id, item_id)): Path<(EntityId, i64)>,
) -> Result<Json<ItemResponse>> {
    let coordinator = state.coordinator();
    let item = coordinator
        .commit_mutation(
            purchase_id,
            coordinator.store().remove_line_item(purchase_id, item_id),
        )
        .await?;

    Ok(Json(ItemResponse::new("removed", item)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.coordinator().cache();
    Json(StatsResponse::new(&cache.stats(), cache.capacity()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BoundedCache;
    use crate::store::{PaymentMethod, Purchase};
    use chrono::NaiveDate;
    use std::time::Duration;

    async fn test_state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_purchase(Purchase {
                id: 1,
                supplier_id: 1,
                invoice_number: "FV-1".to_string(),
                category: "insumos".to_string(),
                description: "Cajas".to_string(),
                purchased_at: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
                total: 0,
                ..Default::default()
            })
            .await
            .unwrap();

        let cache = Arc::new(BoundedCache::new(10).unwrap());
        let coordinator = Arc::new(CacheCoordinator::new(store, cache, Duration::from_secs(1)));
        let (session, _events) = ListSession::new(coordinator, Duration::from_millis(20));
        session.refresh().await.unwrap();
        AppState::new(session, 10)
    }

    #[tokio::test]
    async fn test_list_handler_reports_zero_quantity() {
        let state = test_state().await;

        let Json(resp) = list_handler(State(state), Query(PageQuery::default()))
            .await
            .unwrap();

        assert_eq!(resp.rows.len(), 1);
        assert_eq!(resp.rows[0].quantity, Some(0));
    }

    #[tokio::test]
    async fn test_list_handler_rejects_zero_size() {
        let state = test_state().await;
        let query = PageQuery {
            page: 0,
            size: Some(0),
        };

        let result = list_handler(State(state), Query(query)).await;
        assert!(matches!(result, Err(AggregateError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_add_item_invalidates_cached_quantity() {
        let state = test_state().await;
        let Json(before) = list_handler(State(state.clone()), Query(PageQuery::default()))
            .await
            .unwrap();
        assert_eq!(before.rows[0].quantity, Some(0));
        assert!(state.coordinator().cache().contains(1));

        let req = AddItemRequest {
            quantity: 6,
            description: String::new(),
            code: String::new(),
            unit_price: 0,
        };
        let (status, _) = add_item_handler(State(state.clone()), Path(1), Json(req))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert!(!state.coordinator().cache().contains(1));

        let Json(resp) = list_handler(State(state), Query(PageQuery::default()))
            .await
            .unwrap();
        assert_eq!(resp.rows[0].quantity, Some(6));
    }

    #[tokio::test]
    async fn test_add_item_unknown_purchase() {
        let state = test_state().await;
        let req = AddItemRequest {
            quantity: 1,
            description: String::new(),
            code: String::new(),
            unit_price: 0,
        };

        let result = add_item_handler(State(state), Path(99), Json(req)).await;
        assert!(matches!(result, Err(AggregateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_item_rejects_oversized_quantity() {
        let state = test_state().await;
        let req = UpdateItemRequest {
            quantity: i64::MAX,
        };

        let result = update_item_handler(State(state), Path((1, 1)), Json(req)).await;
        assert!(matches!(result, Err(AggregateError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_filter_handler_applies_payment_method() {
        let state = test_state().await;
        let req = FilterRequest {
            payment_method: Some(PaymentMethod::Credit),
            ..Default::default()
        };

        let Json(resp) = filter_handler(State(state.clone()), Json(req)).await.unwrap();

        assert_eq!(resp.total, 0);
        assert_eq!(state.session.page_count(10).await, 1);
    }

    #[tokio::test]
    async fn test_remove_purchase_handler() {
        let state = test_state().await;

        let Json(resp) = remove_purchase_handler(State(state.clone()), Path(1))
            .await
            .unwrap();
        assert_eq!(resp.id, 1);
        assert_eq!(resp.total, 0);

        let result = remove_purchase_handler(State(state), Path(1)).await;
        assert!(matches!(result, Err(AggregateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state().await;

        let Json(resp) = stats_handler(State(state)).await;
        assert_eq!(resp.hits, 0);
        assert_eq!(resp.capacity, 10);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let Json(resp) = health_handler().await;
        assert_eq!(resp.status, "healthy");
    }
}
