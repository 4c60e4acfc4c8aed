//! Aggregate Cache - demo list server
//!
//! Serves a paginated purchase list whose per-purchase quantities come from
//! the bounded aggregate cache, backed by an in-process row store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration as ChronoDuration, NaiveDate};
use tokio::signal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aggregate_cache::api::create_router;
use aggregate_cache::store::{CreditStatus, MemoryStore, NewLineItem, PaymentMethod, Purchase};
use aggregate_cache::{AppState, CacheCoordinator, Config, ListSession, SessionEvent};

/// Main entry point for the demo server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Seed the in-process row store
/// 4. Build cache, coordinator and list session
/// 5. Start the session event consumer
/// 6. Serve HTTP until SIGINT/SIGTERM, then clear the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aggregate_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting aggregate cache demo server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_capacity={}, page_size={}, debounce={}ms, store_timeout={}ms, port={}",
        config.cache_capacity,
        config.page_size,
        config.debounce_ms,
        config.store_timeout_ms,
        config.server_port
    );

    let store = Arc::new(MemoryStore::new());
    seed_demo_store(&store)
        .await
        .context("failed to seed demo store")?;

    let coordinator = Arc::new(
        CacheCoordinator::from_config(Arc::clone(&store), &config)
            .context("invalid cache configuration")?,
    );
    let (session, events) = ListSession::new(coordinator, config.debounce_window());
    let rows = session.refresh().await.context("initial list load failed")?;
    info!("Purchase list loaded with {} rows", rows);

    let consumer = tokio::spawn(consume_events(events));

    let state = AppState::new(session, config.page_size);
    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    state.session.teardown();
    consumer.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Single consumer of background session results.
async fn consume_events(mut events: UnboundedReceiver<SessionEvent<Purchase>>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::ResultsChanged { filter, total } => {
                info!(text = %filter.text, total, "search results ready");
            }
            SessionEvent::SearchFailed { filter, error } => {
                warn!(text = %filter.text, error = %error, "search could not run");
            }
            SessionEvent::PageLoaded { ticket, view } => {
                debug!(ticket, rows = view.rows.len(), "page delivered");
            }
        }
    }
}

async fn seed_demo_store(store: &MemoryStore) -> aggregate_cache::error::Result<()> {
    let categories = ["insumos", "ferreteria", "papeleria", "aseo"];
    let products = ["tornillos", "guantes", "resmas", "jabon", "cinta", "brochas"];
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();

    for id in 1..=60_i64 {
        let index = id as usize;
        let (payment_method, credit_status) = match id % 3 {
            0 => (PaymentMethod::Cash, None),
            1 => (PaymentMethod::Transfer, None),
            _ if id % 4 == 0 => (PaymentMethod::Credit, Some(CreditStatus::Paid)),
            _ => (PaymentMethod::Credit, Some(CreditStatus::Pending)),
        };
        store
            .insert_purchase(Purchase {
                id,
                supplier_id: id % 5 + 1,
                invoice_number: format!("FV-{:04}", id),
                category: categories[index % categories.len()].to_string(),
                description: format!("Compra de {}", products[index % products.len()]),
                purchased_at: start + ChronoDuration::days(id * 3),
                total: id * 12_500,
                payment_method,
                credit_status,
            })
            .await?;

        // Every seventh purchase has no line items and aggregates to zero.
        if id % 7 == 0 {
            continue;
        }
        for line in 0..(id % 4 + 1) {
            store
                .add_line_item(
                    id,
                    NewLineItem {
                        quantity: (id + line) % 9 + 1,
                        description: products[(index + line as usize) % products.len()]
                            .to_string(),
                        code: format!("P-{}-{}", id, line),
                        unit_price: 2_500,
                    },
                )
                .await?;
        }
    }
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
