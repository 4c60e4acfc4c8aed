//! List Session
//!
//! Presentation-facing surface of the cache: holds the current filtered list,
//! serves pages with their aggregates, debounces search input and delivers
//! background results to a single consumer over a channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{Aggregate, EntityId};
use crate::coordinator::CacheCoordinator;
use crate::error::{AggregateError, Result};
use crate::paginator::{page_count, page_of, Page};
use crate::store::{AggregateStore, EntitySource, SearchFilter};
use crate::tasks::Debouncer;

/// Identifies one background page request. Only the latest is current.
pub type Ticket = u64;

// == Page View ==
/// One page of rows with the aggregates the view shows next to them.
#[derive(Debug, Clone)]
pub struct PageView<E> {
    pub page: Page,
    pub rows: Vec<E>,
    pub aggregates: HashMap<EntityId, Aggregate>,
    /// Rows in the whole filtered list
    pub total: usize,
    /// Set when the store could not be reached; `aggregates` then only holds
    /// values that were already cached.
    pub refresh_error: Option<AggregateError>,
}

impl<E> PageView<E> {
    pub fn is_complete(&self) -> bool {
        self.refresh_error.is_none()
    }
}

// == Session Event ==
/// Results delivered to the session's consumer.
#[derive(Debug, Clone)]
pub enum SessionEvent<E> {
    /// A background page request finished. Check the ticket with
    /// [`ListSession::is_current`] before showing it.
    PageLoaded { ticket: Ticket, view: PageView<E> },
    /// A debounced search replaced the list.
    ResultsChanged { filter: SearchFilter, total: usize },
    /// A debounced search could not reach the entity source.
    SearchFailed { filter: SearchFilter, error: AggregateError },
}

struct SessionInner<S: EntitySource> {
    coordinator: Arc<CacheCoordinator<S>>,
    items: RwLock<Vec<S::Entity>>,
    filter: RwLock<SearchFilter>,
    latest_ticket: AtomicU64,
    events: mpsc::UnboundedSender<SessionEvent<S::Entity>>,
}

impl<S> SessionInner<S>
where
    S: AggregateStore + EntitySource + 'static,
{
    async fn load_page(&self, page_index: usize, page_size: usize) -> PageView<S::Entity> {
        let items = self.items.read().await;
        let rows = page_of(&items, page_index, page_size).to_vec();
        let (aggregates, refresh_error) =
            match self.coordinator.load_page(&items, page_index, page_size).await {
                Ok(aggregates) => (aggregates, None),
                Err(err) => {
                    warn!(page_index, error = %err.source, "showing cached aggregates only");
                    (err.partial, Some(err.source))
                }
            };

        PageView {
            page: Page::new(page_index, page_size),
            rows,
            aggregates,
            total: items.len(),
            refresh_error,
        }
    }

    async fn apply_filter(&self, filter: SearchFilter) -> Result<usize> {
        let found = self.coordinator.store().search(&filter).await?;
        let total = found.len();

        *self.items.write().await = found;
        *self.filter.write().await = filter;
        // Pages requested against the old list are stale now.
        self.latest_ticket.fetch_add(1, Ordering::SeqCst);
        Ok(total)
    }

    async fn run_search(&self, text: String) {
        let mut filter = self.filter.read().await.clone();
        filter.set_text(&text);

        let event = match self.apply_filter(filter.clone()).await {
            Ok(total) => {
                info!(text = %filter.text, total, "search results refreshed");
                SessionEvent::ResultsChanged { filter, total }
            }
            Err(error) => {
                warn!(text = %filter.text, error = %error, "search failed");
                SessionEvent::SearchFailed { filter, error }
            }
        };
        self.deliver(event);
    }

    fn deliver(&self, event: SessionEvent<S::Entity>) {
        if self.events.send(event).is_err() {
            debug!("session consumer gone, event dropped");
        }
    }
}

// == List Session ==
pub struct ListSession<S: EntitySource> {
    inner: Arc<SessionInner<S>>,
    search: Debouncer<String>,
}

impl<S> ListSession<S>
where
    S: AggregateStore + EntitySource + 'static,
{
    /// Creates a session with an empty list; call [`refresh`](Self::refresh)
    /// to load it. Must be called inside a tokio runtime.
    ///
    /// Returns the receiving end of the session's event channel.
    pub fn new(
        coordinator: Arc<CacheCoordinator<S>>,
        debounce_window: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent<S::Entity>>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let inner = Arc::new(SessionInner {
            coordinator,
            items: RwLock::new(Vec::new()),
            filter: RwLock::new(SearchFilter::default()),
            latest_ticket: AtomicU64::new(0),
            events,
        });

        let search = {
            let inner = Arc::clone(&inner);
            Debouncer::new(debounce_window, move |text: String| {
                let inner = Arc::clone(&inner);
                async move { inner.run_search(text).await }
            })
        };

        (Self { inner, search }, receiver)
    }

    // == Refresh ==
    /// Reloads the list with the current filter. Returns the row count.
    pub async fn refresh(&self) -> Result<usize> {
        let filter = self.inner.filter.read().await.clone();
        self.inner.apply_filter(filter).await
    }

    /// Replaces the whole filter and reloads the list immediately.
    pub async fn set_filter(&self, filter: SearchFilter) -> Result<usize> {
        self.search.cancel();
        self.inner.apply_filter(filter).await
    }

    pub async fn filter(&self) -> SearchFilter {
        self.inner.filter.read().await.clone()
    }

    // == Load Page ==
    /// Rows and aggregates of one page. A store outage degrades to cached
    /// values with `refresh_error` set rather than failing.
    pub async fn load_page(&self, page_index: usize, page_size: usize) -> PageView<S::Entity> {
        self.inner.load_page(page_index, page_size).await
    }

    /// Loads a page on a worker task and delivers it as
    /// [`SessionEvent::PageLoaded`]. Supersedes earlier requests.
    pub fn request_page(&self, page_index: usize, page_size: usize) -> Ticket {
        let ticket = self.inner.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let view = inner.load_page(page_index, page_size).await;
            inner.deliver(SessionEvent::PageLoaded { ticket, view });
        });

        ticket
    }

    /// False once a newer page request or a new result list exists.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.inner.latest_ticket.load(Ordering::SeqCst) == ticket
    }

    // == Search ==
    /// Debounced re-query; only the last text of a typing burst is searched.
    pub fn on_search_text_changed(&self, text: &str) {
        self.search.trigger(text.to_string());
    }

    // == Mutations ==
    /// Invalidates the aggregate of an entity whose child records changed.
    pub fn notify_mutated(&self, key: EntityId) {
        self.inner.coordinator.invalidate(key);
    }

    pub async fn page_count(&self, page_size: usize) -> usize {
        page_count(self.inner.items.read().await.len(), page_size)
    }

    pub fn coordinator(&self) -> &Arc<CacheCoordinator<S>> {
        &self.inner.coordinator
    }

    // == Teardown ==
    /// Cancels pending search work and clears the cache.
    pub fn teardown(&self) {
        self.search.cancel();
        self.inner.coordinator.teardown();
    }
}
