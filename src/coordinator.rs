//! Cache Coordinator
//!
//! Composition root tying the paginator, the batch aggregator and the bounded
//! cache together, and the single entry point for write-path invalidation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::batch::BatchAggregator;
use crate::cache::{Aggregate, BoundedCache, CacheStats, EntityId};
use crate::config::Config;
use crate::error::{PageLoadError, Result};
use crate::paginator::{keys_for, page_of, Keyed};
use crate::store::AggregateStore;

pub struct CacheCoordinator<S> {
    cache: Arc<BoundedCache>,
    aggregator: BatchAggregator<S>,
}

impl<S: AggregateStore> CacheCoordinator<S> {
    pub fn new(store: Arc<S>, cache: Arc<BoundedCache>, store_timeout: Duration) -> Self {
        let aggregator = BatchAggregator::new(store, Arc::clone(&cache), store_timeout);
        Self { cache, aggregator }
    }

    /// Builds the cache from configuration. Fails fast on a zero capacity.
    pub fn from_config(store: Arc<S>, config: &Config) -> Result<Self> {
        let cache = Arc::new(BoundedCache::new(config.cache_capacity)?);
        Ok(Self::new(store, cache, config.store_timeout()))
    }

    // == Load Page ==
    /// Aggregates for every row of page `page_index`.
    ///
    /// Cached keys are served directly; the rest are resolved in one store
    /// round trip. A page past the end yields an empty map. When the store
    /// fails the error carries the cache hits for the page.
    pub async fn load_page<T: Keyed>(
        &self,
        items: &[T],
        page_index: usize,
        page_size: usize,
    ) -> std::result::Result<HashMap<EntityId, Aggregate>, PageLoadError> {
        let keys = keys_for(page_of(items, page_index, page_size));

        let mut aggregates = HashMap::with_capacity(keys.len());
        let mut misses = keys;
        misses.retain(|key| match self.cache.get(*key) {
            Some(value) => {
                aggregates.insert(*key, value);
                false
            }
            None => true,
        });

        debug!(
            page_index,
            hits = aggregates.len(),
            misses = misses.len(),
            "page keys partitioned"
        );

        if misses.is_empty() {
            return Ok(aggregates);
        }

        match self.aggregator.resolve(&misses).await {
            Ok(resolved) => {
                aggregates.extend(resolved);
                Ok(aggregates)
            }
            Err(source) => Err(PageLoadError {
                partial: aggregates,
                source,
            }),
        }
    }

    // == Aggregate For ==
    /// Single-key read-through; concurrent cold lookups share one fetch.
    pub async fn aggregate_for(&self, key: EntityId) -> Result<Aggregate> {
        self.cache
            .get_or_compute(key, |key| self.aggregator.fetch_one(key))
            .await
    }

    // == Invalidate ==
    /// Drops the cached aggregate of `key`. Call before acknowledging a write
    /// that changed the entity's child records.
    pub fn invalidate(&self, key: EntityId) {
        if self.cache.remove(key).is_some() {
            debug!(key, "aggregate invalidated");
        }
    }

    /// Runs `write`, then invalidates `key` before handing back its outcome.
    ///
    /// Invalidation happens even when the write fails, since a failed write
    /// may still have changed some child records.
    pub async fn commit_mutation<R, F>(&self, key: EntityId, write: F) -> Result<R>
    where
        F: Future<Output = Result<R>>,
    {
        let outcome = write.await;
        self.invalidate(key);
        outcome
    }

    // == Teardown ==
    /// Empties the cache at the end of a session.
    pub fn teardown(&self) {
        info!(entries = self.cache.len(), "clearing aggregate cache");
        self.cache.clear();
    }

    pub fn cache(&self) -> &Arc<BoundedCache> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<S> {
        self.aggregator.store()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AggregateError;
    use crate::store::{MemoryStore, NewLineItem, Purchase};
    use chrono::NaiveDate;

    fn purchase(id: EntityId) -> Purchase {
        Purchase {
            id,
            supplier_id: 1,
            invoice_number: format!("FV-{}", id),
            category: "insumos".to_string(),
            description: String::new(),
            purchased_at: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            total: 0,
            ..Default::default()
        }
    }

    fn qty(quantity: Aggregate) -> NewLineItem {
        NewLineItem {
            quantity,
            description: String::new(),
            code: String::new(),
            unit_price: 0,
        }
    }

    async fn setup(capacity: usize) -> (CacheCoordinator<MemoryStore>, Vec<Purchase>) {
        let store = Arc::new(MemoryStore::new());
        let mut items = Vec::new();
        for id in 1..=6 {
            store.insert_purchase(purchase(id)).await.unwrap();
            store.add_line_item(id, qty(id)).await.unwrap();
            items.push(purchase(id));
        }
        let cache = Arc::new(BoundedCache::new(capacity).unwrap());
        (
            CacheCoordinator::new(store, cache, Duration::from_secs(2)),
            items,
        )
    }

    #[tokio::test]
    async fn test_load_page_resolves_misses_in_one_call() {
        let (coordinator, items) = setup(100).await;

        let page = coordinator.load_page(&items, 0, 4).await.unwrap();

        assert_eq!(page, HashMap::from([(1, 1), (2, 2), (3, 3), (4, 4)]));
        assert_eq!(coordinator.store().batch_calls(), 1);
        assert_eq!(coordinator.cache().len(), 4);
    }

    #[tokio::test]
    async fn test_load_page_all_hits_skips_store() {
        let (coordinator, items) = setup(100).await;

        coordinator.load_page(&items, 0, 4).await.unwrap();
        let page = coordinator.load_page(&items, 0, 4).await.unwrap();

        assert_eq!(page.len(), 4);
        assert_eq!(coordinator.store().batch_calls(), 1);
    }

    #[tokio::test]
    async fn test_load_page_fetches_only_misses() {
        let (coordinator, items) = setup(100).await;
        coordinator.cache().put(1, 1);
        coordinator.cache().put(2, 2);

        let page = coordinator.load_page(&items, 0, 3).await.unwrap();

        assert_eq!(page.len(), 3);
        assert_eq!(page.get(&3), Some(&3));
        assert_eq!(coordinator.stats().hits, 2);
    }

    #[tokio::test]
    async fn test_load_page_past_end_is_empty() {
        let (coordinator, items) = setup(100).await;

        let page = coordinator.load_page(&items, 10, 4).await.unwrap();

        assert!(page.is_empty());
        assert_eq!(coordinator.store().batch_calls(), 0);
    }

    #[tokio::test]
    async fn test_load_page_failure_returns_hits() {
        let (coordinator, items) = setup(100).await;
        coordinator.cache().put(1, 1);
        coordinator.store().set_available(false);

        let err = coordinator.load_page(&items, 0, 3).await.unwrap_err();

        assert!(matches!(err.source, AggregateError::StoreUnavailable(_)));
        assert_eq!(err.partial, HashMap::from([(1, 1)]));
        assert_eq!(coordinator.cache().get(1), Some(1));
    }

    #[tokio::test]
    async fn test_page_larger_than_capacity_still_complete() {
        let (coordinator, items) = setup(2).await;

        let page = coordinator.load_page(&items, 0, 6).await.unwrap();

        assert_eq!(page.len(), 6);
        assert_eq!(coordinator.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_commit_mutation_invalidates_before_returning() {
        let (coordinator, items) = setup(100).await;
        coordinator.load_page(&items, 0, 2).await.unwrap();
        assert_eq!(coordinator.cache().get(1), Some(1));

        let store = Arc::clone(coordinator.store());
        coordinator
            .commit_mutation(1, store.add_line_item(1, qty(10)))
            .await
            .unwrap();

        assert_eq!(coordinator.cache().get(1), None);
        let page = coordinator.load_page(&items, 0, 2).await.unwrap();
        assert_eq!(page.get(&1), Some(&11));
    }

    #[tokio::test]
    async fn test_commit_mutation_failure_still_invalidates() {
        let (coordinator, _) = setup(100).await;
        coordinator.cache().put(1, 1);

        let result: Result<()> = coordinator
            .commit_mutation(1, async {
                Err(AggregateError::StoreUnavailable("write lost".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert!(!coordinator.cache().contains(1));
    }

    #[tokio::test]
    async fn test_aggregate_for_uses_single_fetch() {
        let (coordinator, _) = setup(100).await;

        assert_eq!(coordinator.aggregate_for(5).await.unwrap(), 5);
        assert_eq!(coordinator.aggregate_for(5).await.unwrap(), 5);
        assert_eq!(coordinator.store().single_calls(), 1);
    }

    #[tokio::test]
    async fn test_teardown_clears_cache() {
        let (coordinator, items) = setup(100).await;
        coordinator.load_page(&items, 0, 4).await.unwrap();

        coordinator.teardown();

        assert!(coordinator.cache().is_empty());
    }

    #[test]
    fn test_from_config_rejects_zero_capacity() {
        let config = Config {
            cache_capacity: 0,
            ..Config::default()
        };
        let result = CacheCoordinator::from_config(Arc::new(MemoryStore::new()), &config);
        assert!(matches!(
            result,
            Err(AggregateError::CapacityMisconfigured(0))
        ));
    }
}
