//! Batch Aggregator
//!
//! Resolves the aggregates of many cache-missed keys in one store round trip
//! and writes them back into the cache.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{Aggregate, BoundedCache, EntityId};
use crate::error::{AggregateError, Result};
use crate::store::AggregateStore;

pub struct BatchAggregator<S> {
    store: Arc<S>,
    cache: Arc<BoundedCache>,
    timeout: Duration,
}

impl<S: AggregateStore> BatchAggregator<S> {
    /// `timeout` bounds every store round trip; exceeding it is reported as
    /// `StoreUnavailable`.
    pub fn new(store: Arc<S>, cache: Arc<BoundedCache>, timeout: Duration) -> Self {
        Self {
            store,
            cache,
            timeout,
        }
    }

    // == Resolve ==
    /// Fetches aggregates for `keys` with a single store call.
    ///
    /// Keys the store leaves out of its answer resolve to zero. The empty set
    /// resolves to an empty map without touching the store. On failure the
    /// cache is left as it was. Keys invalidated while the fetch was running
    /// are returned but not cached.
    pub async fn resolve(&self, keys: &BTreeSet<EntityId>) -> Result<HashMap<EntityId, Aggregate>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let ticket = self.cache.begin_fill();
        let fetched = self
            .bounded(self.store.fetch_batch(keys))
            .await
            .inspect_err(|err| warn!(keys = keys.len(), error = %err, "batch aggregate fetch failed"))?;

        let resolved: HashMap<EntityId, Aggregate> = keys
            .iter()
            .map(|key| (*key, fetched.get(key).copied().unwrap_or(0)))
            .collect();

        let stored = self.cache.put_batch(&resolved, &ticket);
        if stored == resolved.len() {
            debug!(keys = stored, "batch aggregates cached");
        } else {
            debug!(
                stored,
                skipped = resolved.len() - stored,
                "batch aggregates invalidated while in flight were not cached"
            );
        }

        Ok(resolved)
    }

    // == Fetch One ==
    /// Single-key store lookup, used as the supplier for read-through misses.
    pub async fn fetch_one(&self, key: EntityId) -> Result<Aggregate> {
        self.bounded(self.store.fetch_one(key))
            .await
            .inspect_err(|err| warn!(key, error = %err, "aggregate fetch failed"))
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AggregateError::StoreUnavailable(format!(
                "store did not answer within {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}
