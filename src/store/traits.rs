use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;

use crate::cache::{Aggregate, EntityId};
use crate::error::Result;
use crate::paginator::{page_of, Keyed};
use crate::store::SearchFilter;

/// Row store that computes aggregates from child records.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Aggregate for a single entity. Zero when it has no child records.
    async fn fetch_one(&self, key: EntityId) -> Result<Aggregate>;

    /// Aggregates for many entities in one round trip.
    ///
    /// Entities without child records may be absent from the result;
    /// callers treat an absent key as zero.
    async fn fetch_batch(&self, keys: &BTreeSet<EntityId>) -> Result<HashMap<EntityId, Aggregate>>;
}

/// Source of the ordered entity list shown in the paginated view.
#[async_trait]
pub trait EntitySource: Send + Sync {
    type Entity: Keyed + Clone + Send + Sync + 'static;

    /// All entities matching `filter`, in display order.
    async fn search(&self, filter: &SearchFilter) -> Result<Vec<Self::Entity>>;

    /// One page of the unfiltered list.
    async fn page(&self, index: usize, size: usize) -> Result<Vec<Self::Entity>> {
        let items = self.search(&SearchFilter::default()).await?;
        Ok(page_of(&items, index, size).to_vec())
    }
}
