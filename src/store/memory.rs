//! In-process row store for purchases and line items.
//!
//! Serves as the aggregate collaborator for the demo server and the tests.
//! Exposes an availability switch, an artificial latency and call counters so
//! callers can observe outages and round trips.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{Aggregate, EntityId};
use crate::error::{AggregateError, Result};
use crate::store::{
    AggregateStore, EntitySource, LineItem, NewLineItem, Purchase, SearchFilter, MAX_QUANTITY,
};

#[derive(Debug, Default)]
struct Tables {
    purchases: BTreeMap<EntityId, Purchase>,
    items: BTreeMap<i64, LineItem>,
    next_item_id: i64,
}

/// Rejects quantities outside `1..=MAX_QUANTITY`.
fn check_quantity(quantity: Aggregate) -> Result<()> {
    if quantity <= 0 {
        return Err(AggregateError::InvalidRequest(
            "Quantity must be greater than zero".to_string(),
        ));
    }
    if quantity > MAX_QUANTITY {
        return Err(AggregateError::InvalidRequest(format!(
            "Quantity exceeds maximum of {}",
            MAX_QUANTITY
        )));
    }
    Ok(())
}

/// Adds `quantity` to a running total without overflowing.
fn accumulate(total: &mut Aggregate, quantity: Aggregate, purchase_id: EntityId) -> Result<()> {
    *total = total.checked_add(quantity).ok_or_else(|| {
        AggregateError::InvalidRequest(format!(
            "quantity total of purchase {} overflows",
            purchase_id
        ))
    })?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
    single_calls: AtomicUsize,
    batch_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // == Fault Injection ==
    /// Makes every subsequent call fail with `StoreUnavailable` until re-enabled.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Delays every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    async fn round_trip(&self) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AggregateError::StoreUnavailable(
                "row store is not accepting connections".to_string(),
            ));
        }
        Ok(())
    }

    // == Writes ==
    /// Inserts or replaces a purchase.
    pub async fn insert_purchase(&self, purchase: Purchase) -> Result<()> {
        self.round_trip().await?;
        self.tables
            .write()
            .await
            .purchases
            .insert(purchase.id, purchase);
        Ok(())
    }

    /// Deletes a purchase together with its line items.
    pub async fn remove_purchase(&self, purchase_id: EntityId) -> Result<Purchase> {
        self.round_trip().await?;
        let mut tables = self.tables.write().await;
        let purchase = tables
            .purchases
            .remove(&purchase_id)
            .ok_or_else(|| AggregateError::NotFound(format!("purchase {}", purchase_id)))?;
        tables.items.retain(|_, item| item.purchase_id != purchase_id);
        Ok(purchase)
    }

    pub async fn add_line_item(&self, purchase_id: EntityId, new: NewLineItem) -> Result<LineItem> {
        check_quantity(new.quantity)?;
        self.round_trip().await?;

        let mut tables = self.tables.write().await;
        if !tables.purchases.contains_key(&purchase_id) {
            return Err(AggregateError::NotFound(format!("purchase {}", purchase_id)));
        }

        tables.next_item_id += 1;
        let item = LineItem {
            id: tables.next_item_id,
            purchase_id,
            quantity: new.quantity,
            description: new.description,
            code: new.code,
            unit_price: new.unit_price,
        };
        tables.items.insert(item.id, item.clone());
        debug!(purchase_id, item_id = item.id, "line item added");
        Ok(item)
    }

    pub async fn update_line_item_quantity(
        &self,
        purchase_id: EntityId,
        item_id: i64,
        quantity: Aggregate,
    ) -> Result<LineItem> {
        check_quantity(quantity)?;
        self.round_trip().await?;

        let mut tables = self.tables.write().await;
        let item = tables
            .items
            .get_mut(&item_id)
            .filter(|item| item.purchase_id == purchase_id)
            .ok_or_else(|| {
                AggregateError::NotFound(format!("line item {} of purchase {}", item_id, purchase_id))
            })?;
        item.quantity = quantity;
        Ok(item.clone())
    }

    pub async fn remove_line_item(&self, purchase_id: EntityId, item_id: i64) -> Result<LineItem> {
        self.round_trip().await?;

        let mut tables = self.tables.write().await;
        match tables.items.get(&item_id) {
            Some(item) if item.purchase_id == purchase_id => {}
            _ => {
                return Err(AggregateError::NotFound(format!(
                    "line item {} of purchase {}",
                    item_id, purchase_id
                )))
            }
        }
        tables
            .items
            .remove(&item_id)
            .ok_or_else(|| AggregateError::NotFound(format!("line item {}", item_id)))
    }

    // == Reads ==
    pub async fn line_items(&self, purchase_id: EntityId) -> Result<Vec<LineItem>> {
        self.round_trip().await?;
        Ok(self
            .tables
            .read()
            .await
            .items
            .values()
            .filter(|item| item.purchase_id == purchase_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AggregateStore for MemoryStore {
    async fn fetch_one(&self, key: EntityId) -> Result<Aggregate> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await?;

        let tables = self.tables.read().await;
        let mut total = 0;
        for item in tables.items.values().filter(|item| item.purchase_id == key) {
            accumulate(&mut total, item.quantity, key)?;
        }
        Ok(total)
    }

    async fn fetch_batch(&self, keys: &BTreeSet<EntityId>) -> Result<HashMap<EntityId, Aggregate>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await?;

        // Grouped sum; purchases without items are left out of the result.
        let tables = self.tables.read().await;
        let mut totals = HashMap::new();
        for item in tables.items.values().filter(|item| keys.contains(&item.purchase_id)) {
            let total = totals.entry(item.purchase_id).or_insert(0);
            accumulate(total, item.quantity, item.purchase_id)?;
        }
        Ok(totals)
    }
}

#[async_trait]
impl EntitySource for MemoryStore {
    type Entity = Purchase;

    /// Matching purchases, newest first, then by id.
    async fn search(&self, filter: &SearchFilter) -> Result<Vec<Purchase>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await?;

        let tables = self.tables.read().await;
        let mut purchases: Vec<Purchase> = tables
            .purchases
            .values()
            .filter(|purchase| filter.matches(purchase))
            .cloned()
            .collect();
        purchases.sort_by(|a, b| {
            b.purchased_at
                .cmp(&a.purchased_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(purchases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn purchase(id: EntityId, day: u32) -> Purchase {
        Purchase {
            id,
            supplier_id: 1,
            invoice_number: format!("FV-{}", id),
            category: "insumos".to_string(),
            description: "Compra de prueba".to_string(),
            purchased_at: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            total: 10_000,
            ..Default::default()
        }
    }

    fn item(quantity: Aggregate) -> NewLineItem {
        NewLineItem {
            quantity,
            description: "Item".to_string(),
            code: "X".to_string(),
            unit_price: 100,
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_purchase(purchase(1, 1)).await.unwrap();
        store.insert_purchase(purchase(2, 2)).await.unwrap();
        store.insert_purchase(purchase(3, 2)).await.unwrap();
        store.add_line_item(1, item(2)).await.unwrap();
        store.add_line_item(1, item(3)).await.unwrap();
        store.add_line_item(2, item(7)).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_fetch_batch_omits_entities_without_items() {
        let store = seeded().await;
        let keys = BTreeSet::from([1, 2, 3]);

        let totals = store.fetch_batch(&keys).await.unwrap();

        assert_eq!(totals.get(&1), Some(&5));
        assert_eq!(totals.get(&2), Some(&7));
        assert_eq!(totals.get(&3), None);
        assert_eq!(store.batch_calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_one_sums_quantities() {
        let store = seeded().await;
        assert_eq!(store.fetch_one(1).await.unwrap(), 5);
        assert_eq!(store.fetch_one(3).await.unwrap(), 0);
        assert_eq!(store.single_calls(), 2);
    }

    #[tokio::test]
    async fn test_search_orders_newest_first() {
        let store = seeded().await;
        let ids: Vec<EntityId> = store
            .search(&SearchFilter::default())
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_default_page_slices_search() {
        let store = seeded().await;
        let page = store.page(1, 2).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = seeded().await;
        store.set_available(false);

        let result = store.fetch_batch(&BTreeSet::from([1])).await;
        assert!(matches!(result, Err(AggregateError::StoreUnavailable(_))));

        store.set_available(true);
        assert!(store.fetch_batch(&BTreeSet::from([1])).await.is_ok());
    }

    #[tokio::test]
    async fn test_line_item_writes() {
        let store = seeded().await;

        let added = store.add_line_item(3, item(4)).await.unwrap();
        assert_eq!(store.fetch_one(3).await.unwrap(), 4);

        store.update_line_item_quantity(3, added.id, 9).await.unwrap();
        assert_eq!(store.fetch_one(3).await.unwrap(), 9);

        store.remove_line_item(3, added.id).await.unwrap();
        assert_eq!(store.fetch_one(3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_line_item_must_belong_to_purchase() {
        let store = seeded().await;
        let items = store.line_items(1).await.unwrap();

        let result = store.remove_line_item(2, items[0].id).await;
        assert!(matches!(result, Err(AggregateError::NotFound(_))));

        let result = store.update_line_item_quantity(2, items[0].id, 1).await;
        assert!(matches!(result, Err(AggregateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_quantity_rejected() {
        let store = seeded().await;
        let result = store.add_line_item(1, item(0)).await;
        assert!(matches!(result, Err(AggregateError::InvalidRequest(_))));

        let result = store.add_line_item(1, item(i64::MAX)).await;
        assert!(matches!(result, Err(AggregateError::InvalidRequest(_))));

        let items = store.line_items(1).await.unwrap();
        let result = store
            .update_line_item_quantity(1, items[0].id, MAX_QUANTITY + 1)
            .await;
        assert!(matches!(result, Err(AggregateError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_large_quantities_sum_without_overflow() {
        let store = seeded().await;
        store.add_line_item(3, item(MAX_QUANTITY)).await.unwrap();
        store.add_line_item(3, item(MAX_QUANTITY)).await.unwrap();

        let totals = store.fetch_batch(&BTreeSet::from([3])).await.unwrap();
        assert_eq!(totals.get(&3), Some(&(2 * MAX_QUANTITY)));
        assert_eq!(store.fetch_one(3).await.unwrap(), 2 * MAX_QUANTITY);
    }

    #[test]
    fn test_accumulate_reports_overflow() {
        let mut total = i64::MAX - 1;
        let result = accumulate(&mut total, 2, 9);
        assert!(matches!(result, Err(AggregateError::InvalidRequest(_))));

        let mut total = 5;
        accumulate(&mut total, 2, 9).unwrap();
        assert_eq!(total, 7);
    }

    #[tokio::test]
    async fn test_remove_purchase_cascades() {
        let store = seeded().await;
        store.remove_purchase(1).await.unwrap();

        assert!(store.line_items(1).await.unwrap().is_empty());
        assert!(matches!(
            store.add_line_item(1, item(1)).await,
            Err(AggregateError::NotFound(_))
        ));
    }
}
