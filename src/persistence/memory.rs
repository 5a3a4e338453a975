//! In-process [`OrderStore`], used for dry runs and tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::domain::entities::order::{OrderRecord, PricedOrder, UpsertOutcome};
use crate::domain::repositories::order_store::{OrderStore, StoreResult};

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<BTreeMap<i64, OrderRecord>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_record(order: &PricedOrder, session_tag: Option<&str>) -> OrderRecord {
    let now = Utc::now();
    OrderRecord {
        id: order.id,
        latitude: order.coordinates.latitude,
        longitude: order.coordinates.longitude,
        subtotal: order.breakdown.subtotal,
        timestamp: order.timestamp.clone(),
        jurisdiction_name: order.jurisdiction.name.clone(),
        state_rate: order.jurisdiction.state_rate,
        county_rate: order.jurisdiction.county_rate,
        city_rate: order.jurisdiction.city_rate,
        special_rate: order.jurisdiction.special_rate,
        composite_rate: order.breakdown.composite_rate,
        tax_amount: order.breakdown.tax_amount,
        total_amount: order.breakdown.total_amount,
        jurisdictions: order.jurisdiction.jurisdictions.clone(),
        import_session: session_tag.map(str::to_string),
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn exists(&self, id: i64) -> StoreResult<bool> {
        Ok(self.orders.lock().await.contains_key(&id))
    }

    async fn upsert(
        &self,
        order: &PricedOrder,
        session_tag: Option<&str>,
    ) -> StoreResult<UpsertOutcome> {
        let mut orders = self.orders.lock().await;
        let mut record = to_record(order, session_tag);
        match orders.get(&order.id) {
            Some(existing) => {
                record.import_session = existing.import_session.clone();
                record.created_at = existing.created_at;
                orders.insert(order.id, record);
                Ok(UpsertOutcome::Updated)
            }
            None => {
                orders.insert(order.id, record);
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn delete_by_session(&self, session_tag: &str) -> StoreResult<u64> {
        let mut orders = self.orders.lock().await;
        let before = orders.len();
        orders.retain(|_, record| record.import_session.as_deref() != Some(session_tag));
        Ok((before - orders.len()) as u64)
    }

    async fn get(&self, id: i64) -> StoreResult<Option<OrderRecord>> {
        Ok(self.orders.lock().await.get(&id).cloned())
    }

    async fn list(&self, limit: u32, offset: u32) -> StoreResult<Vec<OrderRecord>> {
        Ok(self
            .orders
            .lock()
            .await
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.orders.lock().await.len() as i64)
    }
}
