//! Database Repository
//!
//! SQLite-backed [`OrderStore`].

use super::models::OrderRow;
use super::DbPool;
use crate::domain::entities::order::{OrderRecord, PricedOrder, UpsertOutcome};
use crate::domain::repositories::order_store::{OrderStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

fn query_error(context: &str, e: sqlx::Error) -> StoreError {
    error!("{}: {}", context, e);
    StoreError::Query(format!("{}: {}", context, e))
}

/// Order repository
///
/// Clones share the pool and the write lock, so every write issued through
/// any clone is serialized.
#[derive(Clone)]
pub struct OrderRepository {
    pool: DbPool,
    write_lock: Arc<Mutex<()>>,
}

impl OrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn exists(&self, id: i64) -> StoreResult<bool> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_error("Failed to check order existence", e))?;

        Ok(row.0 > 0)
    }

    async fn upsert(
        &self,
        order: &PricedOrder,
        session_tag: Option<&str>,
    ) -> StoreResult<UpsertOutcome> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now();
        let jurisdictions = serde_json::to_string(&order.jurisdiction.jurisdictions)
            .map_err(|e| StoreError::Query(format!("Failed to encode jurisdictions: {}", e)))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| query_error("Failed to begin transaction", e))?;

        let existing: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE id = ?1")
            .bind(order.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| query_error("Failed to check order existence", e))?;

        // Updates never touch import_session or created_at.
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, latitude, longitude, subtotal, timestamp, jurisdiction_name,
                state_rate, county_rate, city_rate, special_rate, composite_rate,
                tax_amount, total_amount, jurisdictions, import_session,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
            ON CONFLICT(id) DO UPDATE SET
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                subtotal = excluded.subtotal,
                timestamp = excluded.timestamp,
                jurisdiction_name = excluded.jurisdiction_name,
                state_rate = excluded.state_rate,
                county_rate = excluded.county_rate,
                city_rate = excluded.city_rate,
                special_rate = excluded.special_rate,
                composite_rate = excluded.composite_rate,
                tax_amount = excluded.tax_amount,
                total_amount = excluded.total_amount,
                jurisdictions = excluded.jurisdictions,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(order.id)
        .bind(order.coordinates.latitude)
        .bind(order.coordinates.longitude)
        .bind(order.breakdown.subtotal)
        .bind(&order.timestamp)
        .bind(&order.jurisdiction.name)
        .bind(order.jurisdiction.state_rate)
        .bind(order.jurisdiction.county_rate)
        .bind(order.jurisdiction.city_rate)
        .bind(order.jurisdiction.special_rate)
        .bind(order.breakdown.composite_rate)
        .bind(order.breakdown.tax_amount)
        .bind(order.breakdown.total_amount)
        .bind(jurisdictions)
        .bind(session_tag)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| query_error("Failed to upsert order", e))?;

        tx.commit()
            .await
            .map_err(|e| query_error("Failed to commit order", e))?;

        let outcome = if existing.0 > 0 {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        };
        debug!("Upserted order {} ({:?})", order.id, outcome);
        Ok(outcome)
    }

    async fn delete_by_session(&self, session_tag: &str) -> StoreResult<u64> {
        let _guard = self.write_lock.lock().await;

        let rows_affected = sqlx::query("DELETE FROM orders WHERE import_session = ?1")
            .bind(session_tag)
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("Failed to delete session orders", e))?
            .rows_affected();

        debug!(
            "Deleted {} orders tagged with session {}",
            rows_affected, session_tag
        );
        Ok(rows_affected)
    }

    async fn get(&self, id: i64) -> StoreResult<Option<OrderRecord>> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("Failed to get order", e))?;

        row.map(OrderRecord::try_from).transpose()
    }

    async fn list(&self, limit: u32, offset: u32) -> StoreResult<Vec<OrderRecord>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders ORDER BY updated_at DESC, id ASC LIMIT ?1 OFFSET ?2",
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_error("Failed to list orders", e))?;

        rows.into_iter().map(OrderRecord::try_from).collect()
    }

    async fn count(&self) -> StoreResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_error("Failed to count orders", e))?;

        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::jurisdiction::{JurisdictionRate, RateComponents, RateSource};
    use crate::domain::entities::order::TaxBreakdown;
    use crate::domain::value_objects::coordinates::Coordinates;
    use crate::domain::value_objects::money::round2;
    use crate::persistence::init_database_at;

    fn order(id: i64, subtotal: f64) -> PricedOrder {
        PricedOrder {
            id,
            coordinates: Coordinates::new(40.7128, -74.006),
            timestamp: "2025-11-04T10:17:04.915Z".to_string(),
            jurisdiction: JurisdictionRate::new(
                "Manhattan",
                RateComponents::new(0.04, 0.0, 0.045, 0.00375),
                vec!["New York State".to_string(), "New York City".to_string()],
                RateSource::BoundingBox,
            ),
            breakdown: TaxBreakdown {
                subtotal,
                composite_rate: 0.08875,
                tax_amount: 10.65,
                total_amount: round2(subtotal + 10.65),
            },
        }
    }

    async fn repository() -> OrderRepository {
        OrderRepository::new(init_database_at("sqlite::memory:").await.unwrap())
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let repo = repository().await;
        let outcome = repo.upsert(&order(1, 120.0), Some("s-1")).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert!(repo.exists(1).await.unwrap());

        let record = repo.get(1).await.unwrap().unwrap();
        assert_eq!(record.jurisdiction_name, "Manhattan");
        assert_eq!(record.total_amount, 130.65);
        assert_eq!(record.import_session.as_deref(), Some("s-1"));
        assert_eq!(record.jurisdictions.len(), 2);
    }

    #[tokio::test]
    async fn test_update_preserves_session_tag() {
        let repo = repository().await;
        repo.upsert(&order(7, 100.0), None).await.unwrap();

        let outcome = repo.upsert(&order(7, 200.0), Some("s-2")).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let record = repo.get(7).await.unwrap().unwrap();
        assert_eq!(record.subtotal, 200.0);
        assert!(record.import_session.is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_under_new_session_survives_its_rollback() {
        let repo = repository().await;
        repo.upsert(&order(5, 10.0), Some("old")).await.unwrap();
        repo.upsert(&order(5, 99.0), Some("new")).await.unwrap();
        repo.upsert(&order(6, 20.0), Some("new")).await.unwrap();

        assert_eq!(repo.delete_by_session("new").await.unwrap(), 1);

        let record = repo.get(5).await.unwrap().unwrap();
        assert_eq!(record.import_session.as_deref(), Some("old"));
        assert_eq!(record.subtotal, 99.0);
        assert!(!repo.exists(6).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_session_only_touches_tagged_rows() {
        let repo = repository().await;
        repo.upsert(&order(1, 10.0), Some("keep")).await.unwrap();
        repo.upsert(&order(2, 10.0), Some("drop")).await.unwrap();
        repo.upsert(&order(3, 10.0), Some("drop")).await.unwrap();
        repo.upsert(&order(4, 10.0), None).await.unwrap();

        assert_eq!(repo.delete_by_session("drop").await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(repo.exists(1).await.unwrap());
        assert!(!repo.exists(2).await.unwrap());
        assert_eq!(repo.delete_by_session("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let repo = repository().await;
        for id in 1..=5 {
            repo.upsert(&order(id, 10.0), None).await.unwrap();
        }
        assert_eq!(repo.list(2, 0).await.unwrap().len(), 2);
        assert_eq!(repo.list(10, 3).await.unwrap().len(), 2);
        assert!(repo.get(99).await.unwrap().is_none());
    }
}
