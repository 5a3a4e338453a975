//! Database Models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::domain::entities::order::OrderRecord;
use crate::domain::repositories::order_store::StoreError;

/// Order row as stored
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub subtotal: f64,
    pub timestamp: String,
    pub jurisdiction_name: String,
    pub state_rate: f64,
    pub county_rate: f64,
    pub city_rate: f64,
    pub special_rate: f64,
    pub composite_rate: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    pub jurisdictions: String, // JSON array
    pub import_session: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for OrderRecord {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let jurisdictions: Vec<String> = serde_json::from_str(&row.jurisdictions).map_err(|e| {
            StoreError::Corrupt(format!("order {} jurisdictions: {}", row.id, e))
        })?;

        Ok(OrderRecord {
            id: row.id,
            latitude: row.latitude,
            longitude: row.longitude,
            subtotal: row.subtotal,
            timestamp: row.timestamp,
            jurisdiction_name: row.jurisdiction_name,
            state_rate: row.state_rate,
            county_rate: row.county_rate,
            city_rate: row.city_rate,
            special_rate: row.special_rate,
            composite_rate: row.composite_rate,
            tax_amount: row.tax_amount,
            total_amount: row.total_amount,
            jurisdictions,
            import_session: row.import_session,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
