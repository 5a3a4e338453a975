use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::jurisdiction::JurisdictionRate;
use crate::domain::value_objects::coordinates::Coordinates;
use crate::domain::value_objects::money::Money;

/// Order row exactly as it arrived from the source, every field still text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub id: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub subtotal: Option<String>,
    pub timestamp: Option<String>,
}

impl RawRow {
    pub fn new(id: &str, latitude: &str, longitude: &str, subtotal: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            latitude: Some(latitude.to_string()),
            longitude: Some(longitude.to_string()),
            subtotal: Some(subtotal.to_string()),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = Some(timestamp.to_string());
        self
    }

    /// Identifier used in progress events and error samples, even when it does not parse.
    pub fn label(&self) -> String {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("?")
            .to_string()
    }
}

/// Row that passed structural and business validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    pub id: i64,
    pub coordinates: Coordinates,
    pub subtotal: Money,
    /// ISO-8601; processing time when the source left it blank.
    pub timestamp: String,
}

/// Result of the tax calculation for one subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub subtotal: f64,
    pub composite_rate: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
}

/// Fully computed order, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    pub id: i64,
    pub coordinates: Coordinates,
    pub timestamp: String,
    pub jurisdiction: JurisdictionRate,
    pub breakdown: TaxBreakdown,
}

/// Stored order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
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
    pub jurisdictions: Vec<String>,
    /// Streaming import session that first inserted this record, if any.
    pub import_session: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether an upsert created the record or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_falls_back_for_missing_id() {
        let mut row = RawRow::new(" 42 ", "40.7", "-74.0", "10");
        assert_eq!(row.label(), "42");
        row.id = None;
        assert_eq!(row.label(), "?");
        row.id = Some("   ".to_string());
        assert_eq!(row.label(), "?");
    }

    #[test]
    fn test_raw_row_deserializes_with_missing_fields() {
        let row: RawRow = serde_json::from_str(r#"{"id":"7","latitude":"40.7"}"#).unwrap();
        assert_eq!(row.id.as_deref(), Some("7"));
        assert!(row.subtotal.is_none());
        assert!(row.timestamp.is_none());
    }
}
