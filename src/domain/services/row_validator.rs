//! Row Validator
//!
//! Turns a text row into a [`ValidatedRow`]. Checks run in a fixed order so a
//! caller can tell malformed input from out-of-scope input:
//! 1. presence of every required field
//! 2. numeric parse of id, latitude, longitude, subtotal
//! 3. subtotal > 0
//! 4. coordinates inside the coarse region

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::entities::order::{RawRow, ValidatedRow};
use crate::domain::errors::RowError;
use crate::domain::services::jurisdiction_resolver::ensure_in_region;
use crate::domain::value_objects::coordinates::Coordinates;
use crate::domain::value_objects::money::Money;

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, RowError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(RowError::MissingField(field))
}

fn parse_float(value: &str, field: &'static str) -> Result<f64, RowError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RowError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn parse_id(value: &str) -> Result<i64, RowError> {
    value.parse::<i64>().map_err(|_| RowError::InvalidNumber {
        field: "id",
        value: value.to_string(),
    })
}

/// Validate a row, stamping `now` as the timestamp when the source has none.
pub fn validate_at(row: &RawRow, now: DateTime<Utc>) -> Result<ValidatedRow, RowError> {
    let id = required(&row.id, "id")?;
    let latitude = required(&row.latitude, "latitude")?;
    let longitude = required(&row.longitude, "longitude")?;
    let subtotal = required(&row.subtotal, "subtotal")?;

    let id = parse_id(id)?;
    let latitude = parse_float(latitude, "latitude")?;
    let longitude = parse_float(longitude, "longitude")?;
    let subtotal = parse_float(subtotal, "subtotal")?;

    if subtotal <= 0.0 {
        return Err(RowError::InvalidSubtotal(subtotal));
    }
    let subtotal = Money::new(subtotal).map_err(|_| RowError::InvalidSubtotal(subtotal))?;
    // Sub-cent positives like 0.004 round to zero.
    if !subtotal.is_positive() {
        return Err(RowError::InvalidSubtotal(subtotal.value()));
    }

    let coordinates = Coordinates::new(latitude, longitude);
    ensure_in_region(&coordinates)?;

    let timestamp = row
        .timestamp
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true));

    Ok(ValidatedRow {
        id,
        coordinates,
        subtotal,
        timestamp,
    })
}

pub fn validate(row: &RawRow) -> Result<ValidatedRow, RowError> {
    validate_at(row, Utc::now())
}
