//! CSV row source.
//!
//! Reads an uploaded file into [`RawRow`]s. Structural problems (no header,
//! missing required column, ragged records, bad UTF-8) fail the whole batch
//! before anything is processed; an empty cell is left for the row validator
//! to report against that row.

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::domain::entities::order::RawRow;
use crate::domain::errors::ImportError;

const REQUIRED: [&str; 4] = ["id", "latitude", "longitude", "subtotal"];

#[derive(Debug, Default)]
struct ColumnMap {
    id: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
    subtotal: Option<usize>,
    timestamp: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, ImportError> {
        let mut map = ColumnMap::default();
        for (index, header) in headers.iter().enumerate() {
            let slot = match header.trim().to_lowercase().as_str() {
                "id" | "order_id" => &mut map.id,
                "latitude" | "lat" => &mut map.latitude,
                "longitude" | "lon" | "lng" => &mut map.longitude,
                "subtotal" => &mut map.subtotal,
                "timestamp" | "created_at" => &mut map.timestamp,
                _ => continue,
            };
            if slot.is_some() {
                return Err(ImportError::Parse(format!("duplicate column '{}'", header)));
            }
            *slot = Some(index);
        }

        let present = [map.id, map.latitude, map.longitude, map.subtotal];
        let missing: Vec<&str> = REQUIRED
            .iter()
            .zip(present)
            .filter(|(_, index)| index.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::Parse(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }
        Ok(map)
    }

    fn extract(&self, record: &StringRecord) -> RawRow {
        let cell = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .map(str::to_string)
        };
        RawRow {
            id: cell(self.id),
            latitude: cell(self.latitude),
            longitude: cell(self.longitude),
            subtotal: cell(self.subtotal),
            timestamp: cell(self.timestamp),
        }
    }
}

/// Parse CSV bytes into rows, all or nothing.
pub fn parse_rows(data: &[u8]) -> Result<Vec<RawRow>, ImportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(false)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| ImportError::Parse(format!("unreadable header: {}", e)))?
        .clone();
    if headers.is_empty() {
        return Err(ImportError::Parse("empty file".to_string()));
    }
    let columns = ColumnMap::from_headers(&headers)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| ImportError::Parse(format!("record {}: {}", index + 1, e)))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        rows.push(columns.extract(&record));
    }
    Ok(rows)
}
