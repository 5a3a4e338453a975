use thiserror::Error;

use crate::domain::repositories::order_store::StoreError;

/// Failure of a single row. Recorded against the row; the batch keeps going.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RowError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid number for {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Subtotal must be greater than zero, got {0}")]
    InvalidSubtotal(f64),

    #[error("Coordinates ({latitude}, {longitude}) are outside the supported region")]
    OutOfRegion { latitude: f64, longitude: f64 },

    #[error("Persistence failed: {0}")]
    PersistenceFailure(String),
}

/// Failure of a whole batch or of a session command.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Source could not be read as rows; nothing was written.
    #[error("Malformed import source: {0}")]
    Parse(String),

    #[error("Import session not found: {0}")]
    SessionNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of a single-order command or query.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Invalid(#[from] RowError),

    #[error("Order not found: {0}")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a lookup fell back to the default rate. A warning, never a row failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FallbackReason {
    #[error("lookup timed out after {0} ms")]
    Timeout(u64),

    #[error("lookup request failed: {0}")]
    Network(String),

    #[error("region code {0} has no rate mapping")]
    UnmappedCode(String),

    #[error("lookup returned an unusable response: {0}")]
    InvalidResponse(String),
}
