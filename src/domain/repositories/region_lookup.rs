//! Region Code Lookup Trait
//!
//! Network-backed resolution of a point to an administrative region code
//! (a five-digit county FIPS code for the bundled client).

use crate::domain::value_objects::coordinates::Coordinates;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LookupError {
    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// The service answered but has no region for this point.
    #[error("no region found")]
    NotFound,
}

#[async_trait]
pub trait RegionCodeLookup: Send + Sync {
    async fn lookup_region_code(&self, point: Coordinates) -> Result<String, LookupError>;
}
