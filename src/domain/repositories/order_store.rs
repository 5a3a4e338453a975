//! Order Store Trait
//!
//! Persistence seam for computed orders. The import engine only needs
//! existence checks, upsert-by-id and deletion by session tag; the query
//! methods back the manual order endpoints.

use crate::domain::entities::order::{OrderRecord, PricedOrder, UpsertOutcome};
use async_trait::async_trait;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store query failed: {0}")]
    Query(String),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

/// Keyed order storage with upsert semantics.
///
/// Implementations must serialize writes: callers may run several imports at
/// once and rely on no two writes being in flight.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn exists(&self, id: i64) -> StoreResult<bool>;

    /// Insert the order, or overwrite the existing record with the same id.
    ///
    /// `session_tag` is written only on insert; an update keeps whatever tag
    /// the record already had.
    async fn upsert(&self, order: &PricedOrder, session_tag: Option<&str>)
        -> StoreResult<UpsertOutcome>;

    /// Delete every record tagged with `session_tag`, returning how many went.
    async fn delete_by_session(&self, session_tag: &str) -> StoreResult<u64>;

    async fn get(&self, id: i64) -> StoreResult<Option<OrderRecord>>;

    async fn list(&self, limit: u32, offset: u32) -> StoreResult<Vec<OrderRecord>>;

    async fn count(&self) -> StoreResult<i64>;
}
