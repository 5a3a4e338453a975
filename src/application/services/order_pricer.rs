use std::sync::Arc;

use crate::domain::entities::order::{PricedOrder, RawRow};
use crate::domain::errors::{FallbackReason, RowError};
use crate::domain::services::jurisdiction_resolver::JurisdictionResolver;
use crate::domain::services::{row_validator, tax_calculator};

/// A row ready to persist, plus the fallback warning raised while resolving it.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedRow {
    pub order: PricedOrder,
    pub fallback: Option<FallbackReason>,
}

/// Validate -> resolve -> calculate for one row. Holds no mutable state, so any
/// number of rows can be priced concurrently.
pub struct OrderPricer {
    resolver: Arc<dyn JurisdictionResolver>,
}

impl OrderPricer {
    pub fn new(resolver: Arc<dyn JurisdictionResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<dyn JurisdictionResolver> {
        &self.resolver
    }

    pub async fn price(&self, row: &RawRow) -> Result<PricedRow, RowError> {
        let validated = row_validator::validate(row)?;
        let resolution = self.resolver.resolve(validated.coordinates).await?;
        let breakdown = tax_calculator::calculate(validated.subtotal, &resolution.rate);

        Ok(PricedRow {
            order: PricedOrder {
                id: validated.id,
                coordinates: validated.coordinates,
                timestamp: validated.timestamp,
                jurisdiction: resolution.rate,
                breakdown,
            },
            fallback: resolution.fallback,
        })
    }
}
