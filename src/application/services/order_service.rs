use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::application::services::order_pricer::OrderPricer;
use crate::domain::entities::jurisdiction::JurisdictionRate;
use crate::domain::entities::order::{OrderRecord, RawRow, TaxBreakdown, UpsertOutcome};
use crate::domain::errors::{OrderError, RowError};
use crate::domain::repositories::order_store::OrderStore;
use crate::domain::services::tax_calculator;
use crate::domain::value_objects::coordinates::Coordinates;
use crate::domain::value_objects::money::Money;

pub const MAX_PAGE_SIZE: u32 = 500;
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Jurisdiction and tax for a point, without persisting anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub jurisdiction: JurisdictionRate,
    #[serde(flatten)]
    pub breakdown: TaxBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPoint {
    pub coordinates: Coordinates,
    pub jurisdiction: JurisdictionRate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub orders: Vec<OrderRecord>,
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
}

/// Single-order commands and read queries over the store.
#[derive(Clone)]
pub struct OrderService {
    pricer: Arc<OrderPricer>,
    store: Arc<dyn OrderStore>,
}

impl OrderService {
    pub fn new(pricer: Arc<OrderPricer>, store: Arc<dyn OrderStore>) -> Self {
        Self { pricer, store }
    }

    /// Price and upsert one order. Manual orders never carry a session tag.
    pub async fn create_order(
        &self,
        input: &RawRow,
    ) -> Result<(UpsertOutcome, OrderRecord), OrderError> {
        let priced = self.pricer.price(input).await?;
        let id = priced.order.id;
        let outcome = self.store.upsert(&priced.order, None).await?;
        info!(
            "Order {} {:?} in {} (tax {:.2})",
            id, outcome, priced.order.jurisdiction.name, priced.order.breakdown.tax_amount
        );

        let record = self.store.get(id).await?.ok_or(OrderError::NotFound(id))?;
        Ok((outcome, record))
    }

    pub async fn get_order(&self, id: i64) -> Result<OrderRecord, OrderError> {
        self.store.get(id).await?.ok_or(OrderError::NotFound(id))
    }

    pub async fn list_orders(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Page, OrderError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0);
        let orders = self.store.list(limit, offset).await?;
        let total = self.store.count().await?;
        Ok(Page {
            orders,
            total,
            limit,
            offset,
        })
    }

    pub async fn resolve(&self, point: Coordinates) -> Result<ResolvedPoint, OrderError> {
        let resolution = self.pricer.resolver().resolve(point).await?;
        Ok(ResolvedPoint {
            coordinates: point,
            jurisdiction: resolution.rate,
            warning: resolution.fallback.map(|reason| reason.to_string()),
        })
    }

    pub async fn quote(&self, point: Coordinates, subtotal: f64) -> Result<Quote, OrderError> {
        let subtotal = Money::new(subtotal)
            .ok()
            .filter(Money::is_positive)
            .ok_or(RowError::InvalidSubtotal(subtotal))?;

        let resolution = self.pricer.resolver().resolve(point).await?;
        Ok(Quote {
            breakdown: tax_calculator::calculate(subtotal, &resolution.rate),
            jurisdiction: resolution.rate,
            warning: resolution.fallback.map(|reason| reason.to_string()),
        })
    }
}
