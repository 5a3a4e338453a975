//! Jurisdiction Resolver
//!
//! Two interchangeable strategies behind one trait:
//! - [`BoundingBoxResolver`]: offline walk of the static table, first match wins.
//! - [`LookupResolver`]: asks a [`RegionCodeLookup`] for a county code and maps it
//!   through the same table. Any lookup failure degrades to the default
//!   statewide rate and is reported as a [`FallbackReason`], never as an error.
//!
//! Both reject points outside the coarse state outline with `OutOfRegion`.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::entities::jurisdiction::{JurisdictionRate, RateSource};
use crate::domain::errors::{FallbackReason, RowError};
use crate::domain::repositories::region_lookup::{LookupError, RegionCodeLookup};
use crate::domain::services::jurisdiction_table::{
    find_by_fips, DEFAULT_JURISDICTION, JURISDICTIONS, REGION_BOUNDS,
};
use crate::domain::value_objects::coordinates::Coordinates;

/// A resolved rate, plus the reason if it had to fall back.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub rate: JurisdictionRate,
    pub fallback: Option<FallbackReason>,
}

impl Resolution {
    fn exact(rate: JurisdictionRate) -> Self {
        Self {
            rate,
            fallback: None,
        }
    }

    fn fallback(reason: FallbackReason) -> Self {
        Self {
            rate: DEFAULT_JURISDICTION.to_rate(RateSource::Default),
            fallback: Some(reason),
        }
    }
}

#[async_trait]
pub trait JurisdictionResolver: Send + Sync {
    async fn resolve(&self, point: Coordinates) -> Result<Resolution, RowError>;
}

/// Coarse outline check shared by the validator and every resolver.
pub fn ensure_in_region(point: &Coordinates) -> Result<(), RowError> {
    if REGION_BOUNDS.contains(point) {
        Ok(())
    } else {
        Err(RowError::OutOfRegion {
            latitude: point.latitude,
            longitude: point.longitude,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoundingBoxResolver;

impl BoundingBoxResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve_point(&self, point: &Coordinates) -> Result<JurisdictionRate, RowError> {
        ensure_in_region(point)?;

        let rate = JURISDICTIONS
            .iter()
            .find(|entry| entry.bounds.contains(point))
            .map(|entry| entry.to_rate(RateSource::BoundingBox))
            .unwrap_or_else(|| DEFAULT_JURISDICTION.to_rate(RateSource::Default));

        debug!("Resolved {} to {}", point, rate.name);
        Ok(rate)
    }
}

#[async_trait]
impl JurisdictionResolver for BoundingBoxResolver {
    async fn resolve(&self, point: Coordinates) -> Result<Resolution, RowError> {
        self.resolve_point(&point).map(Resolution::exact)
    }
}

pub struct LookupResolver {
    lookup: Arc<dyn RegionCodeLookup>,
    timeout: Duration,
}

impl LookupResolver {
    pub fn new(lookup: Arc<dyn RegionCodeLookup>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }
}

#[async_trait]
impl JurisdictionResolver for LookupResolver {
    async fn resolve(&self, point: Coordinates) -> Result<Resolution, RowError> {
        ensure_in_region(&point)?;

        let timeout_ms = self.timeout.as_millis() as u64;
        let looked_up =
            match tokio::time::timeout(self.timeout, self.lookup.lookup_region_code(point)).await {
                Ok(result) => result,
                Err(_) => Err(LookupError::Timeout(timeout_ms)),
            };

        let resolution = match looked_up {
            Ok(code) => match find_by_fips(&code) {
                Some(entry) => Resolution::exact(entry.to_rate(RateSource::Lookup)),
                None => Resolution::fallback(FallbackReason::UnmappedCode(code)),
            },
            Err(LookupError::Timeout(ms)) => Resolution::fallback(FallbackReason::Timeout(ms)),
            Err(LookupError::Network(msg)) => Resolution::fallback(FallbackReason::Network(msg)),
            Err(LookupError::InvalidResponse(msg)) => {
                Resolution::fallback(FallbackReason::InvalidResponse(msg))
            }
            Err(LookupError::NotFound) => Resolution::fallback(FallbackReason::InvalidResponse(
                "no region for point".to_string(),
            )),
        };

        if let Some(reason) = &resolution.fallback {
            warn!("Falling back to default rate for {}: {}", point, reason);
        }
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedLookup {
        result: Result<String, LookupError>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FixedLookup {
        fn new(result: Result<String, LookupError>) -> Self {
            Self {
                result,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RegionCodeLookup for FixedLookup {
        async fn lookup_region_code(&self, _point: Coordinates) -> Result<String, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    fn lookup_resolver(lookup: FixedLookup) -> (LookupResolver, Arc<FixedLookup>) {
        let lookup = Arc::new(lookup);
        (
            LookupResolver::new(lookup.clone(), Duration::from_millis(50)),
            lookup,
        )
    }

    #[tokio::test]
    async fn test_manhattan_resolves_by_bounding_box() {
        let resolution = BoundingBoxResolver::new()
            .resolve(Coordinates::new(40.7128, -74.0060))
            .await
            .unwrap();
        assert_eq!(resolution.rate.name, "Manhattan");
        assert_eq!(resolution.rate.composite_rate, 0.08875);
        assert_eq!(resolution.rate.source, RateSource::BoundingBox);
        assert!(resolution.fallback.is_none());
    }

    #[test]
    fn test_overlapping_boxes_take_first_listed() {
        // Inside both the Manhattan and Brooklyn boxes.
        let point = Coordinates::new(40.7100, -74.0100);
        let brooklyn = JURISDICTIONS.iter().find(|e| e.name == "Brooklyn").unwrap();
        assert!(brooklyn.bounds.contains(&point));

        let rate = BoundingBoxResolver::new().resolve_point(&point).unwrap();
        assert_eq!(rate.name, "Manhattan");
    }

    #[test]
    fn test_inside_state_without_match_uses_default() {
        // Adirondacks
        let rate = BoundingBoxResolver::new()
            .resolve_point(&Coordinates::new(44.1, -74.3))
            .unwrap();
        assert_eq!(rate.name, "New York State");
        assert_eq!(rate.source, RateSource::Default);
        assert_eq!(rate.composite_rate, 0.08);
    }

    #[test]
    fn test_outside_state_is_rejected() {
        let err = BoundingBoxResolver::new()
            .resolve_point(&Coordinates::new(34.0522, -118.2437))
            .unwrap_err();
        assert!(matches!(err, RowError::OutOfRegion { .. }));
    }

    #[tokio::test]
    async fn test_lookup_maps_fips_code() {
        let (resolver, lookup) = lookup_resolver(FixedLookup::new(Ok("36029".to_string())));
        let resolution = resolver
            .resolve(Coordinates::new(42.8864, -78.8784))
            .await
            .unwrap();
        assert_eq!(resolution.rate.name, "Erie County");
        assert_eq!(resolution.rate.source, RateSource::Lookup);
        assert!(resolution.fallback.is_none());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lookup_unmapped_code_falls_back() {
        let (resolver, _) = lookup_resolver(FixedLookup::new(Ok("36999".to_string())));
        let resolution = resolver
            .resolve(Coordinates::new(42.0, -75.0))
            .await
            .unwrap();
        assert_eq!(resolution.rate.source, RateSource::Default);
        assert_eq!(
            resolution.fallback,
            Some(FallbackReason::UnmappedCode("36999".to_string()))
        );
    }

    #[tokio::test]
    async fn test_lookup_network_error_falls_back() {
        let (resolver, _) = lookup_resolver(FixedLookup::new(Err(LookupError::Network(
            "connection refused".to_string(),
        ))));
        let resolution = resolver
            .resolve(Coordinates::new(40.7128, -74.0060))
            .await
            .unwrap();
        assert_eq!(resolution.rate.composite_rate, 0.08);
        assert!(matches!(resolution.fallback, Some(FallbackReason::Network(_))));
    }

    #[tokio::test]
    async fn test_slow_lookup_times_out_into_fallback() {
        let mut slow = FixedLookup::new(Ok("36061".to_string()));
        slow.delay = Duration::from_secs(5);
        let (resolver, _) = lookup_resolver(slow);

        let resolution = resolver
            .resolve(Coordinates::new(40.7128, -74.0060))
            .await
            .unwrap();
        assert_eq!(resolution.fallback, Some(FallbackReason::Timeout(50)));
        assert_eq!(resolution.rate.source, RateSource::Default);
    }

    #[tokio::test]
    async fn test_lookup_never_called_outside_region() {
        let (resolver, lookup) = lookup_resolver(FixedLookup::new(Ok("36061".to_string())));
        let err = resolver
            .resolve(Coordinates::new(51.5, -0.12))
            .await
            .unwrap_err();
        assert!(matches!(err, RowError::OutOfRegion { .. }));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }
}
