use serde::{Deserialize, Serialize};

use crate::domain::value_objects::coordinates::BoundingBox;

/// The four additive components of a sales-tax rate, each a fraction in [0, 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateComponents {
    pub state: f64,
    pub county: f64,
    pub city: f64,
    pub special: f64,
}

impl RateComponents {
    pub const fn new(state: f64, county: f64, city: f64, special: f64) -> Self {
        Self {
            state,
            county,
            city,
            special,
        }
    }

    /// Sum of all components, snapped to 1e-7 so 0.04 + 0.045 + 0.00375 reads as 0.08875.
    pub fn composite(&self) -> f64 {
        let sum = self.state + self.county + self.city + self.special;
        (sum * 10_000_000.0).round() / 10_000_000.0
    }
}

/// How a rate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    BoundingBox,
    Lookup,
    Default,
}

/// Resolved tax rate for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionRate {
    pub name: String,
    pub state_rate: f64,
    pub county_rate: f64,
    pub city_rate: f64,
    pub special_rate: f64,
    pub composite_rate: f64,
    /// Breadcrumb from the broadest authority down, e.g. state, county, city, district.
    pub jurisdictions: Vec<String>,
    pub source: RateSource,
}

impl JurisdictionRate {
    pub fn new(
        name: impl Into<String>,
        components: RateComponents,
        jurisdictions: Vec<String>,
        source: RateSource,
    ) -> Self {
        Self {
            name: name.into(),
            state_rate: components.state,
            county_rate: components.county,
            city_rate: components.city,
            special_rate: components.special,
            composite_rate: components.composite(),
            jurisdictions,
            source,
        }
    }

    pub fn components(&self) -> RateComponents {
        RateComponents::new(
            self.state_rate,
            self.county_rate,
            self.city_rate,
            self.special_rate,
        )
    }
}

/// Row of the static jurisdiction table.
#[derive(Debug, Clone, Copy)]
pub struct JurisdictionEntry {
    pub name: &'static str,
    /// Five-digit county FIPS code used by the lookup strategy.
    pub fips: &'static str,
    pub bounds: BoundingBox,
    pub rates: RateComponents,
    pub breadcrumb: &'static [&'static str],
}

impl JurisdictionEntry {
    pub fn to_rate(&self, source: RateSource) -> JurisdictionRate {
        JurisdictionRate::new(
            self.name,
            self.rates,
            self.breadcrumb.iter().map(|s| s.to_string()).collect(),
            source,
        )
    }
}
