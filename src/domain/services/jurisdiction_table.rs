//! Static New York State jurisdiction table.
//!
//! Boxes are deliberately coarse and overlap along borough and county lines.
//! Resolution walks `JURISDICTIONS` in order and takes the first hit, so the
//! order below is the tie-break: Manhattan beats the Brooklyn and Queens boxes
//! it overlaps, the boroughs beat Nassau and Westchester.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::domain::entities::jurisdiction::{JurisdictionEntry, RateComponents};
use crate::domain::value_objects::coordinates::BoundingBox;

const STATE_RATE: f64 = 0.04;
const NYC_CITY_RATE: f64 = 0.045;
const MCTD_RATE: f64 = 0.00375;

/// Coarse outline of New York State. Anything outside is rejected outright.
pub const REGION_BOUNDS: BoundingBox = BoundingBox::new(40.49, 45.02, -79.77, -71.85);

/// Used when a point is inside the state but matches no listed jurisdiction.
pub const DEFAULT_JURISDICTION: JurisdictionEntry = JurisdictionEntry {
    name: "New York State",
    fips: "36",
    bounds: REGION_BOUNDS,
    rates: RateComponents::new(STATE_RATE, 0.04, 0.0, 0.0),
    breadcrumb: &["New York State"],
};

pub const JURISDICTIONS: &[JurisdictionEntry] = &[
    JurisdictionEntry {
        name: "Manhattan",
        fips: "36061",
        bounds: BoundingBox::new(40.6995, 40.8820, -74.0200, -73.9070),
        rates: RateComponents::new(STATE_RATE, 0.0, NYC_CITY_RATE, MCTD_RATE),
        breadcrumb: &["New York State", "New York County", "New York City", "MCTD"],
    },
    JurisdictionEntry {
        name: "Bronx",
        fips: "36005",
        bounds: BoundingBox::new(40.7855, 40.9176, -73.9339, -73.7654),
        rates: RateComponents::new(STATE_RATE, 0.0, NYC_CITY_RATE, MCTD_RATE),
        breadcrumb: &["New York State", "Bronx County", "New York City", "MCTD"],
    },
    JurisdictionEntry {
        name: "Brooklyn",
        fips: "36047",
        bounds: BoundingBox::new(40.5707, 40.7395, -74.0421, -73.8334),
        rates: RateComponents::new(STATE_RATE, 0.0, NYC_CITY_RATE, MCTD_RATE),
        breadcrumb: &["New York State", "Kings County", "New York City", "MCTD"],
    },
    JurisdictionEntry {
        name: "Queens",
        fips: "36081",
        bounds: BoundingBox::new(40.5417, 40.8007, -73.9626, -73.7004),
        rates: RateComponents::new(STATE_RATE, 0.0, NYC_CITY_RATE, MCTD_RATE),
        breadcrumb: &["New York State", "Queens County", "New York City", "MCTD"],
    },
    JurisdictionEntry {
        name: "Staten Island",
        fips: "36085",
        bounds: BoundingBox::new(40.4960, 40.6490, -74.2557, -74.0522),
        rates: RateComponents::new(STATE_RATE, 0.0, NYC_CITY_RATE, MCTD_RATE),
        breadcrumb: &["New York State", "Richmond County", "New York City", "MCTD"],
    },
    JurisdictionEntry {
        name: "Nassau County",
        fips: "36059",
        bounds: BoundingBox::new(40.5430, 40.9950, -73.7680, -73.4230),
        rates: RateComponents::new(STATE_RATE, 0.0425, 0.0, MCTD_RATE),
        breadcrumb: &["New York State", "Nassau County", "MCTD"],
    },
    JurisdictionEntry {
        name: "Suffolk County",
        fips: "36103",
        bounds: BoundingBox::new(40.6000, 41.3000, -73.4970, -71.8560),
        rates: RateComponents::new(STATE_RATE, 0.0425, 0.0, MCTD_RATE),
        breadcrumb: &["New York State", "Suffolk County", "MCTD"],
    },
    JurisdictionEntry {
        name: "Westchester County",
        fips: "36119",
        bounds: BoundingBox::new(40.8820, 41.3670, -73.9830, -73.4820),
        rates: RateComponents::new(STATE_RATE, 0.04, 0.0, MCTD_RATE),
        breadcrumb: &["New York State", "Westchester County", "MCTD"],
    },
    JurisdictionEntry {
        name: "Erie County",
        fips: "36029",
        bounds: BoundingBox::new(42.4380, 43.0980, -79.3120, -78.4640),
        rates: RateComponents::new(STATE_RATE, 0.0475, 0.0, 0.0),
        breadcrumb: &["New York State", "Erie County"],
    },
    JurisdictionEntry {
        name: "Monroe County",
        fips: "36055",
        bounds: BoundingBox::new(42.9400, 43.3700, -77.9970, -77.3710),
        rates: RateComponents::new(STATE_RATE, 0.04, 0.0, 0.0),
        breadcrumb: &["New York State", "Monroe County"],
    },
    JurisdictionEntry {
        name: "Onondaga County",
        fips: "36067",
        bounds: BoundingBox::new(42.7700, 43.2700, -76.5000, -75.8960),
        rates: RateComponents::new(STATE_RATE, 0.04, 0.0, 0.0),
        breadcrumb: &["New York State", "Onondaga County"],
    },
    JurisdictionEntry {
        name: "Albany County",
        fips: "36001",
        bounds: BoundingBox::new(42.4000, 42.8200, -74.2700, -73.6760),
        rates: RateComponents::new(STATE_RATE, 0.04, 0.0, 0.0),
        breadcrumb: &["New York State", "Albany County"],
    },
];

static BY_FIPS: Lazy<HashMap<&'static str, &'static JurisdictionEntry>> =
    Lazy::new(|| JURISDICTIONS.iter().map(|entry| (entry.fips, entry)).collect());

pub fn find_by_fips(code: &str) -> Option<&'static JurisdictionEntry> {
    BY_FIPS.get(code.trim()).copied()
}
