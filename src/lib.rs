//! GeoTax Order Import Library
//!
//! Bulk and single-order tax computation for delivery orders: jurisdiction
//! resolution from coordinates, sales tax at cent precision, and chunked CSV
//! imports with progress streaming and session rollback.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
pub mod rate_limit;
