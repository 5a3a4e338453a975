use std::net::SocketAddr;
use std::time::Duration;

/// Which jurisdiction resolver to build at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverStrategy {
    /// Static bounding-box table, no network.
    BoundingBox,
    /// FIPS lookup service with default-rate fallback.
    FipsLookup,
}

impl ResolverStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "bbox" | "bounding_box" | "static" => Some(ResolverStrategy::BoundingBox),
            "fips" | "lookup" | "fips_lookup" => Some(ResolverStrategy::FipsLookup),
            _ => None,
        }
    }
}

/// Import pipeline and lookup configuration
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub chunk_size: usize,                // Rows resolved concurrently per chunk
    pub event_buffer: usize,              // Streaming channel capacity
    pub max_error_samples: usize,         // Failures reported in the terminal event
    pub resolver_strategy: ResolverStrategy,
    pub lookup_base_url: String,
    pub lookup_timeout_milliseconds: u64, // Per-request lookup timeout
    pub lookup_requests_per_second: u32,
    pub lookup_cache_capacity: usize,
    pub bind_address: SocketAddr,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            chunk_size: 5,
            event_buffer: 64,
            max_error_samples: 20,
            resolver_strategy: ResolverStrategy::BoundingBox,
            lookup_base_url: "https://geo.fcc.gov/api/census/block/find".to_string(),
            lookup_timeout_milliseconds: 8000,
            lookup_requests_per_second: 10,
            lookup_cache_capacity: 1024,
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

fn parse_in_range<T>(name: &str, raw: &str, min: T, max: T, current: T) -> T
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
    T::Err: std::fmt::Display,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value >= min && value <= max => value,
        Ok(value) => {
            tracing::warn!(
                "Invalid {} value: {} (must be between {} and {}), using default: {}",
                name,
                value,
                min,
                max,
                current
            );
            current
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse {} '{}': {}, using default: {}",
                name,
                raw,
                e,
                current
            );
            current
        }
    }
}

impl ImportConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ImportConfig {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ImportConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(var: F) -> ImportConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ImportConfig::default();

        if let Some(raw) = var("IMPORT_CHUNK_SIZE") {
            config.chunk_size = parse_in_range("IMPORT_CHUNK_SIZE", &raw, 1, 100, config.chunk_size);
        }

        if let Some(raw) = var("IMPORT_EVENT_BUFFER") {
            config.event_buffer =
                parse_in_range("IMPORT_EVENT_BUFFER", &raw, 1, 10_000, config.event_buffer);
        }

        if let Some(raw) = var("IMPORT_MAX_ERROR_SAMPLES") {
            config.max_error_samples = parse_in_range(
                "IMPORT_MAX_ERROR_SAMPLES",
                &raw,
                0,
                1_000,
                config.max_error_samples,
            );
        }

        if let Some(raw) = var("RESOLVER_STRATEGY") {
            match ResolverStrategy::parse(&raw) {
                Some(strategy) => config.resolver_strategy = strategy,
                None => tracing::warn!(
                    "Unknown RESOLVER_STRATEGY '{}' (expected bbox or fips), using default: {:?}",
                    raw,
                    config.resolver_strategy
                ),
            }
        }

        if let Some(url) = var("LOOKUP_BASE_URL") {
            if url.starts_with("http://") || url.starts_with("https://") {
                config.lookup_base_url = url;
            } else {
                tracing::warn!("Ignoring LOOKUP_BASE_URL '{}': not an http(s) URL", url);
            }
        }

        if let Some(raw) = var("LOOKUP_TIMEOUT_MILLISECONDS") {
            config.lookup_timeout_milliseconds = parse_in_range(
                "LOOKUP_TIMEOUT_MILLISECONDS",
                &raw,
                100,
                60_000,
                config.lookup_timeout_milliseconds,
            );
        }

        if let Some(raw) = var("LOOKUP_REQUESTS_PER_SECOND") {
            config.lookup_requests_per_second = parse_in_range(
                "LOOKUP_REQUESTS_PER_SECOND",
                &raw,
                1,
                1_000,
                config.lookup_requests_per_second,
            );
        }

        if let Some(raw) = var("LOOKUP_CACHE_CAPACITY") {
            config.lookup_cache_capacity = parse_in_range(
                "LOOKUP_CACHE_CAPACITY",
                &raw,
                1,
                1_000_000,
                config.lookup_cache_capacity,
            );
        }

        if let Some(raw) = var("BIND_ADDRESS") {
            match raw.parse::<SocketAddr>() {
                Ok(addr) => config.bind_address = addr,
                Err(e) => tracing::warn!(
                    "Failed to parse BIND_ADDRESS '{}': {}, using default: {}",
                    raw,
                    e,
                    config.bind_address
                ),
            }
        }

        config
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_milliseconds)
    }
}
