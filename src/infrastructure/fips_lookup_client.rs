use async_trait::async_trait;
use lru::LruCache;
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::ImportConfig;
use crate::domain::repositories::region_lookup::{LookupError, RegionCodeLookup};
use crate::domain::value_objects::coordinates::Coordinates;
use crate::rate_limit::{create_rate_limiter, LookupRateLimiter, RateLimiterConfig};

/// FCC census block API response, only the parts we read
#[derive(Debug, Deserialize)]
pub struct BlockFindResponse {
    #[serde(rename = "County")]
    pub county: Option<CountyInfo>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CountyInfo {
    #[serde(rename = "FIPS")]
    pub fips: Option<String>,
    pub name: Option<String>,
}

impl BlockFindResponse {
    pub fn county_fips(self) -> Result<String, LookupError> {
        if let Some(status) = &self.status {
            if !status.eq_ignore_ascii_case("OK") {
                return Err(LookupError::InvalidResponse(format!("status {}", status)));
            }
        }
        self.county
            .and_then(|county| county.fips)
            .filter(|fips| !fips.trim().is_empty())
            .ok_or(LookupError::NotFound)
    }
}

/// County FIPS lookup over HTTP, rate limited and cached by rounded coordinates.
pub struct FipsLookupClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    limiter: LookupRateLimiter,
    cache: Mutex<LruCache<(i64, i64), String>>,
}

impl FipsLookupClient {
    pub fn new(config: &ImportConfig) -> Result<Self, LookupError> {
        let timeout = config.lookup_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Network(format!("Failed to build HTTP client: {}", e)))?;
        let capacity =
            NonZeroUsize::new(config.lookup_cache_capacity).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            client,
            base_url: config.lookup_base_url.clone(),
            timeout,
            limiter: create_rate_limiter(RateLimiterConfig {
                requests_per_second: config.lookup_requests_per_second,
            }),
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    fn map_request_error(&self, e: reqwest::Error) -> LookupError {
        if e.is_timeout() {
            LookupError::Timeout(self.timeout.as_millis() as u64)
        } else {
            LookupError::Network(e.to_string())
        }
    }

    async fn fetch(&self, point: Coordinates) -> Result<String, LookupError> {
        self.limiter.until_ready().await;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", point.latitude.to_string()),
                ("longitude", point.longitude.to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Network(format!("HTTP {}", status)));
        }

        let body: BlockFindResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_request_error(e)
            } else {
                LookupError::InvalidResponse(e.to_string())
            }
        })?;

        body.county_fips()
    }
}

#[async_trait]
impl RegionCodeLookup for FipsLookupClient {
    async fn lookup_region_code(&self, point: Coordinates) -> Result<String, LookupError> {
        let key = point.cache_key();
        if let Some(code) = self.cache.lock().await.get(&key) {
            debug!("FIPS cache hit for {}: {}", point, code);
            return Ok(code.clone());
        }

        let code = self.fetch(point).await?;
        debug!("FIPS lookup for {}: {}", point, code);
        self.cache.lock().await.put(key, code.clone());
        Ok(code)
    }
}
