use crate::api::transport::{HttpTransport, RawResponse};
use crate::error::FetchError;
use crate::models::cache::CacheStore;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Cache-first JSON fetcher for the CoinGecko API.
///
/// Keyed requests are served from the cache while fresh. Failed calls are
/// returned as-is and never retried.
pub struct MarketDataClient {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<CacheStore>,
    pacing: Duration,
}

impl MarketDataClient {
    pub fn new(transport: Arc<dyn HttpTransport>, cache: Arc<CacheStore>) -> Self {
        Self {
            transport,
            cache,
            pacing: Duration::ZERO,
        }
    }

    /// Pause for `pacing` before every network call. Zero disables pacing.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub async fn fetch(&self, url: &str, cache_key: Option<&str>) -> Result<Value, FetchError> {
        if let Some(key) = cache_key {
            if let Some(payload) = self.cache.get(key) {
                debug!("Cache hit for {}", key);
                return Ok(payload);
            }
            debug!("Cache miss for {}", key);
        }

        if !self.pacing.is_zero() {
            sleep(self.pacing).await;
        }

        info!("Fetching from upstream: {}", url);
        let payload = match self.transport.get(url).await {
            Ok(response) => classify_response(&response),
            Err(e) => Err(e),
        };

        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Upstream request to {} failed: {}", url, e);
                return Err(e);
            }
        };

        if let Some(key) = cache_key {
            self.cache.put(key, payload.clone());
        }

        Ok(payload)
    }
}

/// Maps an HTTP status and body onto a payload or a `FetchError`.
///
/// 429 is checked first since it is the signal the cache exists to avoid.
pub fn classify_response(response: &RawResponse) -> Result<Value, FetchError> {
    match response.status {
        429 => Err(FetchError::RateLimited),
        status if !(200..300).contains(&status) => Err(FetchError::HttpError(status)),
        _ => serde_json::from_slice(&response.body).map_err(|_| FetchError::MalformedResponse),
    }
}
