use crate::api::coingecko::MarketDataClient;
use crate::api::transport::{HttpTransport, ReqwestTransport};
use crate::config::AppConfig;
use crate::error::FetchError;
use crate::models::cache::CacheStore;
use crate::services::chart_renderer::ChartRenderer;
use crate::services::market_service::MarketService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Shared application state, passed to all route handlers via `axum::extract::State`.
pub struct AppState {
    pub config: AppConfig,
    pub cache: Arc<CacheStore>,
    pub market: MarketService,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Arc<Self>, FetchError> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Wires the service graph on top of an arbitrary network layer.
    pub fn with_transport(config: AppConfig, transport: Arc<dyn HttpTransport>) -> Arc<Self> {
        let cache = Arc::new(CacheStore::new(config.cache_ttl));
        Self::with_parts(config, transport, cache)
    }

    pub fn with_parts(
        config: AppConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<CacheStore>,
    ) -> Arc<Self> {
        let client = MarketDataClient::new(transport, cache.clone()).with_pacing(config.pacing);
        let renderer = ChartRenderer::new(config.chart_width, config.chart_height)
            .with_stroke_width(config.stroke_width);
        let market = MarketService::new(client, renderer)
            .with_base_url(&config.upstream_url)
            .with_vs_currency(&config.vs_currency);

        Arc::new(Self {
            config,
            cache,
            market,
        })
    }

    /// Periodically drops expired cache entries. `None` when `every` is zero.
    pub fn spawn_cache_sweeper(self: &Arc<Self>, every: Duration) -> Option<JoinHandle<()>> {
        if every.is_zero() {
            return None;
        }

        let state = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = state.cache.sweep();
                if removed > 0 {
                    debug!("Swept {} expired cache entries", removed);
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cache::ManualClock;
    use serde_json::json;

    #[tokio::test]
    async fn sweeper_drops_expired_entries() {
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(CacheStore::with_clock(Duration::from_secs(10), clock.clone()));
        let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(1)).unwrap());
        let state = AppState::with_parts(AppConfig::default(), transport, cache.clone());

        cache.put("global", json!({}));
        clock.advance(Duration::from_secs(11));

        let handle = state.spawn_cache_sweeper(Duration::from_millis(20)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(cache.is_empty());
    }

    #[test]
    fn zero_interval_disables_sweeper() {
        let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(1)).unwrap());
        let state = AppState::with_transport(AppConfig::default(), transport);
        assert!(state.spawn_cache_sweeper(Duration::ZERO).is_none());
    }
}
