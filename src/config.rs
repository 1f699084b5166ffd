use crate::services::chart_renderer::{DEFAULT_HEIGHT, DEFAULT_STROKE_WIDTH, DEFAULT_WIDTH};
use crate::services::market_service::{COINGECKO_BASE_URL, DEFAULT_VS_CURRENCY};
use std::env;
use std::time::Duration;

/// Service configuration derived from `COIN_CHARTS_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind: String,
    pub port: u16,
    pub upstream_url: String,
    pub vs_currency: String,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
    /// Pause before every upstream call. Zero disables pacing.
    pub pacing: Duration,
    pub chart_width: u32,
    pub chart_height: u32,
    /// Line and area border width in pixels.
    pub stroke_width: u32,
    /// Period of the expired-entry sweep. Zero disables it.
    pub sweep_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            upstream_url: COINGECKO_BASE_URL.to_string(),
            vs_currency: DEFAULT_VS_CURRENCY.to_string(),
            cache_ttl: Duration::from_secs(300),
            request_timeout: Duration::from_secs(15),
            pacing: Duration::ZERO,
            chart_width: DEFAULT_WIDTH,
            chart_height: DEFAULT_HEIGHT,
            stroke_width: DEFAULT_STROKE_WIDTH,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let var = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let positive = |name: &str, default: u64| {
            var(name)
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };
        let non_negative = |name: &str, default: u64| {
            var(name)
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(default)
        };

        Self {
            bind: var("COIN_CHARTS_BIND").unwrap_or(d.bind),
            port: var("COIN_CHARTS_PORT")
                .and_then(|s| s.parse::<u16>().ok())
                .filter(|p| *p > 0)
                .unwrap_or(d.port),
            upstream_url: var("COIN_CHARTS_UPSTREAM_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(d.upstream_url),
            vs_currency: var("COIN_CHARTS_VS_CURRENCY")
                .map(|s| s.to_lowercase())
                .unwrap_or(d.vs_currency),
            cache_ttl: Duration::from_secs(positive(
                "COIN_CHARTS_CACHE_TTL_SECS",
                d.cache_ttl.as_secs(),
            )),
            request_timeout: Duration::from_secs(positive(
                "COIN_CHARTS_TIMEOUT_SECS",
                d.request_timeout.as_secs(),
            )),
            pacing: Duration::from_millis(non_negative("COIN_CHARTS_PACING_MS", 0)),
            chart_width: positive("COIN_CHARTS_CHART_WIDTH", d.chart_width as u64) as u32,
            chart_height: positive("COIN_CHARTS_CHART_HEIGHT", d.chart_height as u64) as u32,
            stroke_width: positive("COIN_CHARTS_STROKE_WIDTH", d.stroke_width as u64) as u32,
            sweep_interval: Duration::from_secs(non_negative(
                "COIN_CHARTS_SWEEP_SECS",
                d.sweep_interval.as_secs(),
            )),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
