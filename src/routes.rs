use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::services::market_service::{
    ChartImage, ChartOptions, CoinDetails, GlobalMarketData, TrendingCoins,
};
use crate::state::AppState;

/// Routes served by the binary, with their one-line descriptions.
pub const ROUTES: &[(&str, &str)] = &[
    ("GET /global_market_data", "Total market cap and 24h volume (USD)"),
    ("GET /trending_coins", "Coins trending on CoinGecko"),
    ("GET /coin_details/{coin_id}", "Coin metadata and images"),
    ("GET /coin_chart/{coin_id}/{days}", "Price chart as base64 PNG"),
    ("GET /market_cap_chart/{coin_id}/{days}", "Market cap chart as base64 PNG"),
    ("GET /health", "Liveness probe"),
];

/// Assemble the full router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/global_market_data", get(global_market_data))
        .route("/trending_coins", get(trending_coins))
        .route("/coin_details/{coin_id}", get(coin_details))
        .route("/coin_chart/{coin_id}/{days}", get(coin_chart))
        .route("/market_cap_chart/{coin_id}/{days}", get(market_cap_chart))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Optional presentation overrides: `?style=bar&theme=light`.
#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub style: Option<String>,
    pub theme: Option<String>,
}

impl ChartQuery {
    fn options(&self) -> Result<ChartOptions, ApiError> {
        ChartOptions::parse(self.style.as_deref(), self.theme.as_deref())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidParameter(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidParameter(rejection.body_text())
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /global_market_data
async fn global_market_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GlobalMarketData>, ApiError> {
    Ok(Json(state.market.global_market_data().await?))
}

/// GET /trending_coins
async fn trending_coins(State(state): State<Arc<AppState>>) -> Result<Json<TrendingCoins>, ApiError> {
    Ok(Json(state.market.trending_coins().await?))
}

/// GET /coin_details/{coin_id}
async fn coin_details(
    State(state): State<Arc<AppState>>,
    coin_id: Result<Path<String>, PathRejection>,
) -> Result<Json<CoinDetails>, ApiError> {
    let Path(coin_id) = coin_id?;
    Ok(Json(state.market.coin_details(&coin_id).await?))
}

/// GET /coin_chart/{coin_id}/{days}
async fn coin_chart(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(String, String)>, PathRejection>,
    query: Result<Query<ChartQuery>, QueryRejection>,
) -> Result<Json<ChartImage>, ApiError> {
    let Path((coin_id, days)) = path?;
    let Query(query) = query?;
    let options = query.options()?;
    Ok(Json(state.market.price_chart(&coin_id, &days, options).await?))
}

/// GET /market_cap_chart/{coin_id}/{days}
async fn market_cap_chart(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(String, String)>, PathRejection>,
    query: Result<Query<ChartQuery>, QueryRejection>,
) -> Result<Json<ChartImage>, ApiError> {
    let Path((coin_id, days)) = path?;
    let Query(query) = query?;
    let options = query.options()?;
    Ok(Json(state.market.market_cap_chart(&coin_id, &days, options).await?))
}
