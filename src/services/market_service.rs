use crate::api::coingecko::MarketDataClient;
use crate::error::ApiError;
use crate::models::chart::{ChartDays, ChartRequest, ChartStyle, Rgb, Theme};
use crate::models::series::parse_series;
use crate::services::chart_renderer::ChartRenderer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

/// CoinGecko API base URL
pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_VS_CURRENCY: &str = "usd";

const MAX_COIN_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalMarketData {
    pub total_market_cap_usd: f64,
    pub total_24h_volume_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingCoin {
    pub id: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub market_cap_rank: Option<u64>,
    pub large_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingCoins {
    pub trending_coins: Vec<TrendingCoin>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinDetails {
    pub id: Option<String>,
    pub symbol: String,
    pub name: Option<String>,
    pub description: String,
    pub homepage: String,
    pub asset_platform_id: Option<String>,
    pub image_thumb: Option<String>,
    pub image_small: Option<String>,
    pub image_large: Option<String>,
    pub market_cap_rank: Option<u64>,
}

/// Base64-encoded PNG, as returned by the chart endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartImage {
    pub chart: String,
}

/// Caller-selectable presentation for the chart endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartOptions {
    pub style: ChartStyle,
    pub theme: Theme,
}

impl ChartOptions {
    pub fn parse(style: Option<&str>, theme: Option<&str>) -> Result<Self, ApiError> {
        let style = match style {
            Some(raw) => raw.parse().map_err(ApiError::InvalidParameter)?,
            None => ChartStyle::default(),
        };
        let theme = match theme {
            Some(raw) => raw.parse().map_err(ApiError::InvalidParameter)?,
            None => Theme::default(),
        };
        Ok(Self { style, theme })
    }
}

/// Which series of the market chart document to plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Price,
    MarketCap,
}

impl ChartKind {
    fn field(&self) -> &'static str {
        match self {
            ChartKind::Price => "prices",
            ChartKind::MarketCap => "market_caps",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ChartKind::Price => "Price",
            ChartKind::MarketCap => "Market Cap",
        }
    }

    fn no_data_label(&self) -> &'static str {
        match self {
            ChartKind::Price => "price",
            ChartKind::MarketCap => "market cap",
        }
    }

    fn color(&self) -> Rgb {
        match self {
            ChartKind::Price => Rgb(0x00, 0xd8, 0xff),
            ChartKind::MarketCap => Rgb(0xff, 0x6b, 0x6b),
        }
    }
}

/// Answers each logical query by composing the cached client with the renderer.
pub struct MarketService {
    client: MarketDataClient,
    renderer: ChartRenderer,
    base_url: String,
    vs_currency: String,
}

impl MarketService {
    pub fn new(client: MarketDataClient, renderer: ChartRenderer) -> Self {
        Self {
            client,
            renderer,
            base_url: COINGECKO_BASE_URL.to_string(),
            vs_currency: DEFAULT_VS_CURRENCY.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_vs_currency(mut self, vs_currency: &str) -> Self {
        self.vs_currency = vs_currency.to_lowercase();
        self
    }

    pub async fn global_market_data(&self) -> Result<GlobalMarketData, ApiError> {
        let url = format!("{}/global", self.base_url);
        let json = self.client.fetch(&url, Some("global")).await?;

        let data = json.get("data");
        let usd = |field: &str| {
            data.and_then(|d| d.get(field))
                .and_then(|v| v.get("usd"))
                .and_then(Value::as_f64)
                .unwrap_or(0.0)
        };

        Ok(GlobalMarketData {
            total_market_cap_usd: usd("total_market_cap"),
            total_24h_volume_usd: usd("total_volume"),
        })
    }

    pub async fn trending_coins(&self) -> Result<TrendingCoins, ApiError> {
        let url = format!("{}/search/trending", self.base_url);
        let json = self.client.fetch(&url, Some("trending")).await?;

        let trending_coins = json
            .get("coins")
            .and_then(Value::as_array)
            .map(|coins| {
                coins
                    .iter()
                    .map(|entry| {
                        let item = entry.get("item");
                        TrendingCoin {
                            id: str_at(item, "id"),
                            name: str_at(item, "name"),
                            symbol: str_at(item, "symbol"),
                            market_cap_rank: item
                                .and_then(|i| i.get("market_cap_rank"))
                                .and_then(Value::as_u64),
                            large_image: str_at(item, "large"),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(TrendingCoins { trending_coins })
    }

    pub async fn coin_details(&self, coin_id: &str) -> Result<CoinDetails, ApiError> {
        validate_coin_id(coin_id)?;

        let url = format!(
            "{}/coins/{}?localization=false&tickers=false&market_data=false&community_data=false&developer_data=false&sparkline=false",
            self.base_url, coin_id
        );
        let key = format!("coin_details:{}", coin_id);
        let json = self.client.fetch(&url, Some(&key)).await?;
        let root = Some(&json);

        let homepage = json
            .get("links")
            .and_then(|l| l.get("homepage"))
            .and_then(Value::as_array)
            .and_then(|pages| pages.first())
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string();

        let description = json
            .get("description")
            .and_then(|d| d.get("en"))
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string();

        let image = json.get("image");

        Ok(CoinDetails {
            id: str_at(root, "id"),
            symbol: str_at(root, "symbol").unwrap_or_default().to_uppercase(),
            name: str_at(root, "name"),
            description,
            homepage,
            asset_platform_id: str_at(root, "asset_platform_id"),
            image_thumb: str_at(image, "thumb"),
            image_small: str_at(image, "small"),
            image_large: str_at(image, "large"),
            market_cap_rank: json.get("market_cap_rank").and_then(Value::as_u64),
        })
    }

    pub async fn price_chart(
        &self,
        coin_id: &str,
        days: &str,
        options: ChartOptions,
    ) -> Result<ChartImage, ApiError> {
        self.chart(ChartKind::Price, coin_id, days, options).await
    }

    pub async fn market_cap_chart(
        &self,
        coin_id: &str,
        days: &str,
        options: ChartOptions,
    ) -> Result<ChartImage, ApiError> {
        self.chart(ChartKind::MarketCap, coin_id, days, options).await
    }

    async fn chart(
        &self,
        kind: ChartKind,
        coin_id: &str,
        days: &str,
        options: ChartOptions,
    ) -> Result<ChartImage, ApiError> {
        let days: ChartDays = days.parse().map_err(ApiError::InvalidParameter)?;
        validate_coin_id(coin_id)?;

        // Price and market cap charts read the same upstream document.
        let url = format!(
            "{}/coins/{}/market_chart?vs_currency={}&days={}",
            self.base_url, coin_id, self.vs_currency, days
        );
        let key = format!("market_chart:{}:{}:{}", coin_id, days, self.vs_currency);
        let json = self.client.fetch(&url, Some(&key)).await?;

        let points = match json.get(kind.field()) {
            Some(series) if !series.is_null() => parse_series(series)?,
            _ => Vec::new(),
        };
        if points.is_empty() {
            let window = match days {
                ChartDays::Max => "all time".to_string(),
                other => format!("the last {} days", other),
            };
            return Err(ApiError::NoDataAvailable(format!(
                "No {} data available for {} for {}.",
                kind.no_data_label(),
                coin_id,
                window
            )));
        }
        debug!("Parsed {} {} points for {}", points.len(), kind.field(), coin_id);

        let period = match days {
            ChartDays::Max => "All Time".to_string(),
            other => format!("{} Days", other),
        };
        let request = ChartRequest {
            points,
            style: options.style,
            theme: options.theme,
            title: format!("{} {} Chart ({})", capitalize(coin_id), kind.label(), period),
            y_label: format!("{} ({})", kind.label(), self.vs_currency.to_uppercase()),
            line_color: kind.color(),
        };

        let renderer = self.renderer.clone();
        let rendered = tokio::task::spawn_blocking(move || renderer.render_chart(&request))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;

        info!(
            "Rendered {} {} chart for {} ({} days, {} points)",
            options.style.as_str(),
            kind.no_data_label(),
            coin_id,
            days,
            rendered.points_plotted
        );

        Ok(ChartImage {
            chart: STANDARD.encode(&rendered.png),
        })
    }
}

/// CoinGecko ids are lowercase slugs; anything outside this alphabet would
/// change the shape of the upstream URL.
pub fn validate_coin_id(coin_id: &str) -> Result<(), ApiError> {
    let valid = !coin_id.is_empty()
        && coin_id.len() <= MAX_COIN_ID_LEN
        && !coin_id.starts_with('.')
        && coin_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(ApiError::InvalidParameter(format!("Invalid coin id '{}'.", coin_id)))
    }
}

fn str_at(value: Option<&Value>, field: &str) -> Option<String> {
    value
        .and_then(|v| v.get(field))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
