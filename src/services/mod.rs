pub mod chart_renderer;
pub mod market_service;

pub use chart_renderer::{ChartRenderer, RenderedChart};
pub use market_service::{ChartOptions, MarketService};
