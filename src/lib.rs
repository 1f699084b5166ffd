pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used items
pub use config::AppConfig;
pub use error::{ApiError, FetchError, RenderError};
pub use services::market_service::MarketService;
pub use state::AppState;
