use coin_charts::routes::{self, ROUTES};
use coin_charts::utils::display::DisplayFormatter;
use coin_charts::{AppConfig, AppState};
use std::error::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting coin chart service");

    let config = AppConfig::from_env();
    let state = AppState::new(config.clone())?;
    let _sweeper = state.spawn_cache_sweeper(config.sweep_interval);

    println!(
        "{}",
        DisplayFormatter::new().format_startup_banner(&config, ROUTES)
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    info!("Listening on http://{}", config.listen_addr());

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl-C");
    }
}
