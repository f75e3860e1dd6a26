mod analytics;
mod charts;
mod config;
mod errors;
mod feeds;
mod pipeline;
mod server;
mod state;

use crate::feeds::yahoo::YahooClient;
use crate::state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("capm dashboard starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        benchmark = %cfg.benchmark_symbol,
        risk_free = %cfg.risk_free_symbol,
        max_tickers = cfg.max_tickers,
        dashboard_dir = %cfg.dashboard_dir.display(),
        "configuration loaded"
    );

    let yahoo = YahooClient::new(&cfg.yahoo_base_url, cfg.http_timeout_secs);
    let port = cfg.server_port;
    let app_state = AppState::new(cfg, Arc::new(yahoo));

    let app = server::routes::router(app_state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}
