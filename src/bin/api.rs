//! MindBridge Analytics API Server
//!
//! Run with: cargo run --bin mindbridge-api
//!
//! # Configuration
//!
//! Read from `~/.config/mindbridge/config.toml`, `/etc/mindbridge/config.toml`
//! or `./config.toml`, whichever exists first. Environment variables override:
//! - `MINDBRIDGE_API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `MINDBRIDGE_API_PORT`: Port to listen on (default: 8090)
//! - `MINDBRIDGE_TREND_EPSILON`: Stable-trend band (default: 0.5)
//! - `MINDBRIDGE_UTC_OFFSET_MINUTES`: Offset used to determine "today"
//! - `MINDBRIDGE_QUALITY_THRESHOLD`: Minimum passive reading quality (default: 0.3)
//! - `MINDBRIDGE_LOG_LEVEL`, `MINDBRIDGE_LOG_FORMAT`: Logging (default: info, pretty)
//! - `RUST_LOG`: Overrides the log filter entirely

use mindbridge_analytics::api::{serve, AppState};
use mindbridge_analytics::config::Config;
use mindbridge_analytics::logging::init_logging;
use mindbridge_analytics::service::AnalyticsService;
use mindbridge_analytics::store::MemoryStore;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();
    init_logging(&config.logging)?;

    tracing::info!("Starting MindBridge analytics API v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        epsilon = config.analytics.trend_epsilon,
        quality_threshold = config.aggregation.quality_threshold,
        max_batch_size = config.ingest.max_batch_size,
        "Analytics engine configured"
    );

    let store = Arc::new(MemoryStore::new());
    let service = AnalyticsService::new(store, config.clone());
    let state = AppState::new(service, config.api.clone());

    serve(state, &config.api).await?;

    Ok(())
}
