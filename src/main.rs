//! HTTP entry point for the archived-feeds API.
//!
//! Serves the legacy archived_feeds.txt CSV generated from MobilityDatabase
//! dataset metadata.

use anyhow::Result;
use archived_feeds_api::auth::TokenCache;
use archived_feeds_api::config::Config;
use archived_feeds_api::registry::RegistryClient;
use archived_feeds_api::server::{AppState, build_router};
use clap::Parser;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "archived-feeds-api")]
#[command(about = "Serves archived_feeds.txt generated from MobilityDatabase", long_about = None)]
struct Cli {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/archived_feeds_api.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("archived_feeds_api.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    if config.refresh_token.is_none() {
        warn!("MOBILITY_DB_REFRESH_TOKEN not set; registry calls will be unauthenticated");
    }

    let registry = RegistryClient::new(
        config.api_base.clone(),
        config.refresh_token.clone(),
        TokenCache::new(config.token_endpoint.clone()),
    );
    let state = AppState {
        registry: Arc::new(registry),
    };

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "archived-feeds-api listening");

    axum::serve(listener, build_router(state)).await?;

    Ok(())
}
