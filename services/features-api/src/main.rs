//! Features API Server
//!
//! OGC API - Features implementation with cursor-based pagination.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use features_api::build_router;
use features_api::config::ServerConfig;
use features_api::state::AppState;

/// Features API Server
#[derive(Parser, Debug)]
#[command(name = "features-api")]
#[command(about = "OGC API - Features server with cursor-based pagination")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8084", env = "FEATURES_LISTEN_ADDR")]
    listen: String,

    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml", env = "FEATURES_CONFIG")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "FEATURES_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .expect("Failed to create Tokio runtime");

    runtime.block_on(async move {
        run_server(args).await;
    });
}

async fn run_server(args: Args) {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    info!("Starting features API server");

    let config = match ServerConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize application state
    let state = match AppState::new(config).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    let app = build_router(state.clone());

    // Parse listen address
    let addr: SocketAddr = args.listen.parse().expect("Invalid listen address");

    info!("Features API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");

    info!("Shutting down, closing datasource");
    state.datasource.close().await;
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
}
