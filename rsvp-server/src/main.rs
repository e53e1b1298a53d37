//! rsvp-server - RSVP submission persistence service
//!
//! Accepts `POST /submit-rsvp` multipart submissions, writes passport images to
//! the image folder and appends one row per guest to the guest store.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use rsvp_server::config::{ServerConfig, CONFIG_FILE_NAME};
use rsvp_server::persistence::PersistenceEngine;
use rsvp_server::store::GuestStore;
use rsvp_server::{build_router, AppState};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "rsvp-server")]
#[command(about = "RSVP submission persistence service")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "RSVP_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the guest store and passport images
    #[arg(short, long, env = "RSVP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "RSVP_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing so its log level can apply; the loader's
    // own messages are emitted once the subscriber exists
    let config_path = rsvp_common::config::find_config_file(args.config.as_deref(), CONFIG_FILE_NAME);
    let config_result: rsvp_common::Result<ServerConfig> =
        rsvp_common::config::load_toml_or_default(config_path.as_deref());
    let level = config_result
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    // Build identification immediately after tracing init
    info!(
        "Starting rsvp-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config = config_result.context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }

    // Resolve and create data folders
    let paths = config.data_paths(args.data_dir.as_deref());
    paths
        .ensure_directories()
        .with_context(|| format!("Failed to create {}", paths.data_dir.display()))?;
    info!("Guest store: {}", paths.store_path.display());
    info!("Image folder: {}", paths.image_dir.display());

    let store = GuestStore::new(&paths.store_path, config.retry_policy());
    let engine = PersistenceEngine::new(store, &paths.image_dir);
    let state = AppState::new(engine, config.upload_limits());
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("rsvp-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
