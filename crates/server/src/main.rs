use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubefetch_core::{load_config, validate_config, InnertubeClient, VideoSearch};
use tubefetch_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("TUBEFETCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Download directory: {:?}", config.downloads.dir);
    info!("Extraction tool: {:?}", config.tool.path);

    tokio::fs::create_dir_all(&config.downloads.dir)
        .await
        .with_context(|| format!("Failed to create {:?}", config.downloads.dir))?;

    let search: Arc<dyn VideoSearch> = Arc::new(
        InnertubeClient::new(&config.search).context("Failed to create search client")?,
    );
    info!("Using search API at {}", config.search.base_url);

    let state = Arc::new(AppState::new(config.clone(), search));

    // Files left over from a previous run still expire
    let restored = state.artifacts().scan_existing().await;
    info!(
        "Scheduled eviction for {} existing file(s), ttl {:?}",
        restored,
        state.artifacts().ttl()
    );

    let app = create_router(Arc::clone(&state));

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    let running = state.jobs().running_jobs();
    if !running.is_empty() {
        warn!(
            "{} download(s) still running; their output stays in {:?}",
            running.len(),
            config.downloads.dir
        );
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
