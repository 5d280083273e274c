//! Recordings gateway -- JSON API over an object-storage bucket.
//!
//! Stateless: the bucket is the only source of truth, so every startup is
//! a fresh start.  SIGTERM/SIGINT stop accepting connections and wait for
//! in-flight requests up to `server.shutdown_timeout`.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use recordings_console::config::Config;
use recordings_console::gateway::Gateway;
use recordings_console::storage::aws::AwsBackend;
use recordings_console::storage::backend::StorageBackend;
use recordings_console::storage::memory::MemoryBackend;

/// Command-line arguments for the gateway.
#[derive(Parser, Debug)]
#[command(
    name = "recordings-gateway",
    version,
    about = "JSON gateway for listing, playing, renaming and deleting recordings"
)]
struct Cli {
    /// Path to a YAML configuration file. Environment variables override it.
    #[arg(short, long)]
    config: Option<String>,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = recordings_console::config::resolve_config(cli.config.as_deref())?;
    recordings_console::telemetry::init_tracing(&config.logging);
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path);
    }

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    if config.observability.metrics {
        recordings_console::metrics::init_metrics()?;
        recordings_console::metrics::describe_metrics();
        info!("Prometheus metrics initialized");
    }

    let (storage, blobs) = build_storage(&config).await?;

    let state = Arc::new(recordings_console::AppState {
        config: config.clone(),
        gateway: Gateway::new(storage),
        blobs,
    });

    let app = recordings_console::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Recordings gateway listening on {}", bind_addr);

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    tokio::select! {
        result = server => result?,
        _ = drain_deadline(shutdown_timeout) => {
            warn!("In-flight requests still running after {:?}; exiting", shutdown_timeout);
        }
    }

    info!("Recordings gateway shut down");

    Ok(())
}

/// Select the storage backend named by `storage.backend`.
async fn build_storage(
    config: &Config,
) -> anyhow::Result<(Arc<dyn StorageBackend>, Option<Arc<MemoryBackend>>)> {
    match config.storage.backend.as_str() {
        "memory" => {
            let memory = &config.storage.memory;
            let mut backend = MemoryBackend::new(&memory.public_url, &memory.signing_secret);
            if !memory.seed_dir.is_empty() {
                let loaded = backend.seed_from_dir(&memory.seed_dir)?;
                info!("Seeded {} recordings from {}", loaded, memory.seed_dir);
            }
            if memory.signing_secret.is_empty() {
                warn!("No storage.memory.signing_secret set; links will not survive a restart");
            }
            info!(
                "Memory storage backend initialized, links issued against {}",
                memory.public_url
            );
            let backend = Arc::new(backend);
            let storage: Arc<dyn StorageBackend> = backend.clone();
            Ok((storage, Some(backend)))
        }
        _ => {
            let storage: Arc<dyn StorageBackend> =
                Arc::new(AwsBackend::new(&config.storage.aws).await?);
            Ok((storage, None))
        }
    }
}

/// Resolves `timeout` after a shutdown signal arrives; never resolves
/// before one.
async fn drain_deadline(timeout: Duration) {
    shutdown_signal().await;
    tokio::time::sleep(timeout).await;
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
