//! riskreg-ingest - Risk Register Ingest Service
//!
//! Serves the `/process` ingestion endpoint and the dashboard API, and runs
//! one transcript folder watcher per `[[watchers]]` config entry.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use riskreg_common::config::{load_config, resolve_root_folder};
use riskreg_common::ProjectRegistry;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use riskreg_ingest::api::health::BuildInfo;
use riskreg_ingest::extraction::AnthropicExtractor;
use riskreg_ingest::watcher::TranscriptWatcher;
use riskreg_ingest::{AppState, Reconciler};

/// Command-line arguments for riskreg-ingest
#[derive(Parser, Debug)]
#[command(name = "riskreg-ingest")]
#[command(about = "Risk register ingest service")]
#[command(version)]
struct Args {
    /// Config file (overrides RISKREG_CONFIG and the default location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder containing Risk_Registers/
    #[arg(short, long, env = "RISKREG_ROOT")]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides [server] port)
    #[arg(short, long, env = "RISKREG_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("riskreg_ingest={},tower_http=info", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let build = BuildInfo::CURRENT;
    info!(
        "Starting riskreg-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        build.commit,
        build.built_at,
        build.profile
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    let registry = ProjectRegistry::new(&root_folder);
    info!("Register folder: {}", registry.register_dir().display());

    let projects = registry.list_projects()?;
    if projects.is_empty() {
        warn!("No Risk Registers found; provision one with `process-transcript --provision <CODE>`");
    } else {
        info!("Projects: {}", projects.join(", "));
    }

    let api_key = riskreg_ingest::config::resolve_api_key(&config)?;
    let extractor = AnthropicExtractor::new(&config.model, api_key)
        .context("Failed to initialize model client")?;

    let reconciler = Arc::new(
        Reconciler::new(registry, Arc::new(extractor))
            .with_serialized_writes(config.register.serialize_writes),
    );

    let mut watcher_tasks = Vec::new();
    for watcher_config in &config.watchers {
        let watcher = TranscriptWatcher::from_config(watcher_config);
        watcher_tasks.push(tokio::spawn(watcher.run(Arc::clone(&reconciler))));
    }

    let app = riskreg_ingest::build_router(AppState::new(reconciler));

    let addr = format!(
        "{}:{}",
        config.server.host,
        args.port.unwrap_or(config.server.port)
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    for task in watcher_tasks {
        task.abort();
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
