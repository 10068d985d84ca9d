//! Domofix request gate.
//!
//! ```text
//!     Client ──▶ request id ─▶ timeout ─▶ body limit ─▶ gate ─┬─▶ /healthz
//!                                                              ├─▶ /api/* (DTO validation) ─┐
//!                                                              └─▶ fallback ────────────────┴─▶ upstream
//!
//!     admin listener ─▶ /admin/{status,audit,limiter}
//!     metrics listener ─▶ Prometheus scrape
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use domofix_gate::admin::{setup_admin_router, AdminState};
use domofix_gate::config::loader::{apply_env_overrides, load_config};
use domofix_gate::config::validation::validate_config;
use domofix_gate::config::watcher::ConfigWatcher;
use domofix_gate::config::GateConfig;
use domofix_gate::lifecycle::{wait_for_signal, Shutdown};
use domofix_gate::observability::{logging, metrics};
use domofix_gate::HttpServer;

#[derive(Parser)]
#[command(name = "domofix-gate")]
#[command(about = "Authentication gate and request validator for the Domofix marketplace", long_about = None)]
struct Args {
    /// Path to the TOML config file. Defaults are used when omitted.
    #[arg(short, long, env = "GATE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = GateConfig::default();
            apply_env_overrides(&mut config);
            validate_config(&config).map_err(domofix_gate::config::loader::ConfigError::Validation)?;
            config
        }
    };

    logging::init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "domofix-gate starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        public_paths = config.gate.public_paths.len(),
        rate_limit = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        audit_mode = ?config.audit.mode,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();

    // Hot reload only when a file was given
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config.clone())?;

    if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
        let app = setup_admin_router(AdminState::new(server.gate(), &config.admin.api_key));
        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let result = axum::serve(admin_listener, app)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        });
    }

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
