//! jsh-server binary
//!
//! Serves the resources declared in its configuration as JSON:API endpoints,
//! each backed by an in-memory store.
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! jsh-server --config jsh.yaml
//!
//! # Print the route tree and exit
//! jsh-server --config jsh.yaml --print-routes
//!
//! # With environment variables only
//! JSH_SERVER__PORT=9090 jsh-server
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::signal;
use tracing::{error, info, Level};

use jsh_api::{init_logging, LoggingConfig};
use jsh_server::{app, build_api, ServerConfig};

/// jsh-server - JSON:API resources over in-memory storage
#[derive(Parser, Debug)]
#[command(name = "jsh-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the route tree and exit
    #[arg(long)]
    print_routes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::from_env()?,
    };

    if args.print_routes {
        let api = build_api(&config)?;
        println!("{}", api.route_tree());
        return Ok(());
    }

    init_logging(LoggingConfig {
        json_format: config.logging.json,
        default_level: parse_log_level(&config.logging.level),
    });

    info!(version = env!("CARGO_PKG_VERSION"), "Starting jsh server");

    let api = build_api(&config)?;
    for line in api.route_tree().lines() {
        info!(route = %line, "route");
    }

    let addr: SocketAddr = config.bind_address().parse()?;
    run_http_server(app(&api), addr).await
}

/// Run the HTTP server until a shutdown signal arrives.
async fn run_http_server(router: axum::Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

/// Parse log level from string.
fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
