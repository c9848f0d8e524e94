//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Install the log sink and the optional metrics exporter
//! - Bind the listener and serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error ends the process before traffic is served
//! - A bind failure has its own exit code so supervisors can tell it apart

use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{load_config, ConfigError, ProxyConfig};
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::{logging, metrics};

/// Exit code used when the listener cannot bind.
pub const EXIT_BIND_FAILURE: u8 = 100;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] logging::LoggingError),

    #[error("failed to build server: {0}")]
    Server(#[from] ServerError),

    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl StartupError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Bind { .. } => EXIT_BIND_FAILURE,
            _ => 1,
        }
    }
}

/// Load the configuration file and install logging.
pub fn init(config_path: &Path) -> Result<ProxyConfig, StartupError> {
    let config = load_config(config_path)?;
    logging::init(&config)?;

    tracing::info!(
        path = %config_path.display(),
        pattern = %config.pattern,
        port = config.port,
        upstream = %config.upstream,
        debug = config.debug,
        "Configuration loaded"
    );
    Ok(config)
}

/// Start the metrics exporter (if enabled), bind, and serve until shutdown.
pub async fn serve(config: ProxyConfig) -> Result<(), StartupError> {
    if config.metrics.enabled {
        match config.metrics.address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.metrics.address,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let server = HttpServer::new(config)?;
    let addr = server.config().bind_address();

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    tracing::info!(address = %addr, "Listening for connections");

    server
        .run(listener, shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}
