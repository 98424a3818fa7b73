//! HTTP server configuration and startup

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::{routes, AppState, API_VERSION, DEFAULT_PORT};

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;

/// Where the API listens and how long a request may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub port: u16,

    /// IP address to bind to. Host names are not resolved.
    pub host: String,

    /// Requests running longer than this are answered with 408.
    pub request_timeout: Duration,
}

impl ApiConfig {
    /// The socket address built from `host` and `port`.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not an IP address.
    pub fn bind_address(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("'{}' is not an IP address", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: "0.0.0.0".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Serves the template library API until a shutdown signal arrives.
pub struct ApiServer {
    config: ApiConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// The router with every route and layer, as served by [`ApiServer::serve`].
    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone(), self.config.request_timeout)
    }

    /// Binds the listener and serves requests.
    ///
    /// Returns once CTRL+C or SIGTERM was received and in-flight requests have finished.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound, or if serving fails.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = self.config.bind_address()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        info!(
            address = %addr,
            api_version = API_VERSION,
            request_timeout_secs = self.config.request_timeout.as_secs(),
            "Template library API listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Template library API stopped with an error")?;

        info!("Template library API shut down");
        Ok(())
    }
}

/// Resolves on CTRL+C, or SIGTERM on Unix.
///
/// A handler that cannot be installed is logged and never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!(signal = "SIGINT", "Shutting down"),
            Err(err) => {
                error!(error = %err, "Failed to listen for CTRL+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!(signal = "SIGTERM", "Shutting down");
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
