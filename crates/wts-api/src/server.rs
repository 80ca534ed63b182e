//! Binding the turn API to a socket.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use wts_core::config::InfrastructureConfig;

use crate::router::build_router;
use crate::state::AppState;

/// Where the turn API listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind, e.g. `0.0.0.0`.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl ServerConfig {
    /// Take `api_host` and `api_port` from the infrastructure section.
    pub fn from_infrastructure(infra: &InfrastructureConfig) -> Self {
        Self {
            host: infra.api_host.clone(),
            port: infra.api_port,
        }
    }

    /// Resolve the configured host and port into a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the host is not an IP literal.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse()
            .map_err(|e| ServerError::Bind(format!("{raw} is not an address: {e}")))
    }
}

/// Serve the turn API until the listener fails.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is invalid or taken and
/// [`ServerError::Serve`] on a fatal I/O error while serving.
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("{addr}: {e}")))?;

    tracing::info!(%addr, "Turn API listening");
    axum::serve(listener, build_router(state))
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))
}

/// Failure to start or keep serving the turn API.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listen address was invalid or could not be bound.
    #[error("cannot bind turn API: {0}")]
    Bind(String),

    /// The accept loop stopped with an error.
    #[error("turn API stopped: {0}")]
    Serve(String),
}
