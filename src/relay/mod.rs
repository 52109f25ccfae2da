//! Handler relay: HTTP front for the handler programs.
//!
//! Exposes `POST /get_mail`, `POST /get_calendar` and `POST /web_search`,
//! each running the configured handler through a [`ProcessPort`].

pub mod routes;

pub use routes::{RelayState, create_relay_router};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::adapter::ProcessPort;
use crate::config::HandlerConfig;
use crate::server::with_http_layers;

impl RelayState {
    /// Relay state running the handler programs of `config`.
    #[must_use]
    pub fn from_config(config: &HandlerConfig) -> Arc<Self> {
        Arc::new(Self {
            port: Arc::new(ProcessPort::from_config(config)),
            timeout: config.timeout,
        })
    }
}

/// Start the relay with graceful shutdown support.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn run_relay_with_shutdown<F>(
    state: Arc<RelayState>,
    port: u16,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = with_http_layers(create_relay_router(state));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Synapse relay listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}
