//! Startup helpers for the chat server and the handler relay.

use std::process::ExitCode;

use crate::config::AppConfig;
use crate::relay::{self, RelayState};
use crate::server::{self, AppState};

/// Run the chat server (used by the `synapse` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();
    tracing::info!("Starting Synapse chat v{}", env!("CARGO_PKG_VERSION"));

    let Some(config) = load_config() else {
        return ExitCode::from(1);
    };
    tracing::info!("Decision layer: {} ({})", config.llm.base_url, config.llm.model);
    tracing::info!("Handler transport: {:?}", config.handlers.transport);

    let port = config.server.port;
    let state = AppState::new(config);

    block_on(server::run_server_with_shutdown(state, port, shutdown_signal()))
}

/// Run the handler relay (used by the `synapse-relay` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run_relay() -> ExitCode {
    init_tracing();
    tracing::info!("Starting Synapse relay v{}", env!("CARGO_PKG_VERSION"));

    let Some(config) = load_config() else {
        return ExitCode::from(1);
    };
    for capability in crate::capability::Capability::ALL {
        tracing::info!("{capability} handler: {}", config.handlers.command(capability).program);
    }

    let state = RelayState::from_config(&config.handlers);
    block_on(relay::run_relay_with_shutdown(state, config.server.relay_port, shutdown_signal()))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
}

fn load_config() -> Option<AppConfig> {
    match AppConfig::from_env() {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            None
        }
    }
}

fn block_on<F>(server: F) -> ExitCode
where
    F: std::future::Future<Output = Result<(), Box<dyn std::error::Error + Send + Sync>>>,
{
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Shut down cleanly");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
