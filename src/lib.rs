pub mod config;
pub mod domain;
pub mod error;
pub mod health;
pub mod logging;
pub mod mutation;
pub mod operations;
pub mod query;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod store;
pub mod validation;

pub use config::{CliArgs, ServerConfig};
pub use error::{ERROR_METRICS, ErrorCode, ErrorMetrics, ServiceError};
pub use logging::{LoggingConfig, init_logging};
pub use operations::{Operation, OperationRequest, OperationResponse};
pub use server::router;
pub use shutdown::{ShutdownConfig, ShutdownCoordinator};
pub use state::AppState;
pub use store::Store;

use anyhow::{Context, Result};
use shutdown::StoreShutdownHandler;
use std::sync::Arc;
use tokio::net::TcpListener;

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let config = Arc::new(config);
    let state = Arc::new(AppState::new(config.clone())?);

    let records: usize = state
        .store()
        .read(|tables| tables.counts().values().sum());
    tracing::info!(
        bind = %config.http_bind_address,
        data_file = ?config.data_file(),
        records,
        max_page_size = config.max_page_size,
        "starting meal timetable server",
    );

    let shutdown_config = ShutdownConfig::from_timeout_secs(config.graceful_shutdown_timeout_secs);
    let coordinator = Arc::new(
        ShutdownCoordinator::new(shutdown_config)
            .with_handler(Arc::new(StoreShutdownHandler::new(state.clone()))),
    );

    let app = server::router_with_shutdown(state, coordinator.clone());
    let listener = TcpListener::bind(config.http_bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.http_bind_address))?;
    let actual_addr = listener.local_addr()?;
    tracing::info!(transport = "http", bind = %actual_addr, path = server::API_PATH, "listening");

    let signal_coordinator = coordinator.clone();
    let shutdown_task = tokio::spawn(async move {
        signal_coordinator.wait_for_signal().await;
        signal_coordinator.shutdown().await
    });

    let token = coordinator.token();
    let server_result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await;

    if coordinator.is_shutdown_initiated() {
        tracing::info!("server stopped, waiting for shutdown sequence");
        shutdown_task
            .await
            .context("shutdown task panicked")?
            .context("graceful shutdown failed")?;
    } else {
        // Listener ended without a signal
        shutdown_task.abort();
        coordinator
            .shutdown()
            .await
            .context("graceful shutdown failed")?;
    }

    server_result.map_err(anyhow::Error::from)
}
