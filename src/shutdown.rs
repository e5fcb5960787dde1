//! Graceful shutdown coordination.
//!
//! On SIGINT or SIGTERM the coordinator walks through its phases:
//!
//! 1. **Stop Accepting** - cancel the shutdown token so the HTTP listener
//!    stops taking connections
//! 2. **Wait for In-Flight** - let active operations finish, up to a deadline
//! 3. **Flush** - hand over to the registered [`ShutdownHandler`], which
//!    writes the store snapshot
//!
//! The whole sequence is bounded by [`ShutdownConfig::total_timeout`].
//!
//! ```rust,no_run
//! use meal_timetable::shutdown::{ShutdownConfig, ShutdownCoordinator};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let coordinator = ShutdownCoordinator::new(ShutdownConfig::default());
//! let token = coordinator.token();
//!
//! tokio::spawn(async move {
//!     token.cancelled().await;
//!     // stop serving
//! });
//!
//! coordinator.wait_for_signal().await;
//! coordinator.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Pause after cancelling the token so the listener can stop accepting
    pub stop_accepting_timeout: Duration,

    /// How long to wait for in-flight operations
    pub in_flight_timeout: Duration,

    /// How long the flush phase may take
    pub flush_timeout: Duration,

    /// Upper bound on the whole sequence
    pub total_timeout: Duration,

    /// Report success with phase `Forced` instead of an error on timeout
    pub force_shutdown_on_timeout: bool,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            stop_accepting_timeout: Duration::from_millis(250),
            in_flight_timeout: Duration::from_secs(30),
            flush_timeout: Duration::from_secs(5),
            total_timeout: Duration::from_secs(45),
            force_shutdown_on_timeout: true,
        }
    }
}

impl ShutdownConfig {
    /// Derives every phase budget from the configured overall timeout.
    pub fn from_timeout_secs(timeout_secs: u64) -> Self {
        Self::default()
            .with_in_flight_timeout(timeout_secs)
            .with_total_timeout(timeout_secs.saturating_add(15))
    }

    pub fn with_total_timeout(mut self, timeout_secs: u64) -> Self {
        self.total_timeout = Duration::from_secs(timeout_secs);
        self
    }

    pub fn with_in_flight_timeout(mut self, timeout_secs: u64) -> Self {
        self.in_flight_timeout = Duration::from_secs(timeout_secs);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    StopAccepting,
    WaitingInFlight,
    Flushing,
    Complete,
    /// Sequence failed or ran out of time
    Forced,
}

impl std::fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownPhase::Running => write!(f, "running"),
            ShutdownPhase::StopAccepting => write!(f, "stop_accepting"),
            ShutdownPhase::WaitingInFlight => write!(f, "waiting_in_flight"),
            ShutdownPhase::Flushing => write!(f, "flushing"),
            ShutdownPhase::Complete => write!(f, "complete"),
            ShutdownPhase::Forced => write!(f, "forced"),
        }
    }
}

/// Coordinates graceful shutdown of the listener and the store.
pub struct ShutdownCoordinator {
    config: ShutdownConfig,
    phase: Arc<RwLock<ShutdownPhase>>,
    shutdown_token: CancellationToken,
    shutdown_complete: Arc<Notify>,
    active_requests: Arc<AtomicU64>,
    handler: Option<Arc<dyn ShutdownHandler>>,
}

impl ShutdownCoordinator {
    pub fn new(config: ShutdownConfig) -> Self {
        Self {
            config,
            phase: Arc::new(RwLock::new(ShutdownPhase::Running)),
            shutdown_token: CancellationToken::new(),
            shutdown_complete: Arc::new(Notify::new()),
            active_requests: Arc::new(AtomicU64::new(0)),
            handler: None,
        }
    }

    /// Registers the component flushed during the flush phase.
    pub fn with_handler(mut self, handler: Arc<dyn ShutdownHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Token cancelled when shutdown begins
    pub fn token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub async fn phase(&self) -> ShutdownPhase {
        *self.phase.read().await
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    pub fn request_started(&self) {
        self.active_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_finished(&self) {
        self.active_requests.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn active_request_count(&self) -> u64 {
        self.active_requests.load(Ordering::Relaxed)
    }

    /// Waits for SIGINT or SIGTERM.
    ///
    /// A signal source that cannot be installed is logged and never fires.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to install Ctrl+C handler: {}", e);
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
                    error!("failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("received SIGINT (Ctrl+C), initiating graceful shutdown");
            },
            _ = terminate => {
                info!("received SIGTERM, initiating graceful shutdown");
            },
        }
    }

    /// Runs every phase within the total timeout.
    pub async fn shutdown(&self) -> Result<()> {
        info!("starting graceful shutdown sequence");

        let shutdown_result = if self.config.total_timeout > Duration::ZERO {
            timeout(self.config.total_timeout, self.run_shutdown_phases())
                .await
                .unwrap_or_else(|_| {
                    error!(
                        timeout_secs = self.config.total_timeout.as_secs(),
                        "graceful shutdown exceeded total timeout"
                    );
                    Err(anyhow::anyhow!("shutdown timeout exceeded"))
                })
        } else {
            self.run_shutdown_phases().await
        };

        match shutdown_result {
            Ok(()) => {
                info!("graceful shutdown completed successfully");
                *self.phase.write().await = ShutdownPhase::Complete;
                self.shutdown_complete.notify_waiters();
                Ok(())
            }
            Err(e) if self.config.force_shutdown_on_timeout => {
                warn!("graceful shutdown failed, forcing shutdown: {:#}", e);
                *self.phase.write().await = ShutdownPhase::Forced;
                self.shutdown_token.cancel();
                self.shutdown_complete.notify_waiters();
                Ok(())
            }
            Err(e) => {
                error!("graceful shutdown failed: {:#}", e);
                *self.phase.write().await = ShutdownPhase::Forced;
                self.shutdown_complete.notify_waiters();
                Err(e)
            }
        }
    }

    async fn run_shutdown_phases(&self) -> Result<()> {
        self.phase_stop_accepting().await;
        self.phase_wait_in_flight().await;
        self.phase_flush().await
    }

    async fn phase_stop_accepting(&self) {
        *self.phase.write().await = ShutdownPhase::StopAccepting;
        info!("shutdown phase 1: stopping acceptance of new requests");

        self.shutdown_token.cancel();
        sleep(self.config.stop_accepting_timeout).await;

        debug!("phase 1 complete: no longer accepting requests");
    }

    async fn phase_wait_in_flight(&self) {
        *self.phase.write().await = ShutdownPhase::WaitingInFlight;
        info!("shutdown phase 2: waiting for in-flight requests to complete");

        let deadline = tokio::time::Instant::now() + self.config.in_flight_timeout;

        loop {
            let active = self.active_request_count();
            if active == 0 {
                info!("all in-flight requests completed");
                break;
            }

            if tokio::time::Instant::now() >= deadline {
                warn!(
                    remaining_requests = active,
                    "in-flight timeout reached, proceeding with {} active requests", active
                );
                break;
            }

            debug!(active_requests = active, "waiting for requests to complete");
            sleep(Duration::from_millis(100)).await;
        }

        debug!("phase 2 complete: in-flight requests handled");
    }

    async fn phase_flush(&self) -> Result<()> {
        *self.phase.write().await = ShutdownPhase::Flushing;
        info!("shutdown phase 3: flushing store");

        let Some(handler) = &self.handler else {
            debug!("no shutdown handler registered");
            return Ok(());
        };

        timeout(self.config.flush_timeout, handler.shutdown())
            .await
            .context("flush timed out")??;

        debug!("phase 3 complete: store flushed");
        Ok(())
    }

    pub async fn wait_for_completion(&self) {
        self.shutdown_complete.notified().await;
    }
}

/// A component that must persist its state before the process exits.
#[async_trait::async_trait]
pub trait ShutdownHandler: Send + Sync {
    async fn shutdown(&self) -> Result<()>;

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Writes the record snapshot and logs the final table sizes.
pub struct StoreShutdownHandler {
    state: Arc<AppState>,
}

impl StoreShutdownHandler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[async_trait::async_trait]
impl ShutdownHandler for StoreShutdownHandler {
    async fn shutdown(&self) -> Result<()> {
        info!("shutting down store");
        self.flush().await?;

        let counts = self.state.store().read(|tables| tables.counts());
        info!(
            records = counts.values().sum::<usize>(),
            tables = ?counts,
            "store shutdown complete"
        );
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        let Some(path) = self.state.store().snapshot_path() else {
            debug!("store is in memory only, nothing to flush");
            return Ok(());
        };
        debug!(path = %path.display(), "flushing store snapshot");

        let state = self.state.clone();
        tokio::task::spawn_blocking(move || state.store().flush())
            .await
            .context("snapshot flush task failed")?
            .context("failed to write snapshot")?;
        Ok(())
    }
}
