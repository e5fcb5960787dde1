//! Liveness, readiness and per-component probes over the store and its
//! snapshot file.

use crate::error::ERROR_METRICS;
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

/// Health status for a component or the overall system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is functioning but with degraded performance or partial failures
    Degraded,
    /// Component is not functioning
    Unhealthy,
}

impl HealthStatus {
    /// Returns the HTTP status code for this health status
    pub fn status_code(&self) -> StatusCode {
        match self {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Degraded => StatusCode::OK, // Still serve traffic but indicate degradation
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Combines two health statuses, returning the worse of the two
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        }
    }
}

/// Result of checking one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub component: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn new(component: impl Into<String>, status: HealthStatus, error: Option<String>) -> Self {
        Self {
            component: component.into(),
            status,
            error,
            timestamp: Self::now(),
            details: None,
        }
    }

    pub fn healthy(component: impl Into<String>) -> Self {
        Self::new(component, HealthStatus::Healthy, None)
    }

    pub fn degraded(component: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(component, HealthStatus::Degraded, Some(error.into()))
    }

    pub fn unhealthy(component: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(component, HealthStatus::Unhealthy, Some(error.into()))
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}

/// Overall health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall health status
    pub status: HealthStatus,
    /// Timestamp of the check
    pub timestamp: i64,
    /// Server version
    pub version: String,
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        let status = self.status.status_code();
        (status, Json(self)).into_response()
    }
}

/// Readiness check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Readiness status
    pub ready: bool,
    /// Overall health status
    pub status: HealthStatus,
    /// Timestamp of the check
    pub timestamp: i64,
    /// Components that are not ready
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not_ready: Vec<String>,
}

impl IntoResponse for ReadinessResponse {
    fn into_response(self) -> Response {
        let status = if self.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (status, Json(self)).into_response()
    }
}

/// Detailed component health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthResponse {
    /// Overall health status
    pub status: HealthStatus,
    /// Timestamp of the check
    pub timestamp: i64,
    /// Individual component health checks
    pub components: HashMap<String, ComponentHealth>,
}

impl IntoResponse for ComponentHealthResponse {
    fn into_response(self) -> Response {
        let status = self.status.status_code();
        (status, Json(self)).into_response()
    }
}

/// Main health checker coordinator
#[derive(Clone)]
pub struct HealthChecker {
    state: Arc<AppState>,
}

impl HealthChecker {
    /// Creates a new health checker
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Performs a liveness check - returns healthy if server is running
    pub fn liveness(&self) -> HealthResponse {
        HealthResponse {
            status: HealthStatus::Healthy,
            timestamp: Self::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Performs a readiness check - returns ready if server can accept requests
    pub fn readiness(&self) -> ReadinessResponse {
        let components = self.check_all_components();
        let mut overall = HealthStatus::Healthy;
        let mut not_ready = Vec::new();

        for (name, health) in &components {
            overall = overall.combine(health.status);
            if health.status == HealthStatus::Unhealthy {
                not_ready.push(name.clone());
            }
        }
        not_ready.sort();

        ReadinessResponse {
            ready: overall != HealthStatus::Unhealthy,
            status: overall,
            timestamp: Self::now(),
            not_ready,
        }
    }

    /// Performs detailed component health checks
    pub fn components(&self) -> ComponentHealthResponse {
        let components = self.check_all_components();
        let overall = components
            .values()
            .fold(HealthStatus::Healthy, |overall, health| overall.combine(health.status));

        ComponentHealthResponse {
            status: overall,
            timestamp: Self::now(),
            components,
        }
    }

    fn check_all_components(&self) -> HashMap<String, ComponentHealth> {
        let mut components = HashMap::new();
        components.insert("store".to_string(), self.check_store());
        components.insert("snapshot".to_string(), self.check_snapshot());
        components.insert("errors".to_string(), self.check_error_rate());
        components
    }

    /// Reports table sizes.
    fn check_store(&self) -> ComponentHealth {
        let counts = self.state.store().read(|tables| tables.counts());
        let total: usize = counts.values().sum();
        let details = serde_json::json!({
            "tables": counts,
            "records": total,
        });
        ComponentHealth::healthy("store").with_details(details)
    }

    /// Checks that the snapshot file (if any) can be written.
    fn check_snapshot(&self) -> ComponentHealth {
        let Some(path) = self.state.store().snapshot_path() else {
            return ComponentHealth::healthy("snapshot")
                .with_details(serde_json::json!({ "persistent": false }));
        };

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        match fs::metadata(directory) {
            Ok(metadata) if metadata.is_dir() && !metadata.permissions().readonly() => {
                let details = serde_json::json!({
                    "persistent": true,
                    "path": path.display().to_string(),
                    "exists": path.exists(),
                });
                ComponentHealth::healthy("snapshot").with_details(details)
            }
            Ok(_) => ComponentHealth::unhealthy(
                "snapshot",
                format!("snapshot directory is not writable: {}", directory.display()),
            ),
            Err(e) => ComponentHealth::unhealthy(
                "snapshot",
                format!(
                    "snapshot directory is not accessible: {} ({})",
                    directory.display(),
                    e
                ),
            ),
        }
    }

    /// Degraded while the most recent snapshot write has failed.
    fn check_error_rate(&self) -> ComponentHealth {
        let stats = ERROR_METRICS.get_stats();
        let writes = self.state.store().snapshot_writes();
        let details = serde_json::json!({
            "by_category": stats.category_counts,
            "storage_failures": writes.failures,
            "last_write_failed": writes.last_failed,
        });

        if writes.last_failed {
            ComponentHealth::degraded("errors", "last snapshot write failed").with_details(details)
        } else {
            ComponentHealth::healthy("errors").with_details(details)
        }
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}

/// Axum handler for liveness endpoint
pub async fn liveness_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    checker.liveness()
}

/// Axum handler for readiness endpoint
pub async fn readiness_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    checker.readiness()
}

/// Axum handler for components endpoint
pub async fn components_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    checker.components()
}
