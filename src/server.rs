use crate::error::ServiceError;
use crate::health::{self, HealthChecker};
use crate::log_slow_operation;
use crate::operations::{Operation, OperationRequest, OperationResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{Request, State, rejection::JsonRejection},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

pub const API_PATH: &str = "/api";
pub const SCHEMA_PATH: &str = "/schema";

/// Operations slower than this are logged at warn level.
const SLOW_OPERATION_MS: u64 = 250;

/// Routes for the operation API, input schemas and health probes.
pub fn router(state: Arc<AppState>) -> Router {
    let health_checker = Arc::new(HealthChecker::new(state.clone()));

    let api = Router::new()
        .route(API_PATH, post(operation_handler))
        .route(SCHEMA_PATH, get(schema_handler))
        .with_state(state);

    let probes = Router::new()
        .route("/health", get(health::liveness_handler))
        .route("/ready", get(health::readiness_handler))
        .route("/health/components", get(health::components_handler))
        .with_state(health_checker);

    api.merge(probes)
}

/// [`router`] with every request counted as in flight by `coordinator`.
pub fn router_with_shutdown(state: Arc<AppState>, coordinator: Arc<ShutdownCoordinator>) -> Router {
    router(state).layer(middleware::from_fn_with_state(coordinator, track_in_flight))
}

async fn track_in_flight(
    State(coordinator): State<Arc<ShutdownCoordinator>>,
    request: Request,
    next: Next,
) -> Response {
    coordinator.request_started();
    let response = next.run(request).await;
    coordinator.request_finished();
    response
}

async fn operation_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<OperationRequest>, JsonRejection>,
) -> Result<Json<OperationResponse>, ServiceError> {
    let Json(request) = body.map_err(|rejection| {
        let error = ServiceError::InvalidRequest(rejection.body_text());
        error.track(API_PATH);
        error
    })?;

    let operation = Operation::parse(&request.operation).inspect_err(|error| {
        error.track(API_PATH);
        tracing::warn!(operation = %request.operation, "unknown operation");
    })?;

    let start = Instant::now();
    let arguments = request.arguments;
    let response = tokio::task::spawn_blocking(move || state.respond(operation, &arguments))
        .await
        .map_err(|err| ServiceError::Internal(format!("operation task failed: {err}")))?;

    log_slow_operation!(
        start.elapsed(),
        SLOW_OPERATION_MS,
        operation = %operation.name(),
        success = response.errors.is_empty(),
        "operation finished"
    );

    Ok(Json(response))
}

async fn schema_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json::<Value>(state.schemas().to_json())
}
