//! Error handling for the timetable service
//!
//! This module provides:
//! - The typed [`ServiceError`] every layer returns
//! - Stable error codes and categories for responses and telemetry
//! - The per-error payload rendered into the `errors` list of a response
//! - Global error counters

use crate::domain::EntityKind;
use crate::validation::{Violation, Violations};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Error codes, JSON-RPC style: standard request errors plus custom codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// The request body is not a valid operation envelope
    InvalidRequest = -32600,
    /// The named operation does not exist
    UnknownOperation = -32601,
    /// An argument or input field could not be parsed
    InvalidArgument = -32602,
    /// Unexpected internal failure
    InternalError = -32603,

    /// Identifier did not resolve to a record
    NotFound = -32001,
    /// Storage-level constraint rejected the write
    IntegrityViolation = -32002,
    /// Filter or order argument names an unknown field
    UnknownField = -32003,
    /// Record failed validation rules
    ValidationFailed = -32004,
    /// Snapshot could not be read or written
    StorageError = -32012,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Get the error category for metrics
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest | ErrorCode::InvalidArgument | ErrorCode::UnknownField => {
                "client_error"
            }
            ErrorCode::UnknownOperation => "not_found",
            ErrorCode::NotFound => "resource_not_found",
            ErrorCode::ValidationFailed => "validation_error",
            ErrorCode::IntegrityViolation => "integrity_error",
            ErrorCode::InternalError => "server_error",
            ErrorCode::StorageError => "io_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

// =============================================================================
// SERVICE ERROR
// =============================================================================

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(Violations),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("{kind} violates integrity constraint '{constraint}'")]
    Integrity { kind: EntityKind, constraint: String },

    #[error("unknown field '{field}' on {kind}")]
    UnknownField { kind: EntityKind, field: String },

    #[error("invalid argument '{argument}': {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        ServiceError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid_argument(argument: impl Into<String>, reason: impl fmt::Display) -> Self {
        ServiceError::InvalidArgument {
            argument: argument.into(),
            reason: reason.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(_) => ErrorCode::ValidationFailed,
            ServiceError::NotFound { .. } => ErrorCode::NotFound,
            ServiceError::Integrity { .. } => ErrorCode::IntegrityViolation,
            ServiceError::UnknownField { .. } => ErrorCode::UnknownField,
            ServiceError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            ServiceError::UnknownOperation(_) => ErrorCode::UnknownOperation,
            ServiceError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            ServiceError::Storage(_) => ErrorCode::StorageError,
            ServiceError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Violations carried by a validation failure, empty otherwise.
    pub fn violations(&self) -> &[Violation] {
        match self {
            ServiceError::Validation(violations) => violations.as_slice(),
            _ => &[],
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        let code = self.code();
        ErrorPayload {
            message: self.to_string(),
            code: code.code(),
            category: code.category(),
            violations: self.violations().to_vec(),
        }
    }

    /// Record this error against `operation` in the global counters.
    pub fn track(&self, operation: &str) {
        ERROR_METRICS.record_error(&self.code(), Some(operation));
    }
}

impl From<Violations> for ServiceError {
    fn from(violations: Violations) -> Self {
        ServiceError::Validation(violations)
    }
}

/// One entry of a response's `errors` list.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub message: String,
    pub code: i32,
    pub category: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self.code() {
            ErrorCode::InvalidRequest | ErrorCode::InvalidArgument | ErrorCode::UnknownField => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::UnknownOperation => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationFailed | ErrorCode::IntegrityViolation => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorCode::InternalError | ErrorCode::StorageError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({ "errors": [self.payload()] });
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// ERROR TELEMETRY
// =============================================================================

/// Error metrics for telemetry
#[derive(Debug)]
pub struct ErrorMetrics {
    /// Total error count by error code
    error_counts: RwLock<HashMap<ErrorCode, AtomicU64>>,
    /// Error count by operation
    operation_errors: RwLock<HashMap<String, AtomicU64>>,
    /// Error count by category
    category_counts: RwLock<HashMap<String, AtomicU64>>,
}

fn increment<K>(map: &RwLock<HashMap<K, AtomicU64>>, key: &K)
where
    K: std::hash::Hash + Eq + Clone,
{
    {
        let read = map.read();
        if let Some(counter) = read.get(key) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
    }
    map.write()
        .entry(key.clone())
        .or_insert_with(|| AtomicU64::new(0))
        .fetch_add(1, Ordering::Relaxed);
}

fn load<K, Q>(map: &RwLock<HashMap<K, AtomicU64>>, key: &Q) -> u64
where
    K: std::hash::Hash + Eq + std::borrow::Borrow<Q>,
    Q: std::hash::Hash + Eq + ?Sized,
{
    map.read()
        .get(key)
        .map(|counter| counter.load(Ordering::Relaxed))
        .unwrap_or(0)
}

impl ErrorMetrics {
    pub fn new() -> Self {
        Self {
            error_counts: RwLock::new(HashMap::new()),
            operation_errors: RwLock::new(HashMap::new()),
            category_counts: RwLock::new(HashMap::new()),
        }
    }

    /// Record an error occurrence
    pub fn record_error(&self, code: &ErrorCode, operation: Option<&str>) {
        increment(&self.error_counts, code);
        if let Some(operation) = operation {
            increment(&self.operation_errors, &operation.to_string());
        }
        let category = code.category();
        increment(&self.category_counts, &category.to_string());

        tracing::debug!(
            error_code = %code,
            operation = operation,
            category = category,
            "error recorded"
        );
    }

    pub fn get_error_count(&self, code: &ErrorCode) -> u64 {
        load(&self.error_counts, code)
    }

    pub fn get_operation_error_count(&self, operation: &str) -> u64 {
        load(&self.operation_errors, operation)
    }

    pub fn get_category_count(&self, category: &str) -> u64 {
        load(&self.category_counts, category)
    }

    /// Get all error statistics
    pub fn get_stats(&self) -> ErrorStats {
        fn snapshot<K: Clone + std::hash::Hash + Eq>(
            map: &RwLock<HashMap<K, AtomicU64>>,
        ) -> HashMap<K, u64> {
            map.read()
                .iter()
                .map(|(key, counter)| (key.clone(), counter.load(Ordering::Relaxed)))
                .collect()
        }

        ErrorStats {
            error_counts: snapshot(&self.error_counts),
            operation_errors: snapshot(&self.operation_errors),
            category_counts: snapshot(&self.category_counts),
        }
    }

    pub fn reset(&self) {
        self.error_counts.write().clear();
        self.operation_errors.write().clear();
        self.category_counts.write().clear();
    }
}

impl Default for ErrorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Error statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ErrorStats {
    pub error_counts: HashMap<ErrorCode, u64>,
    pub operation_errors: HashMap<String, u64>,
    pub category_counts: HashMap<String, u64>,
}

/// Global error metrics instance
pub static ERROR_METRICS: once_cell::sync::Lazy<ErrorMetrics> =
    once_cell::sync::Lazy::new(ErrorMetrics::new);
