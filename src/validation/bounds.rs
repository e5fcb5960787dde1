//! Range checks for pagination arguments.

use crate::error::ServiceError;

// ============================================================================
// Page Size Limits
// ============================================================================

/// Smallest page a client may request
pub const MIN_PAGE_SIZE: usize = 1;

/// Largest configurable page size
pub const MAX_PAGE_SIZE: usize = 1_000;

/// Page size used when the configuration does not set one
pub const DEFAULT_PAGE_SIZE: usize = 100;

// ============================================================================
// Validation Functions
// ============================================================================

/// Validates a configured maximum page size.
pub fn validate_page_size(size: usize) -> anyhow::Result<usize> {
    if size < MIN_PAGE_SIZE {
        anyhow::bail!("page size {} is below minimum of {}", size, MIN_PAGE_SIZE);
    }
    if size > MAX_PAGE_SIZE {
        anyhow::bail!("page size {} exceeds maximum of {}", size, MAX_PAGE_SIZE);
    }
    Ok(size)
}

/// Validates a `first`/`last` argument of a list query against the
/// configured page size.
pub fn validate_page_request(
    argument: &str,
    requested: i64,
    max_page_size: usize,
) -> Result<usize, ServiceError> {
    if requested < 0 {
        return Err(ServiceError::invalid_argument(
            argument,
            format!("must not be negative, got {requested}"),
        ));
    }
    let requested = usize::try_from(requested).unwrap_or(usize::MAX);
    if requested > max_page_size {
        return Err(ServiceError::invalid_argument(
            argument,
            format!("{requested} exceeds the maximum page size of {max_page_size}"),
        ));
    }
    Ok(requested)
}
