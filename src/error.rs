//! Freight Error Types
//!
//! One error kind per failure class. Messages are human-readable and never
//! carry storage internals.

use thiserror::Error;

/// Domain error returned by every freight operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FreightError {
    /// Entity absent, or present but not visible to the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity exists but its current status forbids the operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Caller is authenticated but not the actor bound to the entity
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Uniqueness violation or lost concurrent race
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type FreightResult<T> = Result<T, FreightError>;

impl FreightError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        FreightError::NotFound(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        FreightError::InvalidState(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        FreightError::ValidationFailed(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        FreightError::Unauthorized(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        FreightError::Conflict(msg.into())
    }

    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            FreightError::NotFound(_) => "NOT_FOUND",
            FreightError::InvalidState(_) => "INVALID_STATE",
            FreightError::ValidationFailed(_) => "VALIDATION_FAILED",
            FreightError::Unauthorized(_) => "UNAUTHORIZED",
            FreightError::Conflict(_) => "CONFLICT",
            FreightError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            FreightError::NotFound(_) => 404,
            FreightError::InvalidState(_) | FreightError::Conflict(_) => 409,
            FreightError::ValidationFailed(_) => 400,
            FreightError::Unauthorized(_) => 403,
            FreightError::Storage(_) => 500,
        }
    }
}

/// Postgres unique_violation
const PG_UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for FreightError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(PG_UNIQUE_VIOLATION) => {
                FreightError::Conflict(format!(
                    "duplicate record ({})",
                    db.constraint().unwrap_or("unique constraint")
                ))
            }
            sqlx::Error::RowNotFound => FreightError::NotFound("record".to_string()),
            _ => FreightError::Storage(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for FreightError {
    fn from(e: anyhow::Error) -> Self {
        FreightError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(FreightError::not_found("offer").code(), "NOT_FOUND");
        assert_eq!(FreightError::conflict("dup").code(), "CONFLICT");
        assert_eq!(
            FreightError::validation("weight").code(),
            "VALIDATION_FAILED"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(FreightError::not_found("x").http_status(), 404);
        assert_eq!(FreightError::invalid_state("x").http_status(), 409);
        assert_eq!(FreightError::conflict("x").http_status(), 409);
        assert_eq!(FreightError::validation("x").http_status(), 400);
        assert_eq!(FreightError::unauthorized("x").http_status(), 403);
        assert_eq!(FreightError::Storage("x".into()).http_status(), 500);
    }

    #[test]
    fn test_display() {
        let err = FreightError::invalid_state("request is not open");
        assert_eq!(err.to_string(), "Invalid state: request is not open");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: FreightError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, FreightError::NotFound(_)));
    }
}
