// ==========================================
// Class Generation Engine - service-layer errors
// ==========================================
// Maps engine / repository / collaborator failures onto the
// caller-facing taxonomy. Every message carries its reason.
// ==========================================

use crate::collaborator::CollaboratorError;
use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // caller errors
    // ==========================================
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Lifecycle guard refused the operation
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Explicit edit breaks a hard assignment constraint
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    // ==========================================
    // concurrency
    // ==========================================
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("generation cancelled")]
    Cancelled,

    // ==========================================
    // collaborators
    // ==========================================
    /// Materializer failed twice, proposal stays APPROVED
    #[error("schedule materialization failed: {0}")]
    MaterializationFailure(String),

    #[error("collaborator error: {0}")]
    Collaborator(String),

    // ==========================================
    // infrastructure
    // ==========================================
    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                proposal_id,
                expected,
                actual,
            } => ApiError::ConcurrencyConflict(format!(
                "proposal {} was modified concurrently (expected revision {}, found {})",
                proposal_id, expected, actual
            )),
            RepositoryError::LeaseHeld {
                lease_key,
                holder,
                expires_at,
            } => ApiError::ConcurrencyConflict(format!(
                "{} is locked by {} until {}",
                lease_key, holder, expires_at
            )),
            RepositoryError::NotFound { entity, id } => ApiError::NotFound(format!("{} {}", entity, id)),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::ConcurrencyConflict(format!("unique constraint violated: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::InvalidInput(format!("foreign key constraint violated: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::Internal(format!("stored field {} is invalid: {}", field, message))
            }
            RepositoryError::SerializationError(msg) | RepositoryError::InternalError(msg) => {
                ApiError::Internal(msg)
            }
            RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::LockError(msg)
            | RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::Database(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::MalformedInput(msg) => ApiError::InvalidInput(msg),
            e @ EngineError::InvalidState { .. } => ApiError::InvalidState(e.to_string()),
            EngineError::ConstraintViolation(msg) => ApiError::ConstraintViolation(msg),
            e @ EngineError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            EngineError::Cancelled => ApiError::Cancelled,
        }
    }
}

impl From<CollaboratorError> for ApiError {
    fn from(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::InvalidData(msg) => ApiError::InvalidInput(msg),
            other => ApiError::Collaborator(other.to_string()),
        }
    }
}

/// Result alias
pub type ApiResult<T> = Result<T, ApiError>;
