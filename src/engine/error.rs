// ==========================================
// Class Generation Engine - engine errors
// ==========================================

use crate::domain::types::ProposalStatus;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Input the run cannot be attempted on (bad parameters, unknown level, duplicates)
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Lifecycle guard refused the operation, nothing changed
    #[error("{operation} not allowed on proposal {proposal_id} in state {status}: {detail}")]
    InvalidState {
        proposal_id: String,
        status: ProposalStatus,
        operation: &'static str,
        detail: String,
    },

    /// Explicit edit breaks a hard assignment constraint
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("generation cancelled")]
    Cancelled,
}

pub type EngineResult<T> = Result<T, EngineError>;
