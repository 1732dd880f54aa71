// ==========================================
// Class Generation Engine - external collaborators
// ==========================================
// Contracts for the systems around generation:
//   CohortSource         assessed students + level catalog
//   AvailabilitySource   teacher competencies + free slots
//   ScheduleMaterializer receives an approved proposal
//   ParameterSource      effective generation parameters
// Every call goes through `call_with_retry` (timeout, one retry).
// ==========================================

pub mod csv_source;
pub mod json_export;

use crate::domain::cohort::{AssessedStudent, Level};
use crate::domain::params::GenerationParameters;
use crate::domain::proposal::ClassProposal;
use crate::domain::teacher::TeacherCandidate;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub use csv_source::{CsvAvailabilitySource, CsvCohortSource};
pub use json_export::JsonScheduleExporter;

// ==========================================
// CollaboratorError
// ==========================================
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator returned invalid data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<csv::Error> for CollaboratorError {
    fn from(err: csv::Error) -> Self {
        CollaboratorError::Csv(err.to_string())
    }
}

impl From<serde_json::Error> for CollaboratorError {
    fn from(err: serde_json::Error) -> Self {
        CollaboratorError::Json(err.to_string())
    }
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

// ==========================================
// Collaborator traits
// ==========================================

#[async_trait]
pub trait CohortSource: Send + Sync {
    /// Assessed students of a term
    async fn get_assessed_cohort(&self, term_id: &str) -> CollaboratorResult<Vec<AssessedStudent>>;

    /// Level catalog used by the term
    async fn get_levels(&self, term_id: &str) -> CollaboratorResult<Vec<Level>>;
}

#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    async fn get_teacher_availability(&self, term_id: &str) -> CollaboratorResult<Vec<TeacherCandidate>>;
}

#[async_trait]
pub trait ScheduleMaterializer: Send + Sync {
    /// Turn an approved proposal into the live schedule
    ///
    /// Must be idempotent per proposal_id: publication retries call it again.
    async fn materialize_schedule(&self, proposal: &ClassProposal) -> CollaboratorResult<()>;
}

#[async_trait]
pub trait ParameterSource: Send + Sync {
    async fn get_generation_parameters(&self, term_id: &str) -> CollaboratorResult<GenerationParameters>;
}

// ==========================================
// Bounded call with one retry
// ==========================================

/// Run `call` under `timeout`; a timeout or error is retried once
pub async fn call_with_retry<T, F, Fut>(operation: &str, timeout: Duration, mut call: F) -> CollaboratorResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CollaboratorResult<T>>,
{
    let mut attempt = 1;
    loop {
        let result = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout {
                operation: operation.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if attempt < 2 => {
                warn!(operation, attempt, error = %e, "collaborator call failed, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
