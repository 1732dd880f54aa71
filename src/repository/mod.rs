// ==========================================
// Class Generation Engine - repository layer
// ==========================================
// Scope: data access, hides SQLite details
// Rule: no business logic in repositories
// Rule: parameterized queries only
// ==========================================

pub mod error;
pub mod generation_log_repo;
pub mod lease_repo;
pub mod proposal_repo;
pub mod term_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use generation_log_repo::GenerationLogRepository;
pub use lease_repo::LeaseRepository;
pub use proposal_repo::{ProposalRepository, ProposalWrite};
pub use term_repo::TermRepository;

use chrono::NaiveDateTime;

/// Timestamp column format (fraction kept so values round-trip)
pub(crate) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub(crate) fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub(crate) fn parse_ts(column: usize, value: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}
