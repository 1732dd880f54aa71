// ==========================================
// Class Generation Engine - service API
// ==========================================
// Wraps the pure engine with everything a real caller needs:
//   leases ("term:<id>" per generation, "proposal:<id>" per mutation)
//   persistence with optimistic revision checks
//   audit log entries for every attempt (SUCCEEDED / FAILED / DENIED)
//   collaborator calls with timeout and one retry
// ==========================================

mod generation;
mod lifecycle;
mod queries;
mod refinement;


use crate::api::error::{ApiError, ApiResult};
use crate::collaborator::{AvailabilitySource, CohortSource, ParameterSource, ScheduleMaterializer};
use crate::config::{ConfigManager, ConfigResult, GenerationConfigReader};
use crate::domain::generation_log::{GenerationLog, LogAction, LogOutcome};
use crate::domain::lease::GenerationLease;
use crate::domain::proposal::ClassProposal;
use crate::domain::term::Term;
use crate::engine::readiness::ReadinessEvaluator;
use crate::engine::refinement::RefinementEngine;
use crate::repository::{
    GenerationLogRepository, LeaseRepository, ProposalRepository, ProposalWrite, RepositoryResult,
    TermRepository,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

pub use generation::GenerationSummary;

// ==========================================
// ClassGenerationApi
// ==========================================
pub struct ClassGenerationApi {
    term_repo: Arc<TermRepository>,
    proposal_repo: Arc<ProposalRepository>,
    log_repo: Arc<GenerationLogRepository>,
    lease_repo: Arc<LeaseRepository>,
    config_reader: Arc<dyn GenerationConfigReader>,
    parameter_source: Arc<dyn ParameterSource>,
    cohort_source: Arc<dyn CohortSource>,
    availability_source: Arc<dyn AvailabilitySource>,
    materializer: Arc<dyn ScheduleMaterializer>,
    refinement_engine: RefinementEngine,
    readiness_evaluator: ReadinessEvaluator,
}

impl ClassGenerationApi {
    /// Wire the service from a shared connection and its collaborators
    ///
    /// The schema must already exist (`db::init_schema`).
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        config_reader: Arc<dyn GenerationConfigReader>,
        parameter_source: Arc<dyn ParameterSource>,
        cohort_source: Arc<dyn CohortSource>,
        availability_source: Arc<dyn AvailabilitySource>,
        materializer: Arc<dyn ScheduleMaterializer>,
    ) -> Self {
        Self {
            term_repo: Arc::new(TermRepository::new(conn.clone())),
            proposal_repo: Arc::new(ProposalRepository::new(conn.clone())),
            log_repo: Arc::new(GenerationLogRepository::new(conn.clone())),
            lease_repo: Arc::new(LeaseRepository::new(conn)),
            config_reader,
            parameter_source,
            cohort_source,
            availability_source,
            materializer,
            refinement_engine: RefinementEngine::new(),
            readiness_evaluator: ReadinessEvaluator::new(),
        }
    }

    /// Same wiring with one ConfigManager serving settings and parameters
    pub fn with_config_manager(
        conn: Arc<Mutex<Connection>>,
        config: Arc<ConfigManager>,
        cohort_source: Arc<dyn CohortSource>,
        availability_source: Arc<dyn AvailabilitySource>,
        materializer: Arc<dyn ScheduleMaterializer>,
    ) -> Self {
        Self::new(
            conn,
            config.clone(),
            config,
            cohort_source,
            availability_source,
            materializer,
        )
    }

    // ==========================================
    // terms
    // ==========================================

    /// Register or update a term
    pub fn upsert_term(&self, term: &Term) -> ApiResult<()> {
        if term.term_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("term_id must not be blank".to_string()));
        }
        self.term_repo.upsert(term)?;
        Ok(())
    }

    pub fn get_term(&self, term_id: &str) -> ApiResult<Term> {
        self.term_repo
            .find_by_id(term_id)?
            .ok_or_else(|| ApiError::NotFound(format!("term {}", term_id)))
    }

    // ==========================================
    // shared plumbing
    // ==========================================

    fn load_proposal(&self, proposal_id: &str) -> ApiResult<ClassProposal> {
        self.proposal_repo
            .find_by_id(proposal_id)?
            .ok_or_else(|| ApiError::NotFound(format!("proposal {}", proposal_id)))
    }

    async fn acquire_lease(&self, lease_key: String, actor: &str) -> ApiResult<LeaseGuard> {
        let ttl = read_config(self.config_reader.get_lease_ttl_secs().await)?;
        let lease = GenerationLease::new(lease_key, actor, ttl);
        self.lease_repo.try_acquire(&lease)?;
        debug!(lease_key = %lease.lease_key, actor, ttl, "lease acquired");

        Ok(LeaseGuard {
            repo: self.lease_repo.clone(),
            lease_key: lease.lease_key,
            lease_token: lease.lease_token,
        })
    }

    async fn collaborator_timeout(&self) -> ApiResult<Duration> {
        let ms = read_config(self.config_reader.get_collaborator_timeout_ms().await)?;
        Ok(Duration::from_millis(ms))
    }

    /// Store proposal changes together with their log entries
    ///
    /// One transaction: a failed audit write leaves the proposals untouched.
    fn commit(&self, writes: &[ProposalWrite<'_>], mut logs: Vec<GenerationLog>) -> ApiResult<()> {
        self.proposal_repo.commit_with_logs(writes, &mut logs)?;
        Ok(())
    }

    /// Record a refused or failed attempt, then hand the error back
    fn audit_failure<T>(
        &self,
        term_id: &str,
        proposal_id: Option<&str>,
        action: LogAction,
        actor: &str,
        result: ApiResult<T>,
    ) -> ApiResult<T> {
        if let Err(err) = &result {
            let mut log = GenerationLog::new(term_id, action, failure_outcome(err), actor)
                .with_description(err.to_string());
            if let Some(id) = proposal_id {
                log = log.with_proposal(id);
            }
            if let Err(log_err) = self.log_repo.append(&mut log) {
                warn!(term_id, action = %action, error = %log_err, "audit entry for a failed attempt was not written");
            }
        }
        result
    }
}

// ==========================================
// LeaseGuard - releases on drop
// ==========================================
struct LeaseGuard {
    repo: Arc<LeaseRepository>,
    lease_key: String,
    lease_token: String,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        let released: RepositoryResult<bool> = self.repo.release(&self.lease_key, &self.lease_token);
        match released {
            Ok(true) => debug!(lease_key = %self.lease_key, "lease released"),
            Ok(false) => warn!(lease_key = %self.lease_key, "lease expired or taken over before release"),
            Err(e) => warn!(lease_key = %self.lease_key, error = %e, "lease release failed"),
        }
    }
}

/// Lifecycle guards and lease conflicts are denials; everything else failed
fn failure_outcome(err: &ApiError) -> LogOutcome {
    match err {
        ApiError::InvalidState(_) | ApiError::ConcurrencyConflict(_) => LogOutcome::Denied,
        _ => LogOutcome::Failed,
    }
}

fn require_actor(actor: &str) -> ApiResult<()> {
    if actor.trim().is_empty() {
        return Err(ApiError::InvalidInput("actor must not be blank".to_string()));
    }
    Ok(())
}

fn read_config<T>(value: ConfigResult<T>) -> ApiResult<T> {
    value.map_err(|e| ApiError::Internal(format!("configuration unreadable: {}", e)))
}
