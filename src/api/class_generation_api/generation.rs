use super::*;
use crate::collaborator::call_with_retry;
use crate::domain::params::GenerationParameters;
use crate::engine::cancel::CancellationFlag;
use crate::engine::lifecycle::LifecycleManager;
use crate::engine::orchestrator::{GenerationInput, GenerationOrchestrator};
use crate::engine::readiness::GenerationReadiness;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

/// Compact result of a successful run, stored as the log's new_data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub proposal_id: String,
    pub generation_run: u32,
    pub total_classes: usize,
    pub unresolved_classes: usize,
    pub optimization_score: f64,
    pub conflict_count: usize,
    pub superseded_proposal_id: Option<String>,
}

impl ClassGenerationApi {
    // ==========================================
    // generation
    // ==========================================

    /// Generate a new proposal for a PLANNING term
    ///
    /// # Parameters
    /// - params: explicit parameters, None reads them from the ParameterSource
    ///
    /// # Errors
    /// - `InvalidState`: term not PLANNING, or an active proposal exists and
    ///   superseding is disabled
    /// - `ConcurrencyConflict`: another generation holds the term lease
    /// - `InvalidInput`: malformed parameters or cohort
    pub async fn generate_proposal(
        &self,
        term_id: &str,
        params: Option<GenerationParameters>,
        actor: &str,
    ) -> ApiResult<ClassProposal> {
        self.generate_proposal_with_cancel(term_id, params, actor, CancellationFlag::new())
            .await
    }

    /// `generate_proposal` with a caller-held cancellation flag
    ///
    /// A cancelled run persists nothing except a FAILED log entry.
    #[instrument(skip_all, fields(term_id = %term_id, actor = %actor))]
    pub async fn generate_proposal_with_cancel(
        &self,
        term_id: &str,
        params: Option<GenerationParameters>,
        actor: &str,
        cancel: CancellationFlag,
    ) -> ApiResult<ClassProposal> {
        require_actor(actor)?;

        let result = match self.acquire_lease(GenerationLease::term_key(term_id), actor).await {
            Ok(_lease) => self.run_generation(term_id, params, actor, cancel).await,
            Err(e) => Err(e),
        };
        self.audit_failure(term_id, None, LogAction::Generation, actor, result)
    }

    async fn run_generation(
        &self,
        term_id: &str,
        params: Option<GenerationParameters>,
        actor: &str,
        cancel: CancellationFlag,
    ) -> ApiResult<ClassProposal> {
        let term = self.get_term(term_id)?;
        if !term.accepts_generation() {
            return Err(ApiError::InvalidState(format!(
                "term {} is {}, generation requires PLANNING",
                term_id, term.status
            )));
        }

        // ===== at most one active proposal per term =====
        let supersede = read_config(self.config_reader.get_supersede_active_proposal().await)?;
        let active = self.proposal_repo.find_active_by_term(term_id)?;
        if let (Some(existing), false) = (&active, supersede) {
            return Err(ApiError::InvalidState(format!(
                "term {} already has active proposal {} ({})",
                term_id, existing.proposal_id, existing.status
            )));
        }

        // ===== inputs =====
        let timeout = self.collaborator_timeout().await?;
        let parameters = match params {
            Some(p) => p,
            None => {
                call_with_retry("get_generation_parameters", timeout, || {
                    self.parameter_source.get_generation_parameters(term_id)
                })
                .await?
            }
        };
        let problems = parameters.validate();
        if !problems.is_empty() {
            return Err(ApiError::InvalidInput(problems.join("; ")));
        }

        let (students, levels, teachers) = futures::join!(
            call_with_retry("get_assessed_cohort", timeout, || self.cohort_source.get_assessed_cohort(term_id)),
            call_with_retry("get_levels", timeout, || self.cohort_source.get_levels(term_id)),
            call_with_retry("get_teacher_availability", timeout, || {
                self.availability_source.get_teacher_availability(term_id)
            }),
        );
        let (students, levels, teachers) = (students?, levels?, teachers?);

        // ===== run the engine off the async workers =====
        let generation_run = self.proposal_repo.next_generation_run(term_id)?;
        let input = GenerationInput {
            term_id: term_id.to_string(),
            generation_run,
            levels,
            students,
            teachers,
            parameters,
            actor: actor.to_string(),
        };
        let proposal = tokio::task::spawn_blocking(move || GenerationOrchestrator::new().run(input, &cancel))
            .await
            .map_err(|e| ApiError::Internal(format!("generation task aborted: {}", e)))??;

        // ===== supersede, store, audit in one transaction =====
        let mut logs = Vec::new();
        let mut superseded: Option<(ClassProposal, u64)> = None;
        let _previous_lease = match active {
            Some(previous) => {
                let lease = self
                    .acquire_lease(GenerationLease::proposal_key(&previous.proposal_id), actor)
                    .await?;
                let (rejected, expected, log) = self.prepare_supersede(&previous.proposal_id, actor, generation_run)?;
                logs.push(log);
                superseded = Some((rejected, expected));
                Some(lease)
            }
            None => None,
        };

        let summary = GenerationSummary {
            proposal_id: proposal.proposal_id.clone(),
            generation_run,
            total_classes: proposal.assignments.len(),
            unresolved_classes: proposal.unresolved_count(),
            optimization_score: proposal.optimization_score,
            conflict_count: proposal.conflict_count,
            superseded_proposal_id: superseded.as_ref().map(|(p, _)| p.proposal_id.clone()),
        };
        logs.push(
            GenerationLog::new(term_id, LogAction::Generation, LogOutcome::Succeeded, actor)
                .with_proposal(&proposal.proposal_id)
                .with_description(format!(
                    "run {} generated {} classes, score {}, {} conflicts",
                    generation_run, summary.total_classes, summary.optimization_score, summary.conflict_count
                ))
                .with_new_data(json!(summary)),
        );

        let mut writes = Vec::with_capacity(2);
        if let Some((rejected, expected)) = &superseded {
            writes.push(ProposalWrite::Update {
                proposal: rejected,
                expected_revision: *expected,
            });
        }
        writes.push(ProposalWrite::Insert(&proposal));
        self.commit(&writes, logs)?;

        info!(
            proposal_id = %proposal.proposal_id,
            generation_run,
            score = proposal.optimization_score,
            conflicts = proposal.conflict_count,
            "proposal generated"
        );
        Ok(proposal)
    }

    /// Reject the previous active proposal in favour of a new run
    ///
    /// Reloaded under its lease; the caller stores it with the new run.
    fn prepare_supersede(
        &self,
        previous_id: &str,
        actor: &str,
        new_run: u32,
    ) -> ApiResult<(ClassProposal, u64, GenerationLog)> {
        let mut proposal = self.load_proposal(previous_id)?;
        let expected = proposal.revision;
        let before = proposal.snapshot();
        LifecycleManager::new(0).supersede(&mut proposal, actor, new_run)?;

        let log = GenerationLog::new(&proposal.term_id, LogAction::Rejection, LogOutcome::Succeeded, actor)
            .with_proposal(&proposal.proposal_id)
            .with_description(format!("superseded by run {}", new_run))
            .with_old_data(before)
            .with_new_data(proposal.snapshot());
        Ok((proposal, expected, log))
    }

    // ==========================================
    // readiness
    // ==========================================

    /// Pre-flight check of cohort and availability for a term
    ///
    /// Collaborator failures are reported as blocking issues rather than errors.
    pub async fn get_generation_readiness(&self, term_id: &str) -> ApiResult<GenerationReadiness> {
        let term = self.get_term(term_id)?;
        let timeout = self.collaborator_timeout().await?;

        let (params, students, levels, teachers) = futures::join!(
            call_with_retry("get_generation_parameters", timeout, || {
                self.parameter_source.get_generation_parameters(term_id)
            }),
            call_with_retry("get_assessed_cohort", timeout, || self.cohort_source.get_assessed_cohort(term_id)),
            call_with_retry("get_levels", timeout, || self.cohort_source.get_levels(term_id)),
            call_with_retry("get_teacher_availability", timeout, || {
                self.availability_source.get_teacher_availability(term_id)
            }),
        );

        let mut collaborator_issues = Vec::new();
        let params = params.unwrap_or_else(|e| {
            collaborator_issues.push(format!("generation parameters unavailable: {}", e));
            GenerationParameters::default()
        });
        let students = students.unwrap_or_else(|e| {
            collaborator_issues.push(format!("cohort unavailable: {}", e));
            Vec::new()
        });
        let levels = levels.unwrap_or_else(|e| {
            collaborator_issues.push(format!("level catalog unavailable: {}", e));
            Vec::new()
        });
        let teachers = teachers.unwrap_or_else(|e| {
            collaborator_issues.push(format!("teacher availability unavailable: {}", e));
            Vec::new()
        });

        let mut readiness = self
            .readiness_evaluator
            .evaluate(&term, &levels, &students, &teachers, &params);
        if !collaborator_issues.is_empty() {
            readiness.blocking_issues.extend(collaborator_issues);
            readiness.can_generate = false;
        }
        Ok(readiness)
    }
}
