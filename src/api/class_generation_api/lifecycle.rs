use super::*;
use crate::collaborator::call_with_retry;
use crate::engine::lifecycle::LifecycleManager;
use serde_json::json;
use tracing::{info, instrument};

impl ClassGenerationApi {
    // ==========================================
    // approval / rejection
    // ==========================================

    /// Approve a GENERATED/REFINING proposal
    ///
    /// Conflicts above the configured threshold require `override_reason`.
    #[instrument(skip(self, override_reason))]
    pub async fn approve_proposal(
        &self,
        proposal_id: &str,
        actor: &str,
        override_reason: Option<&str>,
    ) -> ApiResult<ClassProposal> {
        require_actor(actor)?;
        let current = self.load_proposal(proposal_id)?;

        let result = async {
            let threshold = read_config(self.config_reader.get_approval_conflict_threshold().await)?;
            let _lease = self
                .acquire_lease(GenerationLease::proposal_key(proposal_id), actor)
                .await?;
            self.apply_transition(proposal_id, actor, LogAction::Approval, |proposal| {
                LifecycleManager::new(threshold).approve(proposal, actor, override_reason)
            })
        }
        .await;
        self.audit_failure(&current.term_id, Some(proposal_id), LogAction::Approval, actor, result)
    }

    /// Reject a GENERATED/REFINING proposal; a reason is required
    #[instrument(skip(self))]
    pub async fn reject_proposal(&self, proposal_id: &str, actor: &str, reason: &str) -> ApiResult<ClassProposal> {
        require_actor(actor)?;
        let current = self.load_proposal(proposal_id)?;

        let result = match self.acquire_lease(GenerationLease::proposal_key(proposal_id), actor).await {
            Ok(_lease) => self.apply_transition(proposal_id, actor, LogAction::Rejection, |proposal| {
                LifecycleManager::new(0).reject(proposal, actor, reason)
            }),
            Err(e) => Err(e),
        };
        self.audit_failure(&current.term_id, Some(proposal_id), LogAction::Rejection, actor, result)
    }

    // ==========================================
    // publication
    // ==========================================

    /// Materialize an APPROVED proposal and mark it PUBLISHED
    ///
    /// The materializer gets one retry; if it still fails the proposal
    /// stays APPROVED and the failure is logged.
    #[instrument(skip(self))]
    pub async fn publish_proposal(&self, proposal_id: &str, actor: &str) -> ApiResult<ClassProposal> {
        require_actor(actor)?;
        let current = self.load_proposal(proposal_id)?;

        let result = async {
            let _lease = self
                .acquire_lease(GenerationLease::proposal_key(proposal_id), actor)
                .await?;
            let mut proposal = self.load_proposal(proposal_id)?;
            let lifecycle = LifecycleManager::new(0);
            lifecycle.ensure_publishable(&proposal)?;

            let timeout = self.collaborator_timeout().await?;
            call_with_retry("materialize_schedule", timeout, || {
                self.materializer.materialize_schedule(&proposal)
            })
            .await
            .map_err(|e| ApiError::MaterializationFailure(e.to_string()))?;

            let expected = proposal.revision;
            let before = proposal.snapshot();
            lifecycle.mark_published(&mut proposal, actor)?;

            let log = GenerationLog::new(&proposal.term_id, LogAction::Publication, LogOutcome::Succeeded, actor)
                .with_proposal(&proposal.proposal_id)
                .with_description(format!("{} classes materialized", proposal.assignments.len()))
                .with_old_data(before)
                .with_new_data(proposal.snapshot());
            self.commit(
                &[ProposalWrite::Update {
                    proposal: &proposal,
                    expected_revision: expected,
                }],
                vec![log],
            )?;
            Ok::<ClassProposal, ApiError>(proposal)
        }
        .await;
        self.audit_failure(&current.term_id, Some(proposal_id), LogAction::Publication, actor, result)
    }

    /// Load, transition, store with a revision check, log the action
    fn apply_transition<F>(
        &self,
        proposal_id: &str,
        actor: &str,
        action: LogAction,
        transition: F,
    ) -> ApiResult<ClassProposal>
    where
        F: FnOnce(&mut ClassProposal) -> crate::engine::error::EngineResult<()>,
    {
        let mut proposal = self.load_proposal(proposal_id)?;
        let expected = proposal.revision;
        let before = proposal.snapshot();

        transition(&mut proposal)?;

        let reason = match action {
            LogAction::Approval => proposal.approval_override_reason.clone(),
            LogAction::Rejection => proposal.rejection_reason.clone(),
            _ => None,
        };
        let log = GenerationLog::new(&proposal.term_id, action, LogOutcome::Succeeded, actor)
            .with_proposal(&proposal.proposal_id)
            .with_description(reason.clone().unwrap_or_else(|| format!("{} by {}", action, actor)))
            .with_old_data(before)
            .with_new_data(json!({
                "proposal": proposal.snapshot(),
                "reason": reason,
            }));
        self.commit(
            &[ProposalWrite::Update {
                proposal: &proposal,
                expected_revision: expected,
            }],
            vec![log],
        )?;

        info!(proposal_id, action = %action, status = %proposal.status, "proposal transitioned");
        Ok(proposal)
    }
}
