// ==========================================
// Class Generation Engine - proposal lifecycle
// ==========================================
// GENERATED -> (REFINING)* -> APPROVED -> PUBLISHED
// GENERATED/REFINING -> REJECTED
// Pure state machine: guards and stamps only. Locking, persistence,
// audit and materialization live in the service layer.
// ==========================================

use crate::domain::proposal::ClassProposal;
use crate::domain::types::ProposalStatus;
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDateTime;
use tracing::info;

pub struct LifecycleManager {
    approval_conflict_threshold: usize, // conflicts tolerated without an override reason
}

impl LifecycleManager {
    pub fn new(approval_conflict_threshold: usize) -> Self {
        Self {
            approval_conflict_threshold,
        }
    }

    /// Approve a mutable proposal
    ///
    /// Conflicts above the threshold need a non-blank override reason.
    /// Size violations are marked approved along with the proposal.
    pub fn approve(
        &self,
        proposal: &mut ClassProposal,
        actor: &str,
        override_reason: Option<&str>,
    ) -> EngineResult<()> {
        if !proposal.status.is_mutable() {
            return Err(invalid_state(proposal, "approve", "only GENERATED or REFINING proposals can be approved"));
        }

        let reason = override_reason.map(str::trim).filter(|r| !r.is_empty());
        if proposal.conflict_count > self.approval_conflict_threshold && reason.is_none() {
            return Err(invalid_state(
                proposal,
                "approve",
                &format!(
                    "{} unresolved conflicts exceed threshold {}, an override reason is required",
                    proposal.conflict_count, self.approval_conflict_threshold
                ),
            ));
        }

        let now = now();
        proposal.status = ProposalStatus::Approved;
        proposal.approved_by = Some(actor.to_string());
        proposal.approved_at = Some(now);
        proposal.approval_override_reason = reason.map(|r| r.to_string());
        for violation in proposal.size_violations.iter_mut() {
            violation.approved = true;
        }
        proposal.revision += 1;

        info!(proposal_id = %proposal.proposal_id, actor, override_used = reason.is_some(), "proposal approved");
        Ok(())
    }

    /// Reject a mutable proposal; it becomes read-only
    pub fn reject(&self, proposal: &mut ClassProposal, actor: &str, reason: &str) -> EngineResult<()> {
        if !proposal.status.is_mutable() {
            return Err(invalid_state(proposal, "reject", "only GENERATED or REFINING proposals can be rejected"));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::MalformedInput("rejection reason must not be blank".to_string()));
        }

        proposal.status = ProposalStatus::Rejected;
        proposal.rejected_by = Some(actor.to_string());
        proposal.rejected_at = Some(now());
        proposal.rejection_reason = Some(reason.to_string());
        proposal.revision += 1;

        info!(proposal_id = %proposal.proposal_id, actor, reason, "proposal rejected");
        Ok(())
    }

    /// Reject the prior active proposal of a term in favour of a new run
    pub fn supersede(&self, proposal: &mut ClassProposal, actor: &str, new_run: u32) -> EngineResult<()> {
        self.reject(proposal, actor, &format!("superseded by run {}", new_run))
    }

    /// Publication guard, checked before the materializer is called
    pub fn ensure_publishable(&self, proposal: &ClassProposal) -> EngineResult<()> {
        if proposal.status == ProposalStatus::Approved {
            Ok(())
        } else {
            Err(invalid_state(proposal, "publish", "only APPROVED proposals can be published"))
        }
    }

    /// Stamp a successfully materialized proposal
    pub fn mark_published(&self, proposal: &mut ClassProposal, actor: &str) -> EngineResult<()> {
        self.ensure_publishable(proposal)?;
        proposal.status = ProposalStatus::Published;
        proposal.published_by = Some(actor.to_string());
        proposal.published_at = Some(now());
        proposal.revision += 1;

        info!(proposal_id = %proposal.proposal_id, actor, "proposal published");
        Ok(())
    }
}

fn invalid_state(proposal: &ClassProposal, operation: &'static str, detail: &str) -> EngineError {
    EngineError::InvalidState {
        proposal_id: proposal.proposal_id.clone(),
        status: proposal.status,
        operation,
        detail: detail.to_string(),
    }
}

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}
