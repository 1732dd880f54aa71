use super::*;
use crate::domain::types::TimeSlot;
use crate::engine::refinement::RefinementView;

impl ClassGenerationApi {
    // ==========================================
    // manual refinement
    // ==========================================

    /// Move a student between two classes of a GENERATED/REFINING proposal
    ///
    /// Size and category breakage is reported on the proposal, never refused.
    pub async fn transfer_student(
        &self,
        proposal_id: &str,
        student_id: &str,
        from_class_id: &str,
        to_class_id: &str,
        actor: &str,
    ) -> ApiResult<ClassProposal> {
        require_actor(actor)?;
        let current = self.load_proposal(proposal_id)?;

        let result = match self.acquire_lease(GenerationLease::proposal_key(proposal_id), actor).await {
            Ok(_lease) => self.apply_edit(proposal_id, actor, |engine, proposal| {
                engine.transfer_student(proposal, student_id, from_class_id, to_class_id, actor)
            }),
            Err(e) => Err(e),
        };
        self.audit_failure(
            &current.term_id,
            Some(proposal_id),
            LogAction::ManualEdit,
            actor,
            result,
        )
    }

    /// Put a class on an explicit teacher and slot
    ///
    /// # Errors
    /// - `ConstraintViolation`: competency, availability, quota or double-booking
    pub async fn reassign_teacher(
        &self,
        proposal_id: &str,
        class_id: &str,
        teacher_id: &str,
        slot: TimeSlot,
        actor: &str,
    ) -> ApiResult<ClassProposal> {
        require_actor(actor)?;
        let current = self.load_proposal(proposal_id)?;

        let result = match self.acquire_lease(GenerationLease::proposal_key(proposal_id), actor).await {
            Ok(_lease) => self.apply_edit(proposal_id, actor, |engine, proposal| {
                engine.reassign_teacher(proposal, class_id, teacher_id, slot, actor)
            }),
            Err(e) => Err(e),
        };
        self.audit_failure(
            &current.term_id,
            Some(proposal_id),
            LogAction::ManualEdit,
            actor,
            result,
        )
    }

    /// Reviewer screen data (classes + teacher capacity)
    pub fn get_refinement_view(&self, proposal_id: &str) -> ApiResult<RefinementView> {
        let proposal = self.load_proposal(proposal_id)?;
        Ok(self.refinement_engine.refinement_view(&proposal))
    }

    /// Load, edit, store with a revision check, log MANUAL_EDIT
    fn apply_edit<F>(&self, proposal_id: &str, actor: &str, edit: F) -> ApiResult<ClassProposal>
    where
        F: FnOnce(&RefinementEngine, &mut ClassProposal) -> crate::engine::error::EngineResult<()>,
    {
        let mut proposal = self.load_proposal(proposal_id)?;
        let expected = proposal.revision;
        let before = proposal.snapshot();

        edit(&self.refinement_engine, &mut proposal)?;

        let description = match proposal.manual_overrides.last() {
            Some(o) => serde_json::to_string(&o.kind).unwrap_or_default(),
            None => String::new(),
        };
        let log = GenerationLog::new(&proposal.term_id, LogAction::ManualEdit, LogOutcome::Succeeded, actor)
            .with_proposal(&proposal.proposal_id)
            .with_description(description)
            .with_old_data(before)
            .with_new_data(proposal.snapshot());
        self.commit(
            &[ProposalWrite::Update {
                proposal: &proposal,
                expected_revision: expected,
            }],
            vec![log],
        )?;
        Ok(proposal)
    }
}
