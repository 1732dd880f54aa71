// ==========================================
// Class Generation Engine - proposal builder
// ==========================================
// Wraps assigner output into a scored GENERATED proposal
// ==========================================

use crate::domain::params::GenerationParameters;
use crate::domain::proposal::{ClassAssignment, ClassProposal};
use crate::domain::teacher::TeacherCandidate;
use crate::engine::scoring::ProposalScorer;
use tracing::{info, instrument};

pub struct ProposalBuilder {
    scorer: ProposalScorer,
}

impl ProposalBuilder {
    pub fn new() -> Self {
        Self {
            scorer: ProposalScorer::new(),
        }
    }

    /// # Parameters
    /// - `generation_run`: run number within the term (1-based)
    /// - `availability_snapshot`: teacher data the run was computed against
    #[instrument(skip_all, fields(term_id = %term_id, run = generation_run))]
    pub fn build(
        &self,
        term_id: &str,
        generation_run: u32,
        assignments: Vec<ClassAssignment>,
        parameters: GenerationParameters,
        availability_snapshot: Vec<TeacherCandidate>,
        generated_by: &str,
    ) -> ClassProposal {
        let mut proposal = ClassProposal::new(
            term_id,
            generation_run,
            parameters,
            availability_snapshot,
            generated_by,
        );
        proposal.assignments = assignments;
        self.scorer.evaluate(&mut proposal);

        info!(
            proposal_id = %proposal.proposal_id,
            classes = proposal.assignments.len(),
            score = proposal.optimization_score,
            conflicts = proposal.conflict_count,
            size_violations = proposal.size_violations.len(),
            "proposal built"
        );
        proposal
    }
}
