// ==========================================
// Class Generation Engine - generation pipeline
// ==========================================
// Availability index + cohort -> partitioner -> assigner -> builder
// Single pass, CPU-bound, no I/O. A cancelled run returns nothing.
// ==========================================

use crate::domain::cohort::{AssessedStudent, Level};
use crate::domain::params::GenerationParameters;
use crate::domain::proposal::ClassProposal;
use crate::domain::teacher::TeacherCandidate;
use crate::engine::assigner::TeacherAssigner;
use crate::engine::availability::AvailabilityIndex;
use crate::engine::builder::ProposalBuilder;
use crate::engine::cancel::CancellationFlag;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::partitioner::CohortPartitioner;
use tracing::{debug, info, instrument};

// ==========================================
// GenerationInput - everything one run reads
// ==========================================
#[derive(Debug, Clone)]
pub struct GenerationInput {
    pub term_id: String,
    pub generation_run: u32,
    pub levels: Vec<Level>,
    pub students: Vec<AssessedStudent>,
    pub teachers: Vec<TeacherCandidate>, // becomes the availability snapshot
    pub parameters: GenerationParameters,
    pub actor: String,
}

// ==========================================
// GenerationOrchestrator
// ==========================================
pub struct GenerationOrchestrator {
    partitioner: CohortPartitioner,
    assigner: TeacherAssigner,
    builder: ProposalBuilder,
}

impl GenerationOrchestrator {
    pub fn new() -> Self {
        Self {
            partitioner: CohortPartitioner::new(),
            assigner: TeacherAssigner::new(),
            builder: ProposalBuilder::new(),
        }
    }

    /// Run the full pipeline and return a GENERATED proposal
    ///
    /// # Errors
    /// - `MalformedInput`: invalid parameters, unknown level, duplicate student
    /// - `Cancelled`: the flag was raised during the run
    #[instrument(skip_all, fields(term_id = %input.term_id, run = input.generation_run))]
    pub fn run(&self, input: GenerationInput, cancel: &CancellationFlag) -> EngineResult<ClassProposal> {
        info!(
            students = input.students.len(),
            teachers = input.teachers.len(),
            levels = input.levels.len(),
            "generation started"
        );

        let problems = input.parameters.validate();
        if !problems.is_empty() {
            return Err(EngineError::MalformedInput(problems.join("; ")));
        }

        // ==========================================
        // Step 1: partition cohort
        // ==========================================
        let classes = self
            .partitioner
            .partition(&input.levels, &input.students, &input.parameters)?;
        debug!(classes = classes.len(), "cohort partitioned");

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        // ==========================================
        // Step 2: assign teachers and slots
        // ==========================================
        let mut index = AvailabilityIndex::build(&input.teachers, input.parameters.max_classes_per_teacher);
        let assignments = self
            .assigner
            .assign(classes, &mut index, &input.parameters, cancel)?;

        // ==========================================
        // Step 3: score and wrap
        // ==========================================
        let proposal = self.builder.build(
            &input.term_id,
            input.generation_run,
            assignments,
            input.parameters,
            input.teachers,
            &input.actor,
        );

        info!(
            proposal_id = %proposal.proposal_id,
            score = proposal.optimization_score,
            conflicts = proposal.conflict_count,
            "generation finished"
        );
        Ok(proposal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Competency, DayOfWeek, Session, TimeSlot};
    use std::collections::HashSet;

    fn input() -> GenerationInput {
        let levels = vec![
            Level::new("L1", "Tahsin 1", 1),
            Level::new("L2", "Tahsin 2", 2),
        ];
        let mut students = Vec::new();
        for i in 0..18 {
            students.push(AssessedStudent::new_student(format!("N{:02}", i), if i % 2 == 0 { "L1" } else { "L2" }));
        }
        for i in 0..9 {
            students.push(AssessedStudent::existing_student(
                format!("E{:02}", i),
                "L1",
                Some("OLD-1".to_string()),
            ));
        }
        let teachers = vec![
            TeacherCandidate::new("T1", 6)
                .with_competency("L1", Competency::Senior)
                .with_competency("L2", Competency::Junior)
                .with_slot(TimeSlot::new(DayOfWeek::Monday, Session::Sesi1))
                .with_slot(TimeSlot::new(DayOfWeek::Monday, Session::Sesi2)),
            TeacherCandidate::new("T2", 6)
                .with_competency("L2", Competency::Expert)
                .with_slot(TimeSlot::new(DayOfWeek::Monday, Session::Sesi1)),
        ];
        GenerationInput {
            term_id: "TERM-1".to_string(),
            generation_run: 1,
            levels,
            students,
            teachers,
            parameters: GenerationParameters::default(),
            actor: "admin".to_string(),
        }
    }

    #[test]
    fn test_every_student_placed_once() {
        let proposal = GenerationOrchestrator::new()
            .run(input(), &CancellationFlag::new())
            .unwrap();

        let mut seen = HashSet::new();
        for a in &proposal.assignments {
            for s in &a.class.students {
                assert!(seen.insert(s.student_id.clone()), "duplicate {}", s.student_id);
            }
        }
        assert_eq!(seen.len(), 27);
    }

    #[test]
    fn test_deterministic_content() {
        let orchestrator = GenerationOrchestrator::new();
        let a = orchestrator.run(input(), &CancellationFlag::new()).unwrap();
        let b = orchestrator.run(input(), &CancellationFlag::new()).unwrap();
        assert_eq!(
            serde_json::to_string(&a.assignments).unwrap(),
            serde_json::to_string(&b.assignments).unwrap()
        );
        assert_eq!(a.optimization_score, b.optimization_score);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut bad = input();
        bad.parameters.default_min_class_size = 0;
        let err = GenerationOrchestrator::new()
            .run(bad, &CancellationFlag::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedInput(_)));
    }

    #[test]
    fn test_cancelled_before_assignment() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let err = GenerationOrchestrator::new().run(input(), &cancel).unwrap_err();
        assert_eq!(err, EngineError::Cancelled);
    }
}
