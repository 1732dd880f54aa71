// ==========================================
// Class Generation Engine - refinement engine
// ==========================================
// Scope: reviewer edits on a GENERATED/REFINING proposal
// Rule: a transfer that breaks size or mix is recorded, never rejected
// Rule: teacher/slot changes are explicit and fully validated
// Rule: every accepted edit bumps the revision and appends an override
// ==========================================

use crate::domain::proposal::{AssignmentStatus, ClassProposal, ManualOverride, OverrideKind};
use crate::domain::types::{ProposalStatus, TimeSlot};
use crate::engine::availability::AvailabilityIndex;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::scoring::ProposalScorer;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

// ==========================================
// Refinement view (reviewer screen data)
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementClassView {
    pub class_id: String,
    pub level_id: String,
    pub level_name: String,
    pub size: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub new_count: usize,
    pub existing_count: usize,
    pub class_type: String,
    pub teacher_id: Option<String>,
    pub slot: Option<TimeSlot>,
    pub student_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementTeacherView {
    pub teacher_id: String,
    pub current_classes: usize,
    pub max_classes: usize,
    pub remaining_quota: usize,
    pub levels: Vec<String>,
    pub free_slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementView {
    pub proposal_id: String,
    pub revision: u64,
    pub status: ProposalStatus,
    pub optimization_score: f64,
    pub conflict_count: usize,
    pub classes: Vec<RefinementClassView>,
    pub teachers: Vec<RefinementTeacherView>,
}

// ==========================================
// RefinementEngine
// ==========================================
pub struct RefinementEngine {
    scorer: ProposalScorer,
}

impl RefinementEngine {
    pub fn new() -> Self {
        Self {
            scorer: ProposalScorer::new(),
        }
    }

    /// Move one student between two classes of the proposal
    ///
    /// # Errors
    /// - `InvalidState`: proposal approved, published or rejected
    /// - `NotFound`: unknown class, or student not in `from_class_id`
    /// - `MalformedInput`: source and target are the same class
    #[instrument(skip(self, proposal), fields(proposal_id = %proposal.proposal_id))]
    pub fn transfer_student(
        &self,
        proposal: &mut ClassProposal,
        student_id: &str,
        from_class_id: &str,
        to_class_id: &str,
        actor: &str,
    ) -> EngineResult<()> {
        ensure_mutable(proposal, "transfer_student")?;

        let from_idx = class_index(proposal, from_class_id)?;
        let to_idx = class_index(proposal, to_class_id)?;
        if from_idx == to_idx {
            return Err(EngineError::MalformedInput(format!(
                "student {} is already in class {}",
                student_id, to_class_id
            )));
        }

        let position = proposal.assignments[from_idx]
            .class
            .students
            .iter()
            .position(|s| s.student_id == student_id)
            .ok_or_else(|| EngineError::NotFound {
                entity: "student in class",
                id: format!("{}@{}", student_id, from_class_id),
            })?;

        let member = proposal.assignments[from_idx].class.students.remove(position);
        proposal.assignments[to_idx].class.students.push(member);
        proposal.assignments[from_idx].class.recompute_mix();
        proposal.assignments[to_idx].class.recompute_mix();

        self.record_override(
            proposal,
            OverrideKind::StudentTransfer {
                student_id: student_id.to_string(),
                from_class_id: from_class_id.to_string(),
                to_class_id: to_class_id.to_string(),
            },
            actor,
        );

        info!(
            student_id,
            from_class_id,
            to_class_id,
            revision = proposal.revision,
            size_violations = proposal.size_violations.len(),
            "student transferred"
        );
        Ok(())
    }

    /// Put a class on a given teacher and slot
    ///
    /// Checked against the availability snapshot: competency, declared slot,
    /// weekly and level quota (this class excluded), no double-booking.
    #[instrument(skip(self, proposal), fields(proposal_id = %proposal.proposal_id))]
    pub fn reassign_teacher(
        &self,
        proposal: &mut ClassProposal,
        class_id: &str,
        teacher_id: &str,
        slot: TimeSlot,
        actor: &str,
    ) -> EngineResult<()> {
        ensure_mutable(proposal, "reassign_teacher")?;

        let idx = class_index(proposal, class_id)?;
        if proposal.teacher(teacher_id).is_none() {
            return Err(EngineError::NotFound {
                entity: "teacher",
                id: teacher_id.to_string(),
            });
        }

        let mut index = self.index_without(proposal, idx);
        let class = &proposal.assignments[idx].class;

        let holds_level = index
            .competency(teacher_id, &class.level_id)
            .map(|c| c.competency >= class.required_competency)
            .unwrap_or(false);
        if !holds_level {
            return Err(EngineError::ConstraintViolation(format!(
                "teacher {} is not qualified for level {} at {}",
                teacher_id, class.level_id, class.required_competency
            )));
        }
        if !index.declares_slot(teacher_id, &slot) {
            return Err(EngineError::ConstraintViolation(format!(
                "teacher {} is not available at {}",
                teacher_id, slot
            )));
        }
        let level_id = class.level_id.clone();
        index.reserve(teacher_id, &level_id, slot)?;

        let previous = std::mem::replace(
            &mut proposal.assignments[idx].status,
            AssignmentStatus::Assigned {
                teacher_id: teacher_id.to_string(),
                slot,
            },
        );
        let (old_teacher_id, old_slot) = match previous {
            AssignmentStatus::Assigned { teacher_id, slot } => (Some(teacher_id), Some(slot)),
            AssignmentStatus::Unresolved { .. } => (None, None),
        };

        self.record_override(
            proposal,
            OverrideKind::TeacherReassignment {
                class_id: class_id.to_string(),
                old_teacher_id,
                old_slot,
                new_teacher_id: teacher_id.to_string(),
                new_slot: slot,
            },
            actor,
        );

        info!(class_id, teacher_id, slot = %slot, revision = proposal.revision, "teacher reassigned");
        Ok(())
    }

    /// Classes plus teacher capacity for the reviewer screen
    pub fn refinement_view(&self, proposal: &ClassProposal) -> RefinementView {
        let index = self.index_without(proposal, usize::MAX);

        let classes = proposal
            .assignments
            .iter()
            .map(|a| RefinementClassView {
                class_id: a.class.class_id.clone(),
                level_id: a.class.level_id.clone(),
                level_name: a.class.level_name.clone(),
                size: a.class.size(),
                min_size: a.class.min_size,
                max_size: a.class.max_size,
                new_count: a.class.category_mix.new_count,
                existing_count: a.class.category_mix.existing_count,
                class_type: a.class.class_type.as_str().to_string(),
                teacher_id: a.teacher_id().map(|t| t.to_string()),
                slot: a.slot(),
                student_ids: a.class.students.iter().map(|s| s.student_id.clone()).collect(),
            })
            .collect();

        let teachers = index
            .teacher_ids()
            .map(|teacher_id| {
                let levels = proposal
                    .teacher(teacher_id)
                    .map(|t| {
                        let mut levels: Vec<String> =
                            t.competencies.iter().map(|c| c.level_id.clone()).collect();
                        levels.sort();
                        levels.dedup();
                        levels
                    })
                    .unwrap_or_default();
                RefinementTeacherView {
                    teacher_id: teacher_id.to_string(),
                    current_classes: index.load(teacher_id),
                    max_classes: index.weekly_cap(teacher_id),
                    remaining_quota: index.remaining_quota(teacher_id),
                    levels,
                    free_slots: index.free_slots(teacher_id),
                }
            })
            .collect();

        RefinementView {
            proposal_id: proposal.proposal_id.clone(),
            revision: proposal.revision,
            status: proposal.status,
            optimization_score: proposal.optimization_score,
            conflict_count: proposal.conflict_count,
            classes,
            teachers,
        }
    }

    // ==========================================
    // Internal helpers
    // ==========================================

    /// Index over the snapshot with every assignment except `skip` reserved
    fn index_without(&self, proposal: &ClassProposal, skip: usize) -> AvailabilityIndex {
        let mut index = AvailabilityIndex::build(
            &proposal.availability_snapshot,
            proposal.parameters.max_classes_per_teacher,
        );
        for (i, a) in proposal.assignments.iter().enumerate() {
            if i == skip {
                continue;
            }
            if let AssignmentStatus::Assigned { teacher_id, slot } = &a.status {
                // earlier manual data may already conflict, the view still renders
                let _ = index.reserve(teacher_id, &a.class.level_id, *slot);
            }
        }
        index
    }

    fn record_override(&self, proposal: &mut ClassProposal, kind: OverrideKind, actor: &str) {
        proposal.revision += 1;
        proposal.status = ProposalStatus::Refining;
        proposal.manual_overrides.push(ManualOverride {
            revision: proposal.revision,
            kind,
            actor: actor.to_string(),
            at: chrono::Utc::now().naive_utc(),
        });
        self.scorer.evaluate(proposal);
    }
}

fn ensure_mutable(proposal: &ClassProposal, operation: &'static str) -> EngineResult<()> {
    if proposal.status.is_mutable() {
        Ok(())
    } else {
        Err(EngineError::InvalidState {
            proposal_id: proposal.proposal_id.clone(),
            status: proposal.status,
            operation,
            detail: "proposal is no longer editable".to_string(),
        })
    }
}

fn class_index(proposal: &ClassProposal, class_id: &str) -> EngineResult<usize> {
    proposal
        .assignment_index(class_id)
        .ok_or_else(|| EngineError::NotFound {
            entity: "class",
            id: class_id.to_string(),
        })
}
