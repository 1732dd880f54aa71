// ==========================================
// Class Generation Engine - teacher assigner
// ==========================================
// Scope: pick one (teacher, slot) per candidate class
// Input: candidate classes + availability index + parameters
// Output: one ClassAssignment per class, in partition order
// Rule: never aborts on an unassignable class, it stays unresolved
// Rule: identical input gives identical output (stable keys only)
// ==========================================

use crate::domain::params::GenerationParameters;
use crate::domain::proposal::{AssignmentStatus, CandidateClass, ClassAssignment, UnresolvedReason};
use crate::domain::types::PriorityStrategy;
use crate::engine::availability::AvailabilityIndex;
use crate::engine::cancel::CancellationFlag;
use crate::engine::error::{EngineError, EngineResult};
use std::cmp::{Ordering, Reverse};
use tracing::{debug, info, instrument};

// ==========================================
// TeacherAssigner
// ==========================================
pub struct TeacherAssigner {}

impl TeacherAssigner {
    pub fn new() -> Self {
        Self {}
    }

    /// Assign teachers and slots to every candidate class
    ///
    /// # Parameters
    /// - `classes`: partitioner output
    /// - `index`: availability index, reservations are recorded into it
    /// - `params`: strategy and workload flag
    /// - `cancel`: polled between classes
    #[instrument(skip_all, fields(classes = classes.len(), strategy = params.priority_strategy.as_str()))]
    pub fn assign(
        &self,
        classes: Vec<CandidateClass>,
        index: &mut AvailabilityIndex,
        params: &GenerationParameters,
        cancel: &CancellationFlag,
    ) -> EngineResult<Vec<ClassAssignment>> {
        let order = self.processing_order(&classes, index, params.priority_strategy);
        let mut statuses: Vec<Option<AssignmentStatus>> = vec![None; classes.len()];

        for i in order {
            if cancel.is_cancelled() {
                info!("assignment cancelled");
                return Err(EngineError::Cancelled);
            }

            let class = &classes[i];
            let status = self.assign_one(class, index, params);
            debug!(class_id = %class.class_id, status = ?status, "class processed");
            statuses[i] = Some(status);
        }

        Ok(classes
            .into_iter()
            .zip(statuses)
            .map(|(class, status)| ClassAssignment {
                class,
                status: status.unwrap_or(AssignmentStatus::Unresolved {
                    reason: UnresolvedReason::NoQualifiedTeacher,
                }),
            })
            .collect())
    }

    // ==========================================
    // Processing order
    // ==========================================

    /// Class indices in the order the strategy processes them
    pub fn processing_order(
        &self,
        classes: &[CandidateClass],
        index: &AvailabilityIndex,
        strategy: PriorityStrategy,
    ) -> Vec<usize> {
        let mut order: Vec<usize> = (0..classes.len()).collect();

        match strategy {
            PriorityStrategy::MinimizeClasses => order.sort_by(|&a, &b| {
                classes[b]
                    .size()
                    .cmp(&classes[a].size())
                    .then_with(|| classes[a].class_id.cmp(&classes[b].class_id))
            }),
            PriorityStrategy::Balance => order.sort_by(|&a, &b| {
                classes[a]
                    .level_order
                    .cmp(&classes[b].level_order)
                    .then_with(|| classes[a].class_id.cmp(&classes[b].class_id))
            }),
            PriorityStrategy::MaximizeTeacherFit => {
                let options: Vec<usize> = classes
                    .iter()
                    .map(|class| self.option_count(class, index))
                    .collect();
                order.sort_by(|&a, &b| {
                    options[a]
                        .cmp(&options[b])
                        .then_with(|| classes[a].class_id.cmp(&classes[b].class_id))
                });
            }
        }

        order
    }

    /// Eligible (teacher, slot) pairs for a class before any reservation
    fn option_count(&self, class: &CandidateClass, index: &AvailabilityIndex) -> usize {
        index
            .eligible_teachers(&class.level_id, class.required_competency)
            .into_iter()
            .map(|t| index.free_slots(t).len())
            .sum()
    }

    // ==========================================
    // Single class
    // ==========================================

    fn assign_one(
        &self,
        class: &CandidateClass,
        index: &mut AvailabilityIndex,
        params: &GenerationParameters,
    ) -> AssignmentStatus {
        let eligible = index.eligible_teachers(&class.level_id, class.required_competency);
        if eligible.is_empty() {
            return AssignmentStatus::Unresolved {
                reason: UnresolvedReason::NoQualifiedTeacher,
            };
        }

        let with_quota: Vec<&str> = eligible
            .into_iter()
            .filter(|t| index.remaining_level_quota(t, &class.level_id) > 0)
            .collect();
        if with_quota.is_empty() {
            return AssignmentStatus::Unresolved {
                reason: UnresolvedReason::TeacherQuotaExhausted,
            };
        }

        let mut candidates: Vec<&str> = with_quota
            .into_iter()
            .filter(|t| !index.free_slots(t).is_empty())
            .collect();
        if candidates.is_empty() {
            return AssignmentStatus::Unresolved {
                reason: UnresolvedReason::NoFreeSlot,
            };
        }

        candidates.sort_by(|a, b| {
            compare_teachers(index, &class.level_id, a, b, params.optimize_for_teacher_workload)
        });

        let teacher_id = candidates[0].to_string();
        let slot = index.free_slots(&teacher_id)[0];
        match index.reserve(&teacher_id, &class.level_id, slot) {
            Ok(()) => AssignmentStatus::Assigned { teacher_id, slot },
            // unreachable with the filters above, kept as unresolved to stay total
            Err(_) => AssignmentStatus::Unresolved {
                reason: UnresolvedReason::NoFreeSlot,
            },
        }
    }
}

/// Teacher ranking, best first
///
/// Default: competency desc, fewer levels taught, lighter load, id.
/// Workload mode: most remaining quota, most free slots, competency desc, id.
fn compare_teachers(
    index: &AvailabilityIndex,
    level_id: &str,
    a: &str,
    b: &str,
    optimize_for_workload: bool,
) -> Ordering {
    let competency = |t: &str| index.competency(t, level_id).map(|c| c.competency);

    if optimize_for_workload {
        Reverse(index.remaining_quota(a))
            .cmp(&Reverse(index.remaining_quota(b)))
            .then_with(|| Reverse(index.free_slots(a).len()).cmp(&Reverse(index.free_slots(b).len())))
            .then_with(|| competency(b).cmp(&competency(a)))
            .then_with(|| a.cmp(b))
    } else {
        competency(b)
            .cmp(&competency(a))
            .then_with(|| index.levels_taught(a).cmp(&index.levels_taught(b)))
            .then_with(|| index.load(a).cmp(&index.load(b)))
            .then_with(|| a.cmp(b))
    }
}
