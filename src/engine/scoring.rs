// ==========================================
// Class Generation Engine - proposal scoring
// ==========================================
// Score = 100 x (0.40 assigned + 0.30 size_ok + 0.15 workload + 0.15 mix)
// rounded to one decimal, clamped to [0, 100]. Empty proposal = 100.
// Conflict count = unresolved classes + duplicate (teacher, slot) uses.
// ==========================================

use crate::domain::params::GenerationParameters;
use crate::domain::proposal::{
    ClassAssignment, ClassProposal, ProposalMetrics, SizeViolation, SizeViolationKind,
};
use crate::domain::teacher::TeacherCandidate;
use crate::domain::types::{CategoryMixPolicy, StudentCategory, TimeSlot};
use crate::engine::availability::AvailabilityIndex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const WEIGHT_ASSIGNED: f64 = 0.40;
pub const WEIGHT_SIZE_OK: f64 = 0.30;
pub const WEIGHT_WORKLOAD: f64 = 0.15;
pub const WEIGHT_MIX: f64 = 0.15;

// ==========================================
// ScoreBreakdown
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub assigned_fraction: f64,
    pub size_ok_fraction: f64,
    pub workload_balance: f64,
    pub mix_adherence: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        let raw = 100.0
            * (WEIGHT_ASSIGNED * self.assigned_fraction
                + WEIGHT_SIZE_OK * self.size_ok_fraction
                + WEIGHT_WORKLOAD * self.workload_balance
                + WEIGHT_MIX * self.mix_adherence);
        ((raw * 10.0).round() / 10.0).clamp(0.0, 100.0)
    }
}

// ==========================================
// ProposalScorer
// ==========================================
pub struct ProposalScorer {}

impl ProposalScorer {
    pub fn new() -> Self {
        Self {}
    }

    /// Recompute violations, conflicts, score and metrics in place
    pub fn evaluate(&self, proposal: &mut ClassProposal) {
        proposal.size_violations = self.size_violations(&proposal.assignments, &proposal.parameters);
        proposal.conflict_count = self.conflict_count(&proposal.assignments);
        proposal.optimization_score = self.breakdown(&proposal.assignments, &proposal.parameters).total();
        proposal.metrics = self.metrics(
            &proposal.assignments,
            &proposal.availability_snapshot,
            proposal.parameters.max_classes_per_teacher,
        );
    }

    // ==========================================
    // Size violations
    // ==========================================

    pub fn size_violations(
        &self,
        assignments: &[ClassAssignment],
        params: &GenerationParameters,
    ) -> Vec<SizeViolation> {
        assignments
            .iter()
            .filter_map(|a| {
                let class = &a.class;
                let size = class.size();
                let (kind, delta) = if size < class.min_size {
                    (SizeViolationKind::Undersized, size as i64 - class.min_size as i64)
                } else if size > class.max_size {
                    (SizeViolationKind::Oversized, size as i64 - class.max_size as i64)
                } else {
                    return None;
                };
                let requires_approval = match kind {
                    SizeViolationKind::Undersized => !params.allow_undersized_classes,
                    SizeViolationKind::Oversized => true,
                };
                Some(SizeViolation {
                    class_id: class.class_id.clone(),
                    kind,
                    current_size: size,
                    target_min: class.min_size,
                    target_max: class.max_size,
                    delta,
                    requires_approval,
                    approved: false,
                })
            })
            .collect()
    }

    // ==========================================
    // Conflicts
    // ==========================================

    pub fn conflict_count(&self, assignments: &[ClassAssignment]) -> usize {
        let unresolved = assignments.iter().filter(|a| !a.is_assigned()).count();

        let mut seen: BTreeSet<(&str, TimeSlot)> = BTreeSet::new();
        let mut double_booked = 0;
        for a in assignments {
            if let (Some(teacher_id), Some(slot)) = (a.teacher_id(), a.slot()) {
                if !seen.insert((teacher_id, slot)) {
                    double_booked += 1;
                }
            }
        }

        unresolved + double_booked
    }

    // ==========================================
    // Score
    // ==========================================

    pub fn breakdown(&self, assignments: &[ClassAssignment], params: &GenerationParameters) -> ScoreBreakdown {
        if assignments.is_empty() {
            return ScoreBreakdown {
                assigned_fraction: 1.0,
                size_ok_fraction: 1.0,
                workload_balance: 1.0,
                mix_adherence: 1.0,
            };
        }

        let total = assignments.len() as f64;
        let assigned = assignments.iter().filter(|a| a.is_assigned()).count() as f64;
        let size_ok = assignments.iter().filter(|a| a.class.is_within_bounds()).count() as f64;

        ScoreBreakdown {
            assigned_fraction: assigned / total,
            size_ok_fraction: size_ok / total,
            workload_balance: 1.0 / (1.0 + variance(&teacher_loads(assignments))),
            mix_adherence: mix_adherence(assignments, params),
        }
    }

    // ==========================================
    // Metrics
    // ==========================================

    pub fn metrics(
        &self,
        assignments: &[ClassAssignment],
        snapshot: &[TeacherCandidate],
        max_classes_per_teacher: usize,
    ) -> ProposalMetrics {
        let total_classes = assignments.len();
        let assigned: Vec<&ClassAssignment> = assignments.iter().filter(|a| a.is_assigned()).collect();
        let total_students_assigned = assigned.iter().map(|a| a.class.size()).sum();
        let all_students: usize = assignments.iter().map(|a| a.class.size()).sum();

        let loads = teacher_loads(assignments);
        let total_teacher_slots = AvailabilityIndex::build(snapshot, max_classes_per_teacher).total_slots();

        let mut class_type_distribution = BTreeMap::new();
        for a in assignments {
            *class_type_distribution
                .entry(a.class.class_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        ProposalMetrics {
            total_classes,
            total_students_assigned,
            unassigned_classes: total_classes - assigned.len(),
            average_class_size: if total_classes == 0 {
                0.0
            } else {
                round2(all_students as f64 / total_classes as f64)
            },
            teachers_utilized: loads.len(),
            total_teacher_slots,
            teacher_utilization_rate: if total_teacher_slots == 0 {
                0.0
            } else {
                round2(assigned.len() as f64 / total_teacher_slots as f64)
            },
            class_type_distribution,
            workload_std_dev: round2(variance(&loads).sqrt()),
        }
    }
}

/// Classes per assigned teacher
fn teacher_loads(assignments: &[ClassAssignment]) -> Vec<f64> {
    let mut loads: BTreeMap<&str, usize> = BTreeMap::new();
    for teacher_id in assignments.iter().filter_map(|a| a.teacher_id()) {
        *loads.entry(teacher_id).or_insert(0) += 1;
    }
    loads.values().map(|v| *v as f64).collect()
}

/// Population variance, 0 for fewer than two values
fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// Mean of 1 - |NEW fraction - target| over classes whose level mixes both categories
fn mix_adherence(assignments: &[ClassAssignment], params: &GenerationParameters) -> f64 {
    if params.student_category_mix != CategoryMixPolicy::Mixed {
        return 1.0;
    }

    let mut level_categories: HashMap<&str, (bool, bool)> = HashMap::new();
    for a in assignments {
        let entry = level_categories.entry(a.class.level_id.as_str()).or_insert((false, false));
        for s in &a.class.students {
            match s.category {
                StudentCategory::New => entry.0 = true,
                StudentCategory::Existing => entry.1 = true,
            }
        }
    }

    let scores: Vec<f64> = assignments
        .iter()
        .filter(|a| {
            level_categories
                .get(a.class.level_id.as_str())
                .map(|(has_new, has_existing)| *has_new && *has_existing)
                .unwrap_or(false)
        })
        .filter_map(|a| a.class.new_fraction())
        .map(|fraction| 1.0 - (fraction - params.new_student_ratio).abs())
        .collect();

    if scores.is_empty() {
        1.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
