// ==========================================
// Class Generation Engine - class proposal aggregate
// ==========================================
// Candidate classes, their assignments, size findings,
// manual overrides and lifecycle stamps.
// Persisted as one JSON document per (term_id, generation_run).
// ==========================================

use crate::domain::params::GenerationParameters;
use crate::domain::teacher::TeacherCandidate;
use crate::domain::types::{ClassType, Competency, ProposalStatus, StudentCategory, TimeSlot};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;

// ==========================================
// ClassMember - student placed in a class
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMember {
    pub student_id: String,
    pub category: StudentCategory,
    #[serde(default)]
    pub prior_class_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMix {
    pub new_count: usize,
    pub existing_count: usize,
}

// ==========================================
// CandidateClass - one bucket of students
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateClass {
    pub class_id: String,          // "<level_id>-<nn>", stable across runs
    pub level_id: String,
    pub level_name: String,
    pub level_order: u32,
    #[serde(default)]
    pub required_competency: Competency,
    pub students: Vec<ClassMember>, // ordered
    pub category_mix: CategoryMix,
    pub class_type: ClassType,
    pub min_size: usize,           // bounds in force for the level
    pub max_size: usize,
}

impl CandidateClass {
    pub fn size(&self) -> usize {
        self.students.len()
    }

    pub fn contains(&self, student_id: &str) -> bool {
        self.students.iter().any(|s| s.student_id == student_id)
    }

    pub fn is_within_bounds(&self) -> bool {
        self.size() >= self.min_size && self.size() <= self.max_size
    }

    /// Fraction of NEW students, None for an empty class
    pub fn new_fraction(&self) -> Option<f64> {
        if self.students.is_empty() {
            None
        } else {
            Some(self.category_mix.new_count as f64 / self.students.len() as f64)
        }
    }

    /// Recount categories after membership changes
    pub fn recompute_mix(&mut self) {
        let new_count = self
            .students
            .iter()
            .filter(|s| s.category == StudentCategory::New)
            .count();
        self.category_mix = CategoryMix {
            new_count,
            existing_count: self.students.len() - new_count,
        };
        self.class_type = ClassType::from_mix(&self.category_mix);
    }
}

impl ClassType {
    /// An empty class keeps the mixed label
    pub fn from_mix(mix: &CategoryMix) -> Self {
        match (mix.new_count, mix.existing_count) {
            (n, 0) if n > 0 => ClassType::NewOnly,
            (0, e) if e > 0 => ClassType::ExistingOnly,
            _ => ClassType::Mixed,
        }
    }
}

// ==========================================
// Assignment status
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnresolvedReason {
    NoQualifiedTeacher,     // nobody holds the level at the required competency
    NoFreeSlot,             // qualified teachers have no free slot left
    TeacherQuotaExhausted,  // qualified teachers hit their weekly or level cap
}

impl UnresolvedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnresolvedReason::NoQualifiedTeacher => "NO_QUALIFIED_TEACHER",
            UnresolvedReason::NoFreeSlot => "NO_FREE_SLOT",
            UnresolvedReason::TeacherQuotaExhausted => "TEACHER_QUOTA_EXHAUSTED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Assigned { teacher_id: String, slot: TimeSlot },
    Unresolved { reason: UnresolvedReason },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAssignment {
    pub class: CandidateClass,
    pub status: AssignmentStatus,
}

impl ClassAssignment {
    pub fn teacher_id(&self) -> Option<&str> {
        match &self.status {
            AssignmentStatus::Assigned { teacher_id, .. } => Some(teacher_id.as_str()),
            AssignmentStatus::Unresolved { .. } => None,
        }
    }

    pub fn slot(&self) -> Option<TimeSlot> {
        match &self.status {
            AssignmentStatus::Assigned { slot, .. } => Some(*slot),
            AssignmentStatus::Unresolved { .. } => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self.status, AssignmentStatus::Assigned { .. })
    }
}

// ==========================================
// SizeViolation
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizeViolationKind {
    Undersized,
    Oversized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeViolation {
    pub class_id: String,
    pub kind: SizeViolationKind,
    pub current_size: usize,
    pub target_min: usize,
    pub target_max: usize,
    pub delta: i64,              // size - min (< 0) or size - max (> 0)
    pub requires_approval: bool,
    pub approved: bool,
}

// ==========================================
// ManualOverride - one reviewer edit
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideKind {
    StudentTransfer {
        student_id: String,
        from_class_id: String,
        to_class_id: String,
    },
    TeacherReassignment {
        class_id: String,
        old_teacher_id: Option<String>,
        old_slot: Option<TimeSlot>,
        new_teacher_id: String,
        new_slot: TimeSlot,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub revision: u64, // revision produced by this edit
    pub kind: OverrideKind,
    pub actor: String,
    pub at: NaiveDateTime,
}

// ==========================================
// ProposalMetrics - summary figures
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposalMetrics {
    pub total_classes: usize,
    pub total_students_assigned: usize, // students in classes with a teacher
    pub unassigned_classes: usize,
    pub average_class_size: f64,
    pub teachers_utilized: usize,
    pub total_teacher_slots: usize,     // usable (teacher, slot) pairs in the snapshot
    pub teacher_utilization_rate: f64,  // assigned classes / total_teacher_slots
    pub class_type_distribution: BTreeMap<String, usize>,
    pub workload_std_dev: f64,          // classes per utilized teacher
}

// ==========================================
// ClassProposal - aggregate root
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProposal {
    // ===== identity =====
    pub proposal_id: String,
    pub term_id: String,
    pub generation_run: u32,     // 1-based run number within the term
    pub revision: u64,           // bumped on every accepted mutation
    pub status: ProposalStatus,

    // ===== content =====
    pub assignments: Vec<ClassAssignment>,
    pub optimization_score: f64,
    pub conflict_count: usize,
    pub size_violations: Vec<SizeViolation>,
    pub manual_overrides: Vec<ManualOverride>,
    pub metrics: ProposalMetrics,

    // ===== run inputs =====
    pub parameters: GenerationParameters,
    pub availability_snapshot: Vec<TeacherCandidate>,

    // ===== lifecycle stamps =====
    pub generated_by: String,
    pub generated_at: NaiveDateTime,
    pub approved_by: Option<String>,
    pub approved_at: Option<NaiveDateTime>,
    pub approval_override_reason: Option<String>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<NaiveDateTime>,
    pub rejection_reason: Option<String>,
    pub published_by: Option<String>,
    pub published_at: Option<NaiveDateTime>,
}

impl ClassProposal {
    /// Fresh GENERATED proposal with no content yet
    pub fn new(
        term_id: impl Into<String>,
        generation_run: u32,
        parameters: GenerationParameters,
        availability_snapshot: Vec<TeacherCandidate>,
        generated_by: impl Into<String>,
    ) -> Self {
        Self {
            proposal_id: uuid::Uuid::new_v4().to_string(),
            term_id: term_id.into(),
            generation_run,
            revision: 1,
            status: ProposalStatus::Generated,
            assignments: Vec::new(),
            optimization_score: 0.0,
            conflict_count: 0,
            size_violations: Vec::new(),
            manual_overrides: Vec::new(),
            metrics: ProposalMetrics::default(),
            parameters,
            availability_snapshot,
            generated_by: generated_by.into(),
            generated_at: chrono::Utc::now().naive_utc(),
            approved_by: None,
            approved_at: None,
            approval_override_reason: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            published_by: None,
            published_at: None,
        }
    }

    pub fn assignment(&self, class_id: &str) -> Option<&ClassAssignment> {
        self.assignments.iter().find(|a| a.class.class_id == class_id)
    }

    pub fn assignment_index(&self, class_id: &str) -> Option<usize> {
        self.assignments.iter().position(|a| a.class.class_id == class_id)
    }

    pub fn unresolved_count(&self) -> usize {
        self.assignments.iter().filter(|a| !a.is_assigned()).count()
    }

    pub fn total_students(&self) -> usize {
        self.assignments.iter().map(|a| a.class.size()).sum()
    }

    pub fn teacher(&self, teacher_id: &str) -> Option<&TeacherCandidate> {
        self.availability_snapshot.iter().find(|t| t.teacher_id == teacher_id)
    }

    /// Compact before/after image for the generation log
    pub fn snapshot(&self) -> JsonValue {
        let classes: Vec<JsonValue> = self
            .assignments
            .iter()
            .map(|a| {
                json!({
                    "class_id": a.class.class_id,
                    "students": a.class.students.iter().map(|s| s.student_id.as_str()).collect::<Vec<_>>(),
                    "teacher_id": a.teacher_id(),
                    "slot": a.slot().map(|s| s.to_string()),
                })
            })
            .collect();

        json!({
            "proposal_id": self.proposal_id,
            "revision": self.revision,
            "status": self.status.to_db_str(),
            "optimization_score": self.optimization_score,
            "conflict_count": self.conflict_count,
            "size_violations": self.size_violations.len(),
            "classes": classes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{DayOfWeek, Session};

    fn member(id: &str, category: StudentCategory) -> ClassMember {
        ClassMember {
            student_id: id.to_string(),
            category,
            prior_class_id: None,
        }
    }

    #[test]
    fn test_recompute_mix_updates_class_type() {
        let mut class = CandidateClass {
            class_id: "L1-01".to_string(),
            level_id: "L1".to_string(),
            level_name: "Tahsin 1".to_string(),
            level_order: 1,
            required_competency: Competency::Junior,
            students: vec![member("S1", StudentCategory::New), member("S2", StudentCategory::New)],
            category_mix: CategoryMix::default(),
            class_type: ClassType::Mixed,
            min_size: 1,
            max_size: 5,
        };
        class.recompute_mix();
        assert_eq!(class.class_type, ClassType::NewOnly);
        assert_eq!(class.category_mix.new_count, 2);

        class.students.push(member("S3", StudentCategory::Existing));
        class.recompute_mix();
        assert_eq!(class.class_type, ClassType::Mixed);
        assert_eq!(class.category_mix.existing_count, 1);
    }

    #[test]
    fn test_assignment_status_serialization() {
        let status = AssignmentStatus::Assigned {
            teacher_id: "T1".to_string(),
            slot: TimeSlot::new(DayOfWeek::Monday, Session::Sesi2),
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["state"], "ASSIGNED");
        assert_eq!(value["slot"]["session"], "SESI_2");

        let unresolved = AssignmentStatus::Unresolved {
            reason: UnresolvedReason::NoFreeSlot,
        };
        let value = serde_json::to_value(&unresolved).unwrap();
        assert_eq!(value["reason"], "NO_FREE_SLOT");
    }
}
