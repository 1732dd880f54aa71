// ==========================================
// Class Generation Engine - teacher candidates
// ==========================================
// Snapshot of teacher competencies and submitted availability,
// captured once at the start of a generation run.
// ==========================================

use crate::domain::types::{Competency, Specialization, TimeSlot};
use serde::{Deserialize, Serialize};

/// Default weekly class limit when availability does not say otherwise
pub const DEFAULT_MAX_CLASSES_PER_WEEK: usize = 6;

// ==========================================
// LevelCompetency - what a teacher may teach
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCompetency {
    pub level_id: String,
    pub competency: Competency,
    #[serde(default)]
    pub specialization: Specialization,
    #[serde(default)]
    pub max_classes_for_level: Option<usize>, // per-level cap, None = only weekly cap applies
}

// ==========================================
// SlotAvailability - one declared slot
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub slot: TimeSlot,
    pub capacity: u32, // 0 = declared but unavailable
}

// ==========================================
// TeacherCandidate
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherCandidate {
    pub teacher_id: String,
    pub competencies: Vec<LevelCompetency>,
    pub availability: Vec<SlotAvailability>,
    pub max_classes_per_week: usize,
}

impl TeacherCandidate {
    pub fn new(teacher_id: impl Into<String>, max_classes_per_week: usize) -> Self {
        Self {
            teacher_id: teacher_id.into(),
            competencies: Vec::new(),
            availability: Vec::new(),
            max_classes_per_week,
        }
    }

    pub fn with_competency(mut self, level_id: impl Into<String>, competency: Competency) -> Self {
        self.competencies.push(LevelCompetency {
            level_id: level_id.into(),
            competency,
            specialization: Specialization::Mixed,
            max_classes_for_level: None,
        });
        self
    }

    pub fn with_slot(mut self, slot: TimeSlot) -> Self {
        self.availability.push(SlotAvailability { slot, capacity: 1 });
        self
    }

    /// Highest competency held for the level
    pub fn competency_for(&self, level_id: &str) -> Option<&LevelCompetency> {
        self.competencies
            .iter()
            .filter(|c| c.level_id == level_id)
            .max_by_key(|c| c.competency)
    }

    /// Declared slots with positive capacity
    pub fn usable_slots(&self) -> impl Iterator<Item = &TimeSlot> {
        self.availability.iter().filter(|a| a.capacity > 0).map(|a| &a.slot)
    }

    pub fn has_any_availability(&self) -> bool {
        self.usable_slots().next().is_some()
    }
}
