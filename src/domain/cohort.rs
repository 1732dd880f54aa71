// ==========================================
// Class Generation Engine - assessed cohort
// ==========================================
// Level catalog and placement results consumed from the
// registration collaborator. Read-only inside a run.
// ==========================================

use crate::domain::types::{Competency, StudentCategory};
use serde::{Deserialize, Serialize};

// ==========================================
// Level - ordered curriculum level
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub level_id: String,
    pub name: String,
    pub order_number: u32, // curriculum position, lower comes first
    #[serde(default)]
    pub required_competency: Competency, // minimum teacher competency
}

impl Level {
    pub fn new(level_id: impl Into<String>, name: impl Into<String>, order_number: u32) -> Self {
        Self {
            level_id: level_id.into(),
            name: name.into(),
            order_number,
            required_competency: Competency::Junior,
        }
    }

    pub fn with_required_competency(mut self, competency: Competency) -> Self {
        self.required_competency = competency;
        self
    }
}

// ==========================================
// AssessedStudent - placed student
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessedStudent {
    pub student_id: String,
    pub level_id: String,             // determined level
    pub category: StudentCategory,    // NEW / EXISTING
    #[serde(default)]
    pub prior_class_id: Option<String>, // previous class, EXISTING only
}

impl AssessedStudent {
    pub fn new_student(student_id: impl Into<String>, level_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            level_id: level_id.into(),
            category: StudentCategory::New,
            prior_class_id: None,
        }
    }

    pub fn existing_student(
        student_id: impl Into<String>,
        level_id: impl Into<String>,
        prior_class_id: Option<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            level_id: level_id.into(),
            category: StudentCategory::Existing,
            prior_class_id,
        }
    }
}
