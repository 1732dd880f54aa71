// ==========================================
// Class Generation Engine - academic term
// ==========================================

use crate::domain::types::TermStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Term - academic term being planned
// ==========================================
// Aligned with the academic_term table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub term_id: String,          // term identifier
    pub term_name: String,        // display name
    pub status: TermStatus,       // PLANNING / ACTIVE / COMPLETED
    pub created_at: NaiveDateTime,
}

impl Term {
    pub fn new(term_id: impl Into<String>, term_name: impl Into<String>, status: TermStatus) -> Self {
        Self {
            term_id: term_id.into(),
            term_name: term_name.into(),
            status,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Only a term in planning can receive generated classes
    pub fn accepts_generation(&self) -> bool {
        self.status == TermStatus::Planning
    }
}
