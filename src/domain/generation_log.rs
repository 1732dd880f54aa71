// ==========================================
// Class Generation Engine - generation audit log
// ==========================================
// Append-only. Every state-changing attempt on a term or a proposal
// writes one entry, including denied and failed attempts.
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAction {
    Generation,
    ManualEdit,
    Approval,
    Rejection,
    Publication,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Generation => "GENERATION",
            LogAction::ManualEdit => "MANUAL_EDIT",
            LogAction::Approval => "APPROVAL",
            LogAction::Rejection => "REJECTION",
            LogAction::Publication => "PUBLICATION",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GENERATION" => Some(LogAction::Generation),
            "MANUAL_EDIT" => Some(LogAction::ManualEdit),
            "APPROVAL" => Some(LogAction::Approval),
            "REJECTION" => Some(LogAction::Rejection),
            "PUBLICATION" => Some(LogAction::Publication),
            _ => None,
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogOutcome {
    Succeeded,
    Failed, // attempted, collaborator or run failure
    Denied, // refused by a lifecycle guard
}

impl LogOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogOutcome::Succeeded => "SUCCEEDED",
            LogOutcome::Failed => "FAILED",
            LogOutcome::Denied => "DENIED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SUCCEEDED" => Some(LogOutcome::Succeeded),
            "FAILED" => Some(LogOutcome::Failed),
            "DENIED" => Some(LogOutcome::Denied),
            _ => None,
        }
    }
}

// ==========================================
// GenerationLog - one audit entry
// ==========================================
// Aligned with the generation_log table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationLog {
    pub log_id: String,
    pub term_id: String,
    pub proposal_id: Option<String>, // None for failed generations
    pub seq: i64,                    // per-term sequence, assigned on insert
    pub action: LogAction,
    pub outcome: LogOutcome,
    pub description: String,
    pub old_data: Option<JsonValue>,
    pub new_data: Option<JsonValue>,
    pub actor: String,
    pub performed_at: NaiveDateTime,
}

impl GenerationLog {
    pub fn new(
        term_id: impl Into<String>,
        action: LogAction,
        outcome: LogOutcome,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            log_id: uuid::Uuid::new_v4().to_string(),
            term_id: term_id.into(),
            proposal_id: None,
            seq: 0,
            action,
            outcome,
            description: String::new(),
            old_data: None,
            new_data: None,
            actor: actor.into(),
            performed_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn with_proposal(mut self, proposal_id: impl Into<String>) -> Self {
        self.proposal_id = Some(proposal_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_old_data(mut self, data: JsonValue) -> Self {
        self.old_data = Some(data);
        self
    }

    pub fn with_new_data(mut self, data: JsonValue) -> Self {
        self.new_data = Some(data);
        self
    }
}
