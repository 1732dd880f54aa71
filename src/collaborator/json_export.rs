// ==========================================
// Class Generation Engine - JSON schedule exporter
// ==========================================
// ScheduleMaterializer that writes the published schedule to
// <output_dir>/<term_id>/<proposal_id>.json. Rewriting the same
// proposal replaces the file, so retries are harmless.
// ==========================================

use crate::collaborator::{CollaboratorResult, ScheduleMaterializer};
use crate::domain::proposal::ClassProposal;
use crate::domain::types::TimeSlot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

// ==========================================
// Exported document
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledClass {
    pub class_id: String,
    pub level_id: String,
    pub level_name: String,
    pub teacher_id: Option<String>,
    pub slot: Option<TimeSlot>,
    pub slot_label: Option<String>, // e.g. "Senin SESI_1"
    pub student_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedSchedule {
    pub term_id: String,
    pub proposal_id: String,
    pub generation_run: u32,
    pub approved_by: Option<String>,
    pub classes: Vec<ScheduledClass>,
}

impl PublishedSchedule {
    pub fn from_proposal(proposal: &ClassProposal) -> Self {
        let classes = proposal
            .assignments
            .iter()
            .map(|a| ScheduledClass {
                class_id: a.class.class_id.clone(),
                level_id: a.class.level_id.clone(),
                level_name: a.class.level_name.clone(),
                teacher_id: a.teacher_id().map(|t| t.to_string()),
                slot: a.slot(),
                slot_label: a.slot().map(|s| s.display_name()),
                student_ids: a.class.students.iter().map(|s| s.student_id.clone()).collect(),
            })
            .collect();

        Self {
            term_id: proposal.term_id.clone(),
            proposal_id: proposal.proposal_id.clone(),
            generation_run: proposal.generation_run,
            approved_by: proposal.approved_by.clone(),
            classes,
        }
    }
}

// ==========================================
// JsonScheduleExporter
// ==========================================
pub struct JsonScheduleExporter {
    output_dir: PathBuf,
}

impl JsonScheduleExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn schedule_path(&self, term_id: &str, proposal_id: &str) -> PathBuf {
        self.output_dir.join(term_id).join(format!("{}.json", proposal_id))
    }
}

#[async_trait]
impl ScheduleMaterializer for JsonScheduleExporter {
    async fn materialize_schedule(&self, proposal: &ClassProposal) -> CollaboratorResult<()> {
        let schedule = PublishedSchedule::from_proposal(proposal);
        let body = serde_json::to_vec_pretty(&schedule)?;

        let target = self.schedule_path(&proposal.term_id, &proposal.proposal_id);
        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        // write-then-rename keeps readers from seeing a partial file
        let staging = target.with_extension("json.tmp");
        tokio::fs::write(&staging, &body).await?;
        tokio::fs::rename(&staging, &target).await?;

        info!(
            proposal_id = %proposal.proposal_id,
            classes = schedule.classes.len(),
            path = %target.display(),
            "schedule exported"
        );
        Ok(())
    }
}
