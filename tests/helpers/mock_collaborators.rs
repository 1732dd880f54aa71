// ==========================================
// In-process collaborators for integration tests
// ==========================================

use async_trait::async_trait;
use class_generation::collaborator::{
    AvailabilitySource, CohortSource, CollaboratorError, CollaboratorResult, ScheduleMaterializer,
};
use class_generation::domain::cohort::{AssessedStudent, Level};
use class_generation::domain::proposal::ClassProposal;
use class_generation::domain::teacher::TeacherCandidate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Fixed cohort, same answer for every term
pub struct StaticCohortSource {
    pub levels: Vec<Level>,
    pub students: Vec<AssessedStudent>,
}

#[async_trait]
impl CohortSource for StaticCohortSource {
    async fn get_assessed_cohort(&self, _term_id: &str) -> CollaboratorResult<Vec<AssessedStudent>> {
        Ok(self.students.clone())
    }

    async fn get_levels(&self, _term_id: &str) -> CollaboratorResult<Vec<Level>> {
        Ok(self.levels.clone())
    }
}

pub struct StaticAvailabilitySource {
    pub teachers: Vec<TeacherCandidate>,
}

#[async_trait]
impl AvailabilitySource for StaticAvailabilitySource {
    async fn get_teacher_availability(&self, _term_id: &str) -> CollaboratorResult<Vec<TeacherCandidate>> {
        Ok(self.teachers.clone())
    }
}

/// Materializer that fails the first `failures` calls, then records
/// every successful publication
pub struct RecordingMaterializer {
    failures: AtomicUsize,
    calls: AtomicUsize,
    published: Mutex<Vec<String>>,
}

impl RecordingMaterializer {
    pub fn new() -> Self {
        Self::failing(0)
    }

    pub fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScheduleMaterializer for RecordingMaterializer {
    async fn materialize_schedule(&self, proposal: &ClassProposal) -> CollaboratorResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(CollaboratorError::Unavailable(
                "schedule store offline".to_string(),
            ));
        }
        self.published.lock().unwrap().push(proposal.proposal_id.clone());
        Ok(())
    }
}
