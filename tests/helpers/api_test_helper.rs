// ==========================================
// API test environment
// ==========================================
// Temp database + ConfigManager + in-process collaborators
// ==========================================

use super::mock_collaborators::{RecordingMaterializer, StaticAvailabilitySource, StaticCohortSource};
use crate::test_helpers::{create_test_db, open_test_connection};
use class_generation::api::ClassGenerationApi;
use class_generation::config::ConfigManager;
use class_generation::domain::cohort::{AssessedStudent, Level};
use class_generation::domain::teacher::TeacherCandidate;
use class_generation::domain::term::Term;
use class_generation::domain::types::TermStatus;
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

pub const TERM_ID: &str = "2025-GANJIL";

pub struct ApiTestEnv {
    _temp_file: NamedTempFile,
    pub db_path: String,
    pub conn: Arc<Mutex<Connection>>,
    pub api: ClassGenerationApi,
    pub config: Arc<ConfigManager>,
    pub materializer: Arc<RecordingMaterializer>,
}

impl ApiTestEnv {
    /// PLANNING term `TERM_ID`, working materializer
    pub fn new(
        levels: Vec<Level>,
        students: Vec<AssessedStudent>,
        teachers: Vec<TeacherCandidate>,
    ) -> Result<Self, Box<dyn Error>> {
        Self::with_materializer(levels, students, teachers, RecordingMaterializer::new())
    }

    pub fn with_materializer(
        levels: Vec<Level>,
        students: Vec<AssessedStudent>,
        teachers: Vec<TeacherCandidate>,
        materializer: RecordingMaterializer,
    ) -> Result<Self, Box<dyn Error>> {
        let (temp_file, db_path) = create_test_db()?;
        let conn = open_test_connection(&db_path)?;

        let config = Arc::new(ConfigManager::from_connection(conn.clone()).map_err(|e| e.to_string())?);
        let materializer = Arc::new(materializer);
        let api = ClassGenerationApi::with_config_manager(
            conn.clone(),
            config.clone(),
            Arc::new(StaticCohortSource { levels, students }),
            Arc::new(StaticAvailabilitySource { teachers }),
            materializer.clone(),
        );
        api.upsert_term(&Term::new(TERM_ID, "Semester Ganjil 2025", TermStatus::Planning))?;

        Ok(Self {
            _temp_file: temp_file,
            db_path,
            conn,
            api,
            config,
            materializer,
        })
    }
}
