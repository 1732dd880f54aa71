// ==========================================
// CSV -> proposal -> JSON schedule end to end
// ==========================================
// Coverage:
// 1. File-backed cohort / availability collaborators
// 2. Term-scoped configuration overrides
// 3. Published schedule document on disk
// ==========================================


use class_generation::api::ClassGenerationApi;
use class_generation::collaborator::json_export::PublishedSchedule;
use class_generation::collaborator::{CsvAvailabilitySource, CsvCohortSource, JsonScheduleExporter};
use class_generation::config::{config_keys, ConfigManager, ConfigScope};
use class_generation::domain::term::Term;
use class_generation::domain::types::{ProposalStatus, TermStatus};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use test_helpers::{create_test_db, open_test_connection};

const TERM_ID: &str = "2025-GENAP";

fn write(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path.to_string_lossy().to_string()
}

/// 12 L1 students (8 NEW, 4 EXISTING), 6 L2 students, two teachers
fn write_inputs(dir: &Path) -> (String, String, String, String) {
    let mut cohort = String::from("student_id,level_id,category,prior_class_id\n");
    for i in 0..8 {
        cohort.push_str(&format!("N{:02},L1,NEW,\n", i));
    }
    for i in 0..4 {
        cohort.push_str(&format!("E{:02},L1,EXISTING,OLD-L1\n", i));
    }
    cohort.push('\n');
    for i in 0..6 {
        cohort.push_str(&format!("M{:02},L2,new,\n", i));
    }

    let levels = "level_id,name,order_number,required_competency\n\
                  L1,Tahsin 1,1,JUNIOR\n\
                  L2,Tahsin 2,2,SENIOR\n";
    let competencies = "teacher_id,level_id,competency,specialization,max_classes_for_level\n\
                        T1,L1,SENIOR,,\n\
                        T1,L2,SENIOR,,1\n\
                        T2,L1,JUNIOR,,\n";
    let availability = "teacher_id,day,session,capacity,max_classes_per_week\n\
                        T1,MONDAY,SESI_1,1,4\n\
                        T1,MONDAY,SESI_2,1,\n\
                        T2,TUESDAY,SESI_1,1,2\n\
                        T2,TUESDAY,SESI_2,0,\n";

    (
        write(dir, "cohort.csv", &cohort),
        write(dir, "levels.csv", levels),
        write(dir, "competencies.csv", competencies),
        write(dir, "availability.csv", availability),
    )
}

#[tokio::test]
async fn test_csv_to_published_schedule() {
    let (_db_file, db_path) = create_test_db().unwrap();
    let conn = open_test_connection(&db_path).unwrap();
    let inputs = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let (cohort, levels, competencies, availability) = write_inputs(inputs.path());

    let config = Arc::new(ConfigManager::from_connection(conn.clone()).unwrap());
    // L2 is a small remedial group: allow a class of 6
    config
        .set_config_value(
            &ConfigScope::Term {
                term_id: TERM_ID.to_string(),
            },
            config_keys::LEVEL_SIZE_OVERRIDES,
            r#"{"L2": {"min": 5, "max": 8, "justification": "remedial"}}"#,
        )
        .unwrap();
    // scarcest class first so L2 keeps the only SENIOR teacher
    config
        .set_config_value(&ConfigScope::Global, config_keys::PRIORITY_STRATEGY, "MAXIMIZE_TEACHER_FIT")
        .unwrap();

    let exporter = Arc::new(JsonScheduleExporter::new(out.path()));
    let api = ClassGenerationApi::with_config_manager(
        conn,
        config,
        Arc::new(CsvCohortSource::new(cohort, levels)),
        Arc::new(CsvAvailabilitySource::new(competencies, availability)),
        exporter.clone(),
    );
    api.upsert_term(&Term::new(TERM_ID, "Semester Genap", TermStatus::Planning))
        .unwrap();

    let readiness = api.get_generation_readiness(TERM_ID).await.unwrap();
    assert!(readiness.can_generate, "{:?}", readiness.blocking_issues);
    assert_eq!(readiness.student_count, 18);

    let proposal = api.generate_proposal(TERM_ID, None, "admin").await.unwrap();
    // L1: 12 -> [10, 2]; L2: 6 within its override
    assert_eq!(proposal.assignments.len(), 3);
    let l2 = proposal.assignment("L2-01").unwrap();
    assert_eq!((l2.class.min_size, l2.class.max_size), (5, 8));
    assert_eq!(l2.teacher_id(), Some("T1"));

    api.approve_proposal(&proposal.proposal_id, "head", Some("undersized L1 group accepted"))
        .await
        .unwrap();
    let published = api.publish_proposal(&proposal.proposal_id, "admin").await.unwrap();
    assert_eq!(published.status, ProposalStatus::Published);

    let body = fs::read_to_string(exporter.schedule_path(TERM_ID, &proposal.proposal_id)).unwrap();
    let schedule: PublishedSchedule = serde_json::from_str(&body).unwrap();
    assert_eq!(schedule.proposal_id, proposal.proposal_id);
    assert_eq!(schedule.classes.len(), 3);
    assert_eq!(
        schedule.classes.iter().map(|c| c.student_ids.len()).sum::<usize>(),
        18
    );
    assert_eq!(schedule.approved_by.as_deref(), Some("head"));
}

#[tokio::test]
async fn test_malformed_csv_fails_generation() {
    let (_db_file, db_path) = create_test_db().unwrap();
    let conn = open_test_connection(&db_path).unwrap();
    let inputs = TempDir::new().unwrap();
    let (_, levels, competencies, availability) = write_inputs(inputs.path());
    let cohort = write(
        inputs.path(),
        "bad_cohort.csv",
        "student_id,level_id,category,prior_class_id\nX1,L1,GRADUATE,\n",
    );

    let config = Arc::new(ConfigManager::from_connection(conn.clone()).unwrap());
    let api = ClassGenerationApi::with_config_manager(
        conn,
        config,
        Arc::new(CsvCohortSource::new(cohort, levels)),
        Arc::new(CsvAvailabilitySource::new(competencies, availability)),
        Arc::new(JsonScheduleExporter::new(inputs.path().join("out"))),
    );
    api.upsert_term(&Term::new(TERM_ID, "Semester Genap", TermStatus::Planning))
        .unwrap();

    let err = api.generate_proposal(TERM_ID, None, "admin").await.unwrap_err();
    assert!(err.to_string().contains("row"), "{}", err);
    assert!(api.list_proposals(TERM_ID).unwrap().is_empty());
}
