// ==========================================
// Manual refinement integration tests
// ==========================================
// Coverage:
// 1. Student transfer, size breakage reported not refused
// 2. Teacher reassignment validation
// 3. Revision check against stale writers
// ==========================================

mod helpers;

use class_generation::api::ApiError;
use class_generation::domain::proposal::{OverrideKind, SizeViolationKind};
use class_generation::domain::types::{Competency, DayOfWeek, ProposalStatus, Session};
use class_generation::repository::{ProposalRepository, RepositoryError};
use helpers::api_test_helper::{ApiTestEnv, TERM_ID};
use helpers::test_data_builder::{slot, teacher, CohortBuilder};

/// L1: two classes of 7, T1 (SENIOR, Mon 1-2), T2 (JUNIOR, Mon 1 + Tue 1),
/// T3 qualified only for L2
fn env() -> ApiTestEnv {
    let (levels, students) = CohortBuilder::new()
        .level("L1", "Tahsin 1", 1)
        .new_students("L1", 14)
        .build();
    let teachers = vec![
        teacher(
            "T1",
            &[("L1", Competency::Senior)],
            &[slot(DayOfWeek::Monday, Session::Sesi1), slot(DayOfWeek::Monday, Session::Sesi2)],
        ),
        teacher(
            "T2",
            &[("L1", Competency::Junior)],
            &[slot(DayOfWeek::Monday, Session::Sesi1), slot(DayOfWeek::Tuesday, Session::Sesi1)],
        ),
        teacher("T3", &[("L2", Competency::Expert)], &[slot(DayOfWeek::Friday, Session::Sesi3)]),
    ];
    ApiTestEnv::new(levels, students, teachers).unwrap()
}

// ==========================================
// Student transfer
// ==========================================

#[tokio::test]
async fn test_transfer_reports_size_violations() {
    let env = env();
    let proposal = env.api.generate_proposal(TERM_ID, None, "admin").await.unwrap();
    assert!(proposal.size_violations.is_empty());

    let student = proposal.assignment("L1-01").unwrap().class.students[0]
        .student_id
        .clone();
    let edited = env
        .api
        .transfer_student(&proposal.proposal_id, &student, "L1-01", "L1-02", "head")
        .await
        .unwrap();

    assert_eq!(edited.status, ProposalStatus::Refining);
    assert_eq!(edited.assignment("L1-01").unwrap().class.size(), 6);
    assert!(edited.assignment("L1-02").unwrap().class.contains(&student));

    let undersized = edited
        .size_violations
        .iter()
        .find(|v| v.class_id == "L1-01")
        .unwrap();
    assert_eq!(undersized.kind, SizeViolationKind::Undersized);
    assert_eq!(undersized.delta, -1);

    match &edited.manual_overrides.last().unwrap().kind {
        OverrideKind::StudentTransfer { student_id, .. } => assert_eq!(student_id, &student),
        other => panic!("unexpected override {:?}", other),
    }
}

#[tokio::test]
async fn test_transfer_unknown_student_or_class() {
    let env = env();
    let proposal = env.api.generate_proposal(TERM_ID, None, "admin").await.unwrap();

    let err = env
        .api
        .transfer_student(&proposal.proposal_id, "NOBODY", "L1-01", "L1-02", "head")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let err = env
        .api
        .transfer_student(&proposal.proposal_id, "L1-N00", "L1-01", "L9-01", "head")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let stored = env.api.get_proposal(TERM_ID, &proposal.proposal_id).unwrap();
    assert_eq!(stored.revision, proposal.revision);
}

// ==========================================
// Teacher reassignment
// ==========================================

#[tokio::test]
async fn test_reassign_validation() {
    let env = env();
    let proposal = env.api.generate_proposal(TERM_ID, None, "admin").await.unwrap();
    let id = &proposal.proposal_id;

    // not qualified for the level
    let err = env
        .api
        .reassign_teacher(id, "L1-01", "T3", slot(DayOfWeek::Friday, Session::Sesi3), "head")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ConstraintViolation(_)));

    // qualified but never declared the slot
    let err = env
        .api
        .reassign_teacher(id, "L1-01", "T2", slot(DayOfWeek::Wednesday, Session::Sesi1), "head")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ConstraintViolation(_)));

    // unknown teacher
    let err = env
        .api
        .reassign_teacher(id, "L1-01", "T9", slot(DayOfWeek::Monday, Session::Sesi1), "head")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let stored = env.api.get_proposal(TERM_ID, id).unwrap();
    assert_eq!(stored.revision, proposal.revision);
    assert!(stored.manual_overrides.is_empty());
}

#[tokio::test]
async fn test_reassign_rejects_double_booking() {
    let env = env();
    let proposal = env.api.generate_proposal(TERM_ID, None, "admin").await.unwrap();

    // move the other class onto the exact (teacher, slot) of L1-01
    let first = proposal.assignment("L1-01").unwrap();
    let (teacher_id, taken) = (first.teacher_id().unwrap().to_string(), first.slot().unwrap());
    let err = env
        .api
        .reassign_teacher(&proposal.proposal_id, "L1-02", &teacher_id, taken, "head")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ConstraintViolation(_)));
}

#[tokio::test]
async fn test_reassign_to_free_slot() {
    let env = env();
    let proposal = env.api.generate_proposal(TERM_ID, None, "admin").await.unwrap();
    let target = slot(DayOfWeek::Tuesday, Session::Sesi1);

    let edited = env
        .api
        .reassign_teacher(&proposal.proposal_id, "L1-02", "T2", target, "head")
        .await
        .unwrap();
    let class = edited.assignment("L1-02").unwrap();
    assert_eq!(class.teacher_id(), Some("T2"));
    assert_eq!(class.slot(), Some(target));
    assert_eq!(edited.conflict_count, 0);

    let view = env.api.get_refinement_view(&proposal.proposal_id).unwrap();
    assert_eq!(view.classes.len(), 2);
}

// ==========================================
// Optimistic revision check
// ==========================================

#[tokio::test]
async fn test_stale_revision_write_is_refused() {
    let env = env();
    let proposal = env.api.generate_proposal(TERM_ID, None, "admin").await.unwrap();
    let stale = proposal.clone();

    let student = proposal.assignment("L1-01").unwrap().class.students[0]
        .student_id
        .clone();
    env.api
        .transfer_student(&proposal.proposal_id, &student, "L1-01", "L1-02", "head")
        .await
        .unwrap();

    let repo = ProposalRepository::new(env.conn.clone());
    let mut write = stale.clone();
    write.revision += 1;
    let err = repo.update(&write, stale.revision).unwrap_err();
    assert!(matches!(err, RepositoryError::OptimisticLockFailure { .. }));
}
