// ==========================================
// Proposal lifecycle integration tests
// ==========================================
// Coverage:
// 1. Approval gate on unresolved conflicts (override reason)
// 2. Publication failure and retry
// 3. Terminal states refuse every mutation, refusals are logged
// 4. Proposal lease conflicts
// ==========================================

mod helpers;

use class_generation::api::ApiError;
use class_generation::domain::lease::GenerationLease;
use class_generation::domain::proposal::ClassProposal;
use class_generation::domain::types::{Competency, ProposalStatus};
use class_generation::domain::{LogAction, LogOutcome};
use class_generation::repository::LeaseRepository;
use helpers::api_test_helper::{ApiTestEnv, TERM_ID};
use helpers::mock_collaborators::RecordingMaterializer;
use helpers::test_data_builder::{first_slots, teacher, CohortBuilder};

/// One assignable level plus a SENIOR level with 16 students and no
/// qualified teacher, i.e. two unresolved classes
fn conflicted_env() -> ApiTestEnv {
    let (levels, students) = CohortBuilder::new()
        .level("TAHSIN-1", "Tahsin 1", 1)
        .senior_level("TAHSIN-3", "Tahsin 3", 3)
        .new_students("TAHSIN-1", 8)
        .new_students("TAHSIN-3", 16)
        .build();
    let teachers = vec![teacher("T1", &[("TAHSIN-1", Competency::Junior)], &first_slots(2))];
    ApiTestEnv::new(levels, students, teachers).unwrap()
}

fn clean_env(materializer: RecordingMaterializer) -> ApiTestEnv {
    let (levels, students) = CohortBuilder::new()
        .level("L1", "Tahsin 1", 1)
        .new_students("L1", 16)
        .build();
    let teachers = vec![teacher("T1", &[("L1", Competency::Senior)], &first_slots(3))];
    ApiTestEnv::with_materializer(levels, students, teachers, materializer).unwrap()
}

async fn generated(env: &ApiTestEnv) -> ClassProposal {
    env.api.generate_proposal(TERM_ID, None, "admin").await.unwrap()
}

fn proposal_outcomes(env: &ApiTestEnv, proposal_id: &str, action: LogAction) -> Vec<LogOutcome> {
    env.api
        .get_proposal_log(proposal_id)
        .unwrap()
        .into_iter()
        .filter(|l| l.action == action)
        .map(|l| l.outcome)
        .collect()
}

// ==========================================
// Approval gate
// ==========================================

#[tokio::test]
async fn test_conflicts_require_override_reason() {
    let env = conflicted_env();
    let proposal = generated(&env).await;
    assert_eq!(proposal.conflict_count, 2);

    let err = env
        .api
        .approve_proposal(&proposal.proposal_id, "head", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
    let err = env
        .api
        .approve_proposal(&proposal.proposal_id, "head", Some("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));

    let approved = env
        .api
        .approve_proposal(&proposal.proposal_id, "head", Some("Tahsin 3 staffed by guest teacher"))
        .await
        .unwrap();
    assert_eq!(approved.status, ProposalStatus::Approved);
    assert_eq!(
        approved.approval_override_reason.as_deref(),
        Some("Tahsin 3 staffed by guest teacher")
    );

    assert_eq!(
        proposal_outcomes(&env, &proposal.proposal_id, LogAction::Approval),
        vec![LogOutcome::Denied, LogOutcome::Denied, LogOutcome::Succeeded]
    );
    let log = env.api.get_proposal_log(&proposal.proposal_id).unwrap();
    let success = log
        .iter()
        .find(|l| l.action == LogAction::Approval && l.outcome == LogOutcome::Succeeded)
        .unwrap();
    assert_eq!(success.description, "Tahsin 3 staffed by guest teacher");
}

#[tokio::test]
async fn test_threshold_from_config_relaxes_gate() {
    use class_generation::config::{config_keys, ConfigScope};

    let env = conflicted_env();
    env.config
        .set_config_value(&ConfigScope::Global, config_keys::APPROVAL_CONFLICT_THRESHOLD, "2")
        .unwrap();
    let proposal = generated(&env).await;

    let approved = env
        .api
        .approve_proposal(&proposal.proposal_id, "head", None)
        .await
        .unwrap();
    assert_eq!(approved.status, ProposalStatus::Approved);
    assert!(approved.approval_override_reason.is_none());
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let env = clean_env(RecordingMaterializer::new());
    let proposal = generated(&env).await;

    let err = env
        .api
        .reject_proposal(&proposal.proposal_id, "head", "")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_) | ApiError::InvalidState(_)));

    let rejected = env
        .api
        .reject_proposal(&proposal.proposal_id, "head", "ratio too low")
        .await
        .unwrap();
    assert_eq!(rejected.status, ProposalStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("ratio too low"));
}

// ==========================================
// Publication
// ==========================================

#[tokio::test]
async fn test_publish_failure_then_retry_publishes_once() {
    // both attempts of the first publish fail
    let env = clean_env(RecordingMaterializer::failing(2));
    let proposal = generated(&env).await;
    env.api
        .approve_proposal(&proposal.proposal_id, "head", None)
        .await
        .unwrap();

    let err = env
        .api
        .publish_proposal(&proposal.proposal_id, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MaterializationFailure(_)));
    let stored = env.api.get_proposal(TERM_ID, &proposal.proposal_id).unwrap();
    assert_eq!(stored.status, ProposalStatus::Approved);

    let published = env
        .api
        .publish_proposal(&proposal.proposal_id, "admin")
        .await
        .unwrap();
    assert_eq!(published.status, ProposalStatus::Published);
    assert_eq!(published.published_by.as_deref(), Some("admin"));
    assert_eq!(env.materializer.published(), vec![proposal.proposal_id.clone()]);

    // a second publish is refused and materializes nothing
    let err = env
        .api
        .publish_proposal(&proposal.proposal_id, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
    assert_eq!(env.materializer.calls(), 3);

    assert_eq!(
        proposal_outcomes(&env, &proposal.proposal_id, LogAction::Publication),
        vec![LogOutcome::Failed, LogOutcome::Succeeded, LogOutcome::Denied]
    );
}

#[tokio::test]
async fn test_publish_requires_approval() {
    let env = clean_env(RecordingMaterializer::new());
    let proposal = generated(&env).await;

    let err = env
        .api
        .publish_proposal(&proposal.proposal_id, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
    assert_eq!(env.materializer.calls(), 0);
}

// ==========================================
// Terminal states
// ==========================================

#[tokio::test]
async fn test_rejected_proposal_is_frozen() {
    let env = clean_env(RecordingMaterializer::new());
    let proposal = generated(&env).await;
    let rejected = env
        .api
        .reject_proposal(&proposal.proposal_id, "head", "redo with new cohort")
        .await
        .unwrap();

    let id = &proposal.proposal_id;
    assert!(matches!(
        env.api.approve_proposal(id, "head", Some("x")).await,
        Err(ApiError::InvalidState(_))
    ));
    assert!(matches!(
        env.api.reject_proposal(id, "head", "again").await,
        Err(ApiError::InvalidState(_))
    ));
    assert!(matches!(
        env.api.transfer_student(id, "L1-N00", "L1-01", "L1-02", "head").await,
        Err(ApiError::InvalidState(_))
    ));

    let stored = env.api.get_proposal(TERM_ID, id).unwrap();
    assert_eq!(stored.revision, rejected.revision);
    assert_eq!(proposal_outcomes(&env, id, LogAction::Approval), vec![LogOutcome::Denied]);
    assert_eq!(
        proposal_outcomes(&env, id, LogAction::Rejection),
        vec![LogOutcome::Succeeded, LogOutcome::Denied]
    );
    assert_eq!(proposal_outcomes(&env, id, LogAction::ManualEdit), vec![LogOutcome::Denied]);
}

// ==========================================
// Leases
// ==========================================

#[tokio::test]
async fn test_held_proposal_lease_blocks_approval() {
    let env = clean_env(RecordingMaterializer::new());
    let proposal = generated(&env).await;

    let leases = LeaseRepository::new(env.conn.clone());
    let foreign = GenerationLease::new(
        GenerationLease::proposal_key(&proposal.proposal_id),
        "other-reviewer",
        300,
    );
    leases.try_acquire(&foreign).unwrap();

    let err = env
        .api
        .approve_proposal(&proposal.proposal_id, "head", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ConcurrencyConflict(_)));
    assert_eq!(
        proposal_outcomes(&env, &proposal.proposal_id, LogAction::Approval),
        vec![LogOutcome::Denied]
    );

    // once released the approval goes through
    assert!(leases
        .release(&foreign.lease_key, &foreign.lease_token)
        .unwrap());
    let approved = env
        .api
        .approve_proposal(&proposal.proposal_id, "head", None)
        .await
        .unwrap();
    assert_eq!(approved.status, ProposalStatus::Approved);
}

#[tokio::test]
async fn test_expired_lease_is_taken_over() {
    let env = clean_env(RecordingMaterializer::new());
    let leases = LeaseRepository::new(env.conn.clone());
    let stale = GenerationLease::new(GenerationLease::term_key(TERM_ID), "crashed-worker", 0);
    leases.try_acquire(&stale).unwrap();

    let proposal = generated(&env).await;
    assert_eq!(proposal.generation_run, 1);
}
