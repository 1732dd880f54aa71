// ==========================================
// Generation flow integration tests
// ==========================================
// Coverage:
// 1. Partitioning bounds and coverage across levels
// 2. Unresolved classes when no qualified teacher is free
// 3. Teacher capacity and (teacher, slot) exclusivity
// 4. Determinism across independent databases
// 5. Supersede of the active proposal
// ==========================================

mod helpers;

use class_generation::domain::params::GenerationParameters;
use class_generation::domain::proposal::{AssignmentStatus, ClassProposal, UnresolvedReason};
use class_generation::domain::types::{ClassType, Competency, ProposalStatus};
use class_generation::domain::{LogAction, LogOutcome};
use helpers::api_test_helper::{ApiTestEnv, TERM_ID};
use helpers::test_data_builder::{first_slots, teacher, CohortBuilder};
use std::collections::{BTreeMap, HashSet};

fn assert_every_student_once(proposal: &ClassProposal, expected: usize) {
    let mut seen = HashSet::new();
    for a in &proposal.assignments {
        for s in &a.class.students {
            assert!(seen.insert(s.student_id.clone()), "{} placed twice", s.student_id);
        }
    }
    assert_eq!(seen.len(), expected);
}

fn assert_no_double_booking(proposal: &ClassProposal) {
    let mut used = HashSet::new();
    for a in &proposal.assignments {
        if let (Some(t), Some(slot)) = (a.teacher_id(), a.slot()) {
            assert!(used.insert((t.to_string(), slot)), "{} double-booked at {}", t, slot);
        }
    }
}

// ==========================================
// Partitioning
// ==========================================

#[tokio::test]
async fn test_mixed_level_partitioned_within_bounds() {
    let (levels, students) = CohortBuilder::new()
        .level("TAHSIN-1", "Tahsin 1", 1)
        .new_students("TAHSIN-1", 18)
        .existing_students("TAHSIN-1", 6)
        .build();
    let teachers = vec![teacher("T1", &[("TAHSIN-1", Competency::Senior)], &first_slots(4))];
    let env = ApiTestEnv::new(levels, students, teachers).unwrap();

    let mut params = GenerationParameters::default();
    params.new_student_ratio = 0.7;
    let proposal = env.api.generate_proposal(TERM_ID, Some(params), "admin").await.unwrap();

    assert_eq!(proposal.assignments.len(), 3);
    for a in &proposal.assignments {
        let size = a.class.size();
        assert!((7..=10).contains(&size), "class {} has {}", a.class.class_id, size);
        assert_eq!(a.class.class_type, ClassType::Mixed);
    }
    assert_every_student_once(&proposal, 24);
    assert!(proposal.size_violations.is_empty());
    assert_eq!(proposal.conflict_count, 0);
}

#[tokio::test]
async fn test_levels_and_class_ids_follow_curriculum_order() {
    let (levels, students) = CohortBuilder::new()
        .level("L2", "Tahsin 2", 2)
        .level("L1", "Tahsin 1", 1)
        .new_students("L2", 9)
        .new_students("L1", 14)
        .build();
    let teachers = vec![
        teacher("T1", &[("L1", Competency::Junior), ("L2", Competency::Junior)], &first_slots(3)),
        teacher("T2", &[("L2", Competency::Senior)], &first_slots(2)),
    ];
    let env = ApiTestEnv::new(levels, students, teachers).unwrap();

    let proposal = env.api.generate_proposal(TERM_ID, None, "admin").await.unwrap();
    let ids: Vec<&str> = proposal.assignments.iter().map(|a| a.class.class_id.as_str()).collect();
    assert_eq!(ids, vec!["L1-01", "L1-02", "L2-01"]);
    assert_every_student_once(&proposal, 23);
    assert_no_double_booking(&proposal);
}

// ==========================================
// Assignment
// ==========================================

#[tokio::test]
async fn test_unqualified_level_left_unresolved() {
    let (levels, students) = CohortBuilder::new()
        .level("TAHSIN-1", "Tahsin 1", 1)
        .senior_level("TAHSIN-3", "Tahsin 3", 3)
        .new_students("TAHSIN-1", 8)
        .new_students("TAHSIN-3", 8)
        .build();
    let teachers = vec![teacher(
        "T1",
        &[("TAHSIN-1", Competency::Junior), ("TAHSIN-3", Competency::Junior)],
        &first_slots(4),
    )];
    let env = ApiTestEnv::new(levels, students, teachers).unwrap();

    let proposal = env.api.generate_proposal(TERM_ID, None, "admin").await.unwrap();
    assert_eq!(proposal.status, ProposalStatus::Generated);
    assert!(proposal.conflict_count >= 1);

    let tahsin3 = proposal.assignment("TAHSIN-3-01").unwrap();
    assert_eq!(
        tahsin3.status,
        AssignmentStatus::Unresolved {
            reason: UnresolvedReason::NoQualifiedTeacher
        }
    );
    assert!(proposal.assignment("TAHSIN-1-01").unwrap().is_assigned());
}

#[tokio::test]
async fn test_teacher_caps_and_slot_exclusivity() {
    // 4 classes, one teacher with 3 slots and a weekly cap of 2
    let (levels, students) = CohortBuilder::new()
        .level("L1", "Tahsin 1", 1)
        .new_students("L1", 40)
        .build();
    let mut capped = teacher("T1", &[("L1", Competency::Senior)], &first_slots(3));
    capped.max_classes_per_week = 2;
    let other = teacher("T2", &[("L1", Competency::Junior)], &first_slots(2));
    let env = ApiTestEnv::new(levels, students, vec![capped, other]).unwrap();

    let proposal = env.api.generate_proposal(TERM_ID, None, "admin").await.unwrap();
    assert_eq!(proposal.assignments.len(), 4);

    let mut per_teacher: BTreeMap<String, usize> = BTreeMap::new();
    for a in &proposal.assignments {
        if let Some(t) = a.teacher_id() {
            *per_teacher.entry(t.to_string()).or_insert(0) += 1;
        }
    }
    assert_eq!(per_teacher.get("T1"), Some(&2));
    assert_eq!(per_teacher.get("T2"), Some(&2));
    assert_no_double_booking(&proposal);
    assert_eq!(proposal.conflict_count, 0);
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    let build = || {
        let (levels, students) = CohortBuilder::new()
            .level("L1", "Tahsin 1", 1)
            .level("L2", "Tahsin 2", 2)
            .new_students("L1", 13)
            .existing_students("L1", 9)
            .new_students("L2", 11)
            .build();
        let teachers = vec![
            teacher("T1", &[("L1", Competency::Senior), ("L2", Competency::Junior)], &first_slots(3)),
            teacher("T2", &[("L1", Competency::Junior), ("L2", Competency::Expert)], &first_slots(3)),
        ];
        ApiTestEnv::new(levels, students, teachers).unwrap()
    };

    let first = build().api.generate_proposal(TERM_ID, None, "admin").await.unwrap();
    let second = build().api.generate_proposal(TERM_ID, None, "admin").await.unwrap();

    assert_eq!(
        serde_json::to_value(&first.assignments).unwrap(),
        serde_json::to_value(&second.assignments).unwrap()
    );
    assert_eq!(first.optimization_score, second.optimization_score);
    assert_eq!(first.conflict_count, second.conflict_count);
}

// ==========================================
// Supersede
// ==========================================

#[tokio::test]
async fn test_new_run_supersedes_and_keeps_history() {
    let (levels, students) = CohortBuilder::new()
        .level("L1", "Tahsin 1", 1)
        .new_students("L1", 10)
        .build();
    let teachers = vec![teacher("T1", &[("L1", Competency::Junior)], &first_slots(1))];
    let env = ApiTestEnv::new(levels, students, teachers).unwrap();

    let run1 = env.api.generate_proposal(TERM_ID, None, "admin").await.unwrap();
    let run2 = env.api.generate_proposal(TERM_ID, None, "admin").await.unwrap();
    let run3 = env.api.generate_proposal(TERM_ID, None, "admin").await.unwrap();
    assert_eq!((run1.generation_run, run2.generation_run, run3.generation_run), (1, 2, 3));

    let listed = env.api.list_proposals(TERM_ID).unwrap();
    let active: Vec<_> = listed.iter().filter(|p| p.status.is_mutable()).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].proposal_id, run3.proposal_id);

    let log = env.api.get_generation_log(TERM_ID).unwrap();
    let seqs: Vec<i64> = log.iter().map(|l| l.seq).collect();
    let mut sorted = seqs.clone();
    sorted.sort();
    assert_eq!(seqs, sorted);
    assert_eq!(
        log.iter()
            .filter(|l| l.action == LogAction::Generation && l.outcome == LogOutcome::Succeeded)
            .count(),
        3
    );
    assert_eq!(
        env.api
            .get_generation_log_by_action(TERM_ID, LogAction::Rejection)
            .unwrap()
            .len(),
        2
    );
}
