// ==========================================
// Class Generation Engine - generation readiness
// ==========================================
// Checks whether a term's cohort and availability data can be
// generated against. Blocking issues stop generation; warnings
// only predict unresolved or undersized classes.
// ==========================================

use crate::domain::cohort::{AssessedStudent, Level};
use crate::domain::params::GenerationParameters;
use crate::domain::teacher::TeacherCandidate;
use crate::domain::term::Term;
use crate::domain::types::StudentCategory;
use crate::engine::availability::AvailabilityIndex;
use crate::engine::partitioner::planned_class_sizes;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReadiness {
    pub term_id: String,
    pub cohort_ready: bool,
    pub availability_ready: bool,
    pub can_generate: bool,
    pub student_count: usize,
    pub new_student_count: usize,
    pub existing_student_count: usize,
    pub teacher_count: usize,
    pub teachers_with_availability: usize,
    pub projected_classes: usize,
    pub levels_without_teachers: Vec<String>,
    pub blocking_issues: Vec<String>,
    pub warnings: Vec<String>,
    pub recommended_parameters: GenerationParameters,
}

pub struct ReadinessEvaluator {}

impl ReadinessEvaluator {
    pub fn new() -> Self {
        Self {}
    }

    pub fn evaluate(
        &self,
        term: &Term,
        levels: &[Level],
        students: &[AssessedStudent],
        teachers: &[TeacherCandidate],
        params: &GenerationParameters,
    ) -> GenerationReadiness {
        let mut blocking_issues = Vec::new();
        let mut warnings = Vec::new();

        if !term.accepts_generation() {
            blocking_issues.push(format!(
                "term {} is {}, generation requires PLANNING",
                term.term_id, term.status
            ));
        }
        for problem in params.validate() {
            blocking_issues.push(format!("invalid parameters: {}", problem));
        }

        // ===== cohort =====
        let catalog: BTreeMap<&str, &Level> = levels.iter().map(|l| (l.level_id.as_str(), l)).collect();
        let mut per_level: BTreeMap<&str, (usize, usize)> = BTreeMap::new(); // (existing, new)
        let mut unknown_level = 0;
        let mut seen = HashSet::new();
        let mut duplicates = 0;
        for s in students {
            if !seen.insert(s.student_id.as_str()) {
                duplicates += 1;
            }
            if catalog.contains_key(s.level_id.as_str()) {
                let counts = per_level.entry(s.level_id.as_str()).or_insert((0, 0));
                match s.category {
                    StudentCategory::Existing => counts.0 += 1,
                    StudentCategory::New => counts.1 += 1,
                }
            } else {
                unknown_level += 1;
            }
        }

        if students.is_empty() {
            blocking_issues.push("no assessed students for the term".to_string());
        }
        if unknown_level > 0 {
            blocking_issues.push(format!("{} students placed in levels missing from the catalog", unknown_level));
        }
        if duplicates > 0 {
            blocking_issues.push(format!("{} duplicate student ids in the cohort", duplicates));
        }
        let cohort_ready = !students.is_empty() && unknown_level == 0 && duplicates == 0;

        // ===== availability =====
        // duplicate teacher records are merged by the index; count teachers, not records
        let index = AvailabilityIndex::build(teachers, params.max_classes_per_teacher);
        let teacher_count = index.teacher_ids().count();
        let teachers_with_availability = index
            .teacher_ids()
            .filter(|t| !index.free_slots(t).is_empty())
            .count();
        let duplicate_teachers = AvailabilityIndex::duplicate_ids(teachers);
        if !duplicate_teachers.is_empty() {
            warnings.push(format!(
                "teachers listed more than once, records merged: {}",
                duplicate_teachers.join(", ")
            ));
        }
        if teachers.is_empty() {
            blocking_issues.push("no teacher availability submitted".to_string());
        } else if teachers_with_availability == 0 {
            blocking_issues.push("no teacher declared a usable slot".to_string());
        }
        let idle = teacher_count - teachers_with_availability;
        if idle > 0 && teachers_with_availability > 0 {
            warnings.push(format!("{} teachers declared no usable slot", idle));
        }
        let availability_ready = teachers_with_availability > 0;

        // ===== projection =====
        let mut levels_without_teachers = Vec::new();
        let mut projected_classes = 0;
        for (level_id, (existing, new)) in &per_level {
            let Some(level) = catalog.get(level_id) else {
                continue;
            };
            let count = existing + new;
            let (min, max) = params.size_bounds(level_id);
            projected_classes +=
                planned_class_sizes(*existing, *new, min, max, params.student_category_mix).len();

            let qualified = index
                .eligible_teachers(level_id, level.required_competency)
                .into_iter()
                .any(|t| !index.free_slots(t).is_empty());
            if !qualified {
                levels_without_teachers.push(level_id.to_string());
                warnings.push(format!(
                    "level {} has {} students but no qualified teacher with availability",
                    level_id, count
                ));
            }
            if count < min {
                warnings.push(format!(
                    "level {} has {} students, below the minimum class size {}",
                    level_id, count, min
                ));
            }
        }

        let teacher_capacity: usize = index
            .teacher_ids()
            .map(|t| index.weekly_cap(t).min(index.free_slots(t).len()))
            .sum();
        if availability_ready && projected_classes > teacher_capacity {
            warnings.push(format!(
                "{} classes projected but teachers can cover at most {}",
                projected_classes, teacher_capacity
            ));
        }

        let can_generate = cohort_ready && availability_ready && blocking_issues.is_empty();

        GenerationReadiness {
            term_id: term.term_id.clone(),
            cohort_ready,
            availability_ready,
            can_generate,
            student_count: students.len(),
            new_student_count: students.iter().filter(|s| s.category == StudentCategory::New).count(),
            existing_student_count: students
                .iter()
                .filter(|s| s.category == StudentCategory::Existing)
                .count(),
            teacher_count,
            teachers_with_availability,
            projected_classes,
            levels_without_teachers,
            blocking_issues,
            warnings,
            recommended_parameters: params.clone(),
        }
    }
}
