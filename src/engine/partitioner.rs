// ==========================================
// Class Generation Engine - cohort partitioner
// ==========================================
// Scope: group assessed students into size-bounded candidate classes
// Input: level catalog + assessed cohort + parameters
// Output: candidate classes ordered by level order, then bucket index
// Rule: every student lands in exactly one class, never dropped
// ==========================================

use crate::domain::cohort::{AssessedStudent, Level};
use crate::domain::params::GenerationParameters;
use crate::domain::proposal::{CandidateClass, CategoryMix, ClassMember};
use crate::domain::types::{CategoryMixPolicy, ClassType, StudentCategory};
use crate::engine::error::{EngineError, EngineResult};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, instrument};

// ==========================================
// CohortPartitioner
// ==========================================
pub struct CohortPartitioner {}

impl CohortPartitioner {
    pub fn new() -> Self {
        Self {}
    }

    /// Partition the cohort into candidate classes
    ///
    /// # Errors
    /// `MalformedInput` for duplicate student ids or unknown levels
    #[instrument(skip(self, levels, students, params), fields(levels = levels.len(), students = students.len()))]
    pub fn partition(
        &self,
        levels: &[Level],
        students: &[AssessedStudent],
        params: &GenerationParameters,
    ) -> EngineResult<Vec<CandidateClass>> {
        let mut seen = HashSet::new();
        for student in students {
            if !seen.insert(student.student_id.as_str()) {
                return Err(EngineError::MalformedInput(format!(
                    "duplicate student id {}",
                    student.student_id
                )));
            }
        }

        let catalog: BTreeMap<&str, &Level> =
            levels.iter().map(|l| (l.level_id.as_str(), l)).collect();

        let mut by_level: BTreeMap<&str, Vec<&AssessedStudent>> = BTreeMap::new();
        for student in students {
            if !catalog.contains_key(student.level_id.as_str()) {
                return Err(EngineError::MalformedInput(format!(
                    "student {} placed in unknown level {}",
                    student.student_id, student.level_id
                )));
            }
            by_level.entry(student.level_id.as_str()).or_default().push(student);
        }

        let mut ordered_levels: Vec<&Level> = catalog.values().copied().collect();
        ordered_levels.sort_by(|a, b| {
            a.order_number
                .cmp(&b.order_number)
                .then_with(|| a.level_id.cmp(&b.level_id))
        });

        let mut classes = Vec::new();
        for level in ordered_levels {
            let Some(level_students) = by_level.get(level.level_id.as_str()) else {
                continue;
            };
            let level_classes = self.partition_level(level, level_students, params);
            debug!(
                level_id = %level.level_id,
                students = level_students.len(),
                classes = level_classes.len(),
                "level partitioned"
            );
            classes.extend(level_classes);
        }

        Ok(classes)
    }

    // ==========================================
    // Per-level packing
    // ==========================================

    fn partition_level(
        &self,
        level: &Level,
        students: &[&AssessedStudent],
        params: &GenerationParameters,
    ) -> Vec<CandidateClass> {
        let (min_size, max_size) = params.size_bounds(&level.level_id);

        // EXISTING first for continuity, grouped by prior class
        let mut existing: Vec<ClassMember> = students
            .iter()
            .filter(|s| s.category == StudentCategory::Existing)
            .map(|s| to_member(s))
            .collect();
        existing.sort_by(|a, b| {
            a.prior_class_id
                .cmp(&b.prior_class_id)
                .then_with(|| a.student_id.cmp(&b.student_id))
        });

        let mut new: Vec<ClassMember> = students
            .iter()
            .filter(|s| s.category == StudentCategory::New)
            .map(|s| to_member(s))
            .collect();
        new.sort_by(|a, b| a.student_id.cmp(&b.student_id));

        let policy = params.student_category_mix;
        let sizes = planned_class_sizes(existing.len(), new.len(), min_size, max_size, policy);
        let buckets: Vec<Vec<ClassMember>> = match policy {
            CategoryMixPolicy::Mixed => mix_buckets(&sizes, existing, new, params.new_student_ratio),
            CategoryMixPolicy::Segregated => {
                let existing_buckets = bucket_sizes(existing.len(), min_size, max_size).len();
                let (existing_sizes, new_sizes) = sizes.split_at(existing_buckets);
                let mut buckets = split_by_sizes(existing, existing_sizes);
                buckets.extend(split_by_sizes(new, new_sizes));
                buckets
            }
        };

        buckets
            .into_iter()
            .enumerate()
            .map(|(i, members)| {
                let mut class = CandidateClass {
                    class_id: format!("{}-{:02}", level.level_id, i + 1),
                    level_id: level.level_id.clone(),
                    level_name: level.name.clone(),
                    level_order: level.order_number,
                    required_competency: level.required_competency,
                    students: members,
                    category_mix: CategoryMix::default(),
                    class_type: ClassType::Mixed,
                    min_size,
                    max_size,
                };
                class.recompute_mix();
                class
            })
            .collect()
    }
}

fn to_member(student: &AssessedStudent) -> ClassMember {
    ClassMember {
        student_id: student.student_id.clone(),
        category: student.category,
        prior_class_id: student.prior_class_id.clone(),
    }
}

/// Bucket sizes for `n` students within `[min, max]`
///
/// Balanced sizes over ceil(n / max) buckets; when balancing would drop
/// below `min`, full buckets of `max` plus one undersized remainder.
pub fn bucket_sizes(n: usize, min: usize, max: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let max = max.max(1);
    if n < min {
        return vec![n];
    }

    let count = (n + max - 1) / max;
    let base = n / count;
    let remainder = n % count;

    if base >= min {
        (0..count).map(|i| base + usize::from(i < remainder)).collect()
    } else {
        let mut sizes = vec![max; count - 1];
        sizes.push(n - max * (count - 1));
        sizes
    }
}

/// Class sizes a level will be split into under the category policy
///
/// MIXED sizes the whole level; SEGREGATED sizes EXISTING then NEW apart.
pub fn planned_class_sizes(
    existing: usize,
    new: usize,
    min: usize,
    max: usize,
    policy: CategoryMixPolicy,
) -> Vec<usize> {
    match policy {
        CategoryMixPolicy::Mixed => bucket_sizes(existing + new, min, max),
        CategoryMixPolicy::Segregated => {
            let mut sizes = bucket_sizes(existing, min, max);
            sizes.extend(bucket_sizes(new, min, max));
            sizes
        }
    }
}

fn split_by_sizes(members: Vec<ClassMember>, sizes: &[usize]) -> Vec<Vec<ClassMember>> {
    let mut iter = members.into_iter();
    sizes
        .iter()
        .map(|size| iter.by_ref().take(*size).collect())
        .collect()
}

/// Fill buckets with round(size x ratio) NEW students, clamped to what stays feasible
fn mix_buckets(
    sizes: &[usize],
    existing: Vec<ClassMember>,
    new: Vec<ClassMember>,
    ratio: f64,
) -> Vec<Vec<ClassMember>> {
    let mut existing = existing.into_iter();
    let mut new = new.into_iter();
    let mut existing_left = existing.len();
    let mut new_left = new.len();

    sizes
        .iter()
        .map(|&size| {
            let target = (size as f64 * ratio).round() as usize;
            let lower = size.saturating_sub(existing_left);
            let upper = size.min(new_left);
            let new_count = target.clamp(lower, upper);
            let existing_count = size - new_count;

            let bucket_existing: Vec<ClassMember> = existing.by_ref().take(existing_count).collect();
            let bucket_new: Vec<ClassMember> = new.by_ref().take(new_count).collect();
            existing_left -= existing_count;
            new_left -= new_count;

            interleave(bucket_existing, bucket_new)
        })
        .collect()
}

/// E, N, E, N, ... then whatever is left of the longer side
fn interleave(existing: Vec<ClassMember>, new: Vec<ClassMember>) -> Vec<ClassMember> {
    let mut out = Vec::with_capacity(existing.len() + new.len());
    let mut e = existing.into_iter();
    let mut n = new.into_iter();
    loop {
        match (e.next(), n.next()) {
            (None, None) => break,
            (a, b) => {
                out.extend(a);
                out.extend(b);
            }
        }
    }
    out
}
