// ==========================================
// Class Generation Engine - generation parameters
// ==========================================
// Parameter snapshot for one run. Stored verbatim on the proposal.
// Invalid parameters are malformed input and abort the run.
// ==========================================

use crate::domain::types::{CategoryMixPolicy, PriorityStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_MIN_CLASS_SIZE: usize = 7;
pub const DEFAULT_MAX_CLASS_SIZE: usize = 10;
pub const DEFAULT_NEW_STUDENT_RATIO: f64 = 0.4;
pub const DEFAULT_MAX_CLASSES_PER_TEACHER: usize = 6;

// ==========================================
// LevelSizeOverride - per-level size bounds
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSizeOverride {
    pub min: usize,
    pub max: usize,
    #[serde(default)]
    pub justification: Option<String>,
}

// ==========================================
// GenerationParameters
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParameters {
    pub default_min_class_size: usize,
    pub default_max_class_size: usize,
    pub level_size_overrides: BTreeMap<String, LevelSizeOverride>,
    pub new_student_ratio: f64, // target fraction of NEW students in a mixed class
    pub max_classes_per_teacher: usize,
    pub allow_undersized_classes: bool,
    pub priority_strategy: PriorityStrategy,
    pub optimize_for_teacher_workload: bool,
    pub student_category_mix: CategoryMixPolicy,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            default_min_class_size: DEFAULT_MIN_CLASS_SIZE,
            default_max_class_size: DEFAULT_MAX_CLASS_SIZE,
            level_size_overrides: BTreeMap::new(),
            new_student_ratio: DEFAULT_NEW_STUDENT_RATIO,
            max_classes_per_teacher: DEFAULT_MAX_CLASSES_PER_TEACHER,
            allow_undersized_classes: false,
            priority_strategy: PriorityStrategy::Balance,
            optimize_for_teacher_workload: true,
            student_category_mix: CategoryMixPolicy::Mixed,
        }
    }
}

impl GenerationParameters {
    /// (min, max) bounds for a level, override first
    pub fn size_bounds(&self, level_id: &str) -> (usize, usize) {
        match self.level_size_overrides.get(level_id) {
            Some(o) => (o.min, o.max),
            None => (self.default_min_class_size, self.default_max_class_size),
        }
    }

    /// Returns every problem found, empty when the parameters are usable
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        check_bounds(
            "default",
            self.default_min_class_size,
            self.default_max_class_size,
            &mut problems,
        );
        for (level_id, o) in &self.level_size_overrides {
            check_bounds(&format!("level {}", level_id), o.min, o.max, &mut problems);
        }

        if !(0.0..=1.0).contains(&self.new_student_ratio) || self.new_student_ratio.is_nan() {
            problems.push(format!(
                "new_student_ratio must be within [0, 1], got {}",
                self.new_student_ratio
            ));
        }
        if self.max_classes_per_teacher == 0 {
            problems.push("max_classes_per_teacher must be at least 1".to_string());
        }

        problems
    }
}

fn check_bounds(scope: &str, min: usize, max: usize, problems: &mut Vec<String>) {
    if min == 0 {
        problems.push(format!("{} min class size must be at least 1", scope));
    }
    if min > max {
        problems.push(format!(
            "{} min class size {} exceeds max class size {}",
            scope, min, max
        ));
    }
}
