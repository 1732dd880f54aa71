// ==========================================
// Class Generation Engine - availability index
// ==========================================
// Scope: teacher x slot lookup for one run, plus reservations
// Input: teacher snapshot + parameter caps
// Rule: a (teacher, slot) pair is reserved at most once
// ==========================================

use crate::domain::teacher::{LevelCompetency, TeacherCandidate};
use crate::domain::types::{Competency, TimeSlot};
use crate::engine::error::{EngineError, EngineResult};
use std::collections::{BTreeMap, BTreeSet};

// ==========================================
// TeacherEntry - per-teacher run state
// ==========================================
#[derive(Debug, Clone)]
struct TeacherEntry {
    competencies: BTreeMap<String, LevelCompetency>, // level_id -> highest competency
    slots: BTreeMap<TimeSlot, u32>,                  // usable slots -> declared capacity
    reserved: BTreeSet<TimeSlot>,
    weekly_cap: usize,                               // min(teacher, parameters)
    load: usize,
    level_load: BTreeMap<String, usize>,
}

// ==========================================
// AvailabilityIndex
// ==========================================
#[derive(Debug, Clone)]
pub struct AvailabilityIndex {
    teachers: BTreeMap<String, TeacherEntry>,
}

impl AvailabilityIndex {
    /// Build the index from a teacher snapshot
    ///
    /// Records sharing a teacher id are merged: competencies and slots are
    /// unioned, the weekly cap is the smallest declared. The result does not
    /// depend on snapshot order.
    ///
    /// # Parameters
    /// - `teachers`: availability snapshot captured at run start
    /// - `max_classes_per_teacher`: global cap from the generation parameters
    pub fn build(teachers: &[TeacherCandidate], max_classes_per_teacher: usize) -> Self {
        let mut index: BTreeMap<String, TeacherEntry> = BTreeMap::new();

        for teacher in teachers {
            let entry = index
                .entry(teacher.teacher_id.clone())
                .or_insert_with(|| TeacherEntry {
                    competencies: BTreeMap::new(),
                    slots: BTreeMap::new(),
                    reserved: BTreeSet::new(),
                    weekly_cap: max_classes_per_teacher,
                    load: 0,
                    level_load: BTreeMap::new(),
                });
            entry.weekly_cap = entry.weekly_cap.min(teacher.max_classes_per_week);

            for c in &teacher.competencies {
                match entry.competencies.get(&c.level_id) {
                    Some(existing) if !outranks(c, existing) => {}
                    _ => {
                        entry.competencies.insert(c.level_id.clone(), c.clone());
                    }
                }
            }

            // duplicate declarations of a slot merge to the larger capacity
            for a in teacher.availability.iter().filter(|a| a.capacity > 0) {
                let capacity = entry.slots.entry(a.slot).or_insert(0);
                *capacity = (*capacity).max(a.capacity);
            }
        }

        Self { teachers: index }
    }

    /// Teacher ids that appear more than once in a snapshot
    pub fn duplicate_ids(teachers: &[TeacherCandidate]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for teacher in teachers {
            if !seen.insert(teacher.teacher_id.as_str()) {
                duplicates.insert(teacher.teacher_id.clone());
            }
        }
        duplicates.into_iter().collect()
    }

    // ==========================================
    // Queries
    // ==========================================

    pub fn contains(&self, teacher_id: &str) -> bool {
        self.teachers.contains_key(teacher_id)
    }

    pub fn teacher_ids(&self) -> impl Iterator<Item = &str> {
        self.teachers.keys().map(|k| k.as_str())
    }

    /// Teachers holding the level at `min_competency` or above, ordered by id
    pub fn eligible_teachers(&self, level_id: &str, min_competency: Competency) -> Vec<&str> {
        self.teachers
            .iter()
            .filter(|(_, entry)| {
                entry
                    .competencies
                    .get(level_id)
                    .map(|c| c.competency >= min_competency)
                    .unwrap_or(false)
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn competency(&self, teacher_id: &str, level_id: &str) -> Option<&LevelCompetency> {
        self.teachers
            .get(teacher_id)
            .and_then(|entry| entry.competencies.get(level_id))
    }

    /// Number of levels the teacher is qualified for (lower = more specialized)
    pub fn levels_taught(&self, teacher_id: &str) -> usize {
        self.teachers
            .get(teacher_id)
            .map(|entry| entry.competencies.len())
            .unwrap_or(0)
    }

    /// Unreserved usable slots in catalog order
    pub fn free_slots(&self, teacher_id: &str) -> Vec<TimeSlot> {
        match self.teachers.get(teacher_id) {
            Some(entry) => entry
                .slots
                .keys()
                .filter(|slot| !entry.reserved.contains(slot))
                .copied()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_slot_free(&self, teacher_id: &str, slot: &TimeSlot) -> bool {
        self.remaining_capacity(teacher_id, slot) > 0
    }

    /// 1 when the teacher declared the slot and it is not reserved yet, else 0
    pub fn remaining_capacity(&self, teacher_id: &str, slot: &TimeSlot) -> u32 {
        match self.teachers.get(teacher_id) {
            Some(entry) if !entry.reserved.contains(slot) => {
                entry.slots.get(slot).map(|cap| (*cap).min(1)).unwrap_or(0)
            }
            _ => 0,
        }
    }

    pub fn declares_slot(&self, teacher_id: &str, slot: &TimeSlot) -> bool {
        self.teachers
            .get(teacher_id)
            .map(|entry| entry.slots.contains_key(slot))
            .unwrap_or(false)
    }

    pub fn load(&self, teacher_id: &str) -> usize {
        self.teachers.get(teacher_id).map(|e| e.load).unwrap_or(0)
    }

    pub fn weekly_cap(&self, teacher_id: &str) -> usize {
        self.teachers.get(teacher_id).map(|e| e.weekly_cap).unwrap_or(0)
    }

    /// Classes the teacher can still take this week
    pub fn remaining_quota(&self, teacher_id: &str) -> usize {
        self.teachers
            .get(teacher_id)
            .map(|e| e.weekly_cap.saturating_sub(e.load))
            .unwrap_or(0)
    }

    /// Classes the teacher can still take for the level (weekly and level caps)
    pub fn remaining_level_quota(&self, teacher_id: &str, level_id: &str) -> usize {
        let Some(entry) = self.teachers.get(teacher_id) else {
            return 0;
        };
        let weekly = entry.weekly_cap.saturating_sub(entry.load);
        let level_cap = entry
            .competencies
            .get(level_id)
            .and_then(|c| c.max_classes_for_level);
        match level_cap {
            Some(cap) => {
                let used = entry.level_load.get(level_id).copied().unwrap_or(0);
                weekly.min(cap.saturating_sub(used))
            }
            None => weekly,
        }
    }

    /// Usable (teacher, slot) pairs across the snapshot
    pub fn total_slots(&self) -> usize {
        self.teachers.values().map(|e| e.slots.len()).sum()
    }

    // ==========================================
    // Mutation
    // ==========================================

    /// Reserve a slot for a class of the given level
    pub fn reserve(&mut self, teacher_id: &str, level_id: &str, slot: TimeSlot) -> EngineResult<()> {
        if self.remaining_level_quota(teacher_id, level_id) == 0 {
            return Err(EngineError::ConstraintViolation(format!(
                "teacher {} has no remaining quota for level {}",
                teacher_id, level_id
            )));
        }
        if !self.is_slot_free(teacher_id, &slot) {
            return Err(EngineError::ConstraintViolation(format!(
                "slot {} is not free for teacher {}",
                slot, teacher_id
            )));
        }

        let entry = self
            .teachers
            .get_mut(teacher_id)
            .ok_or_else(|| EngineError::NotFound {
                entity: "teacher",
                id: teacher_id.to_string(),
            })?;
        entry.reserved.insert(slot);
        entry.load += 1;
        *entry.level_load.entry(level_id.to_string()).or_insert(0) += 1;
        Ok(())
    }
}

/// Total order between two competencies for the same level:
/// higher competency, then tighter level cap, then specialization
fn outranks(candidate: &LevelCompetency, existing: &LevelCompetency) -> bool {
    let cap_rank = |c: &LevelCompetency| c.max_classes_for_level.unwrap_or(usize::MAX);
    candidate
        .competency
        .cmp(&existing.competency)
        .then_with(|| cap_rank(existing).cmp(&cap_rank(candidate)))
        .then_with(|| existing.specialization.cmp(&candidate.specialization))
        .is_gt()
}
