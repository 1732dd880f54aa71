// ==========================================
// Test data builders
// ==========================================

use class_generation::domain::cohort::{AssessedStudent, Level};
use class_generation::domain::teacher::TeacherCandidate;
use class_generation::domain::types::{Competency, DayOfWeek, Session, TimeSlot};

pub fn slot(day: DayOfWeek, session: Session) -> TimeSlot {
    TimeSlot::new(day, session)
}

/// First `n` slots of the weekly catalog (Monday first)
pub fn first_slots(n: usize) -> Vec<TimeSlot> {
    TimeSlot::catalog().into_iter().take(n).collect()
}

// ==========================================
// Cohort builder
// ==========================================

pub struct CohortBuilder {
    levels: Vec<Level>,
    students: Vec<AssessedStudent>,
}

impl CohortBuilder {
    pub fn new() -> Self {
        Self {
            levels: Vec::new(),
            students: Vec::new(),
        }
    }

    pub fn level(mut self, level_id: &str, name: &str, order: u32) -> Self {
        self.levels.push(Level::new(level_id, name, order));
        self
    }

    pub fn senior_level(mut self, level_id: &str, name: &str, order: u32) -> Self {
        self.levels
            .push(Level::new(level_id, name, order).with_required_competency(Competency::Senior));
        self
    }

    /// `new_count` NEW students ids `<level>-N<nn>`
    pub fn new_students(mut self, level_id: &str, new_count: usize) -> Self {
        for i in 0..new_count {
            self.students
                .push(AssessedStudent::new_student(format!("{}-N{:02}", level_id, i), level_id));
        }
        self
    }

    /// `existing_count` EXISTING students ids `<level>-E<nn>`, prior class `<level>-OLD`
    pub fn existing_students(mut self, level_id: &str, existing_count: usize) -> Self {
        for i in 0..existing_count {
            self.students.push(AssessedStudent::existing_student(
                format!("{}-E{:02}", level_id, i),
                level_id,
                Some(format!("{}-OLD", level_id)),
            ));
        }
        self
    }

    pub fn build(self) -> (Vec<Level>, Vec<AssessedStudent>) {
        (self.levels, self.students)
    }
}

// ==========================================
// Teacher builder
// ==========================================

pub fn teacher(teacher_id: &str, levels: &[(&str, Competency)], slots: &[TimeSlot]) -> TeacherCandidate {
    let mut t = TeacherCandidate::new(teacher_id, 6);
    for (level_id, competency) in levels {
        t = t.with_competency(*level_id, *competency);
    }
    for s in slots {
        t = t.with_slot(*s);
    }
    t
}
