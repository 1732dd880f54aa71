// ==========================================
// Class Generation Engine - domain layer
// ==========================================
// Scope: entities, value types, parameter snapshot
// Rule: no data access, no engine logic
// ==========================================

pub mod cohort;
pub mod generation_log;
pub mod lease;
pub mod params;
pub mod proposal;
pub mod teacher;
pub mod term;
pub mod types;

pub use cohort::{AssessedStudent, Level};
pub use generation_log::{GenerationLog, LogAction, LogOutcome};
pub use lease::GenerationLease;
pub use params::{GenerationParameters, LevelSizeOverride};
pub use proposal::{
    AssignmentStatus, CandidateClass, CategoryMix, ClassAssignment, ClassMember, ClassProposal,
    ManualOverride, OverrideKind, ProposalMetrics, SizeViolation, SizeViolationKind,
    UnresolvedReason,
};
pub use teacher::{LevelCompetency, SlotAvailability, TeacherCandidate};
pub use term::Term;
pub use types::{
    CategoryMixPolicy, ClassType, Competency, DayOfWeek, PriorityStrategy, ProposalStatus,
    Session, Specialization, StudentCategory, TermStatus, TimeSlot,
};
