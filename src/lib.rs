// ==========================================
// Class Generation Engine - core library
// ==========================================
// Stack: Rust + SQLite
// Role: proposes classes, a human approves and publishes
// ==========================================

// ==========================================
// Modules
// ==========================================

// Domain layer - entities and value types
pub mod domain;

// Repository layer - persistence
pub mod repository;

// Engine layer - generation rules
pub mod engine;

// Configuration layer
pub mod config;

// Collaborator seams (cohort, availability, publication)
pub mod collaborator;

// Database bootstrap (connection, PRAGMA, schema)
pub mod db;

// Logging
pub mod logging;

// API layer - business operations
pub mod api;

// ==========================================
// Re-exports
// ==========================================

pub use domain::{
    AssessedStudent, ClassProposal, Competency, GenerationLog, GenerationParameters, Level,
    LogAction, LogOutcome, ProposalStatus, TeacherCandidate, Term, TermStatus, TimeSlot,
};

pub use engine::{
    CancellationFlag, GenerationOrchestrator, GenerationReadiness, LifecycleManager,
    RefinementEngine,
};

pub use api::{ApiError, ApiResult, ClassGenerationApi, GenerationSummary};

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "Class Generation Engine";
