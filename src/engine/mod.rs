// ==========================================
// Class Generation Engine - engine layer
// ==========================================
// Scope: partitioning, assignment, scoring, lifecycle rules
// Rule: engines never touch SQL, every failure carries a reason
// ==========================================

pub mod assigner;
pub mod availability;
pub mod builder;
pub mod cancel;
pub mod error;
pub mod lifecycle;
pub mod orchestrator;
pub mod partitioner;
pub mod readiness;
pub mod refinement;
pub mod scoring;

pub use assigner::TeacherAssigner;
pub use availability::AvailabilityIndex;
pub use builder::ProposalBuilder;
pub use cancel::CancellationFlag;
pub use error::{EngineError, EngineResult};
pub use lifecycle::LifecycleManager;
pub use orchestrator::{GenerationInput, GenerationOrchestrator};
pub use partitioner::{bucket_sizes, CohortPartitioner};
pub use readiness::{GenerationReadiness, ReadinessEvaluator};
pub use refinement::{RefinementClassView, RefinementEngine, RefinementTeacherView, RefinementView};
pub use scoring::{ProposalScorer, ScoreBreakdown};
