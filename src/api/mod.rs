// ==========================================
// Class Generation Engine - API layer
// ==========================================
// Scope: business operations for admin / reviewer callers
// Rule: every mutation goes through a lease and an audit entry
// ==========================================

pub mod class_generation_api;
pub mod error;

pub use class_generation_api::{ClassGenerationApi, GenerationSummary};
pub use error::{ApiError, ApiResult};
