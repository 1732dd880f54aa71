// ==========================================
// Class Generation Engine - generation log repository
// ==========================================
// Append-only: insert and read, never update or delete.
// seq is allocated per term inside the insert transaction.
// ==========================================

mod core;
mod queries;


pub use core::GenerationLogRepository;
pub(crate) use core::insert_log_entry;
