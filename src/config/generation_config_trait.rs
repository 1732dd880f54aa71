// ==========================================
// Class Generation Engine - service configuration reader
// ==========================================
// Read-only settings the service layer consults around a generation
// or lifecycle call. Generation parameters go through ParameterSource.
// ==========================================

use async_trait::async_trait;

use crate::config::ConfigResult;

pub const DEFAULT_APPROVAL_CONFLICT_THRESHOLD: usize = 0;
pub const DEFAULT_SUPERSEDE_ACTIVE_PROPOSAL: bool = true;
pub const DEFAULT_LEASE_TTL_SECS: u64 = 300;
pub const DEFAULT_COLLABORATOR_TIMEOUT_MS: u64 = 10_000;

// ==========================================
// GenerationConfigReader Trait
// ==========================================
// Implemented by: ConfigManager (config_kv, global scope)
#[async_trait]
pub trait GenerationConfigReader: Send + Sync {
    // ===== lifecycle =====

    /// Unresolved conflicts tolerated at approval without an override reason
    ///
    /// # Default
    /// - 0
    async fn get_approval_conflict_threshold(&self) -> ConfigResult<usize>;

    /// Whether a new run rejects the term's active proposal
    ///
    /// # Default
    /// - true (false makes the new run fail with InvalidState)
    async fn get_supersede_active_proposal(&self) -> ConfigResult<bool>;

    // ===== concurrency =====

    /// Lease lifetime in seconds
    ///
    /// # Default
    /// - 300
    async fn get_lease_ttl_secs(&self) -> ConfigResult<u64>;

    /// Per-attempt timeout for collaborator calls
    ///
    /// # Default
    /// - 10000
    async fn get_collaborator_timeout_ms(&self) -> ConfigResult<u64>;
}
