// ==========================================
// Class Generation Engine - configuration layer
// ==========================================
// Storage: config_kv (scope_id, key, value)
// Scopes: "global" defaults, "term:<id>" overrides
// ==========================================

pub mod config_manager;
pub mod generation_config_trait;

use std::error::Error;

/// Result alias shared by the config readers
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub use config_manager::{config_keys, ConfigManager, ConfigScope};
pub use generation_config_trait::GenerationConfigReader;
