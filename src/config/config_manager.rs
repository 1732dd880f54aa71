// ==========================================
// Class Generation Engine - configuration manager
// ==========================================
// Duties: load, query and override configuration
// Storage: config_kv table (key-value + scope)
// Lookup: term scope first, then global, then built-in default
// ==========================================

use crate::collaborator::{CollaboratorError, CollaboratorResult, ParameterSource};
use crate::config::generation_config_trait::{
    GenerationConfigReader, DEFAULT_APPROVAL_CONFLICT_THRESHOLD, DEFAULT_COLLABORATOR_TIMEOUT_MS,
    DEFAULT_LEASE_TTL_SECS, DEFAULT_SUPERSEDE_ACTIVE_PROPOSAL,
};
use crate::config::ConfigResult;
use crate::db::open_sqlite_connection;
use crate::domain::params::{GenerationParameters, LevelSizeOverride};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// Open a manager on its own connection
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Share an existing connection (PRAGMAs re-applied, idempotent)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    // ==========================================
    // raw access
    // ==========================================

    /// Value stored under exactly this scope
    pub fn get_config_value(&self, scope: &ConfigScope, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![scope.scope_id(), key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// Global value (shorthand)
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(&ConfigScope::Global, key)
    }

    /// Term override first, global fallback
    pub fn get_effective_value(&self, term_id: &str, key: &str) -> ConfigResult<Option<String>> {
        let term_scope = ConfigScope::Term {
            term_id: term_id.to_string(),
        };
        if let Some(value) = self.get_config_value(&term_scope, key)? {
            return Ok(Some(value));
        }
        self.get_global_config_value(key)
    }

    /// Insert or overwrite a value
    pub fn set_config_value(&self, scope: &ConfigScope, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![scope.scope_id(), key, value],
        )?;
        Ok(())
    }

    /// Remove a value; true when a row was deleted
    pub fn delete_config_value(&self, scope: &ConfigScope, key: &str) -> ConfigResult<bool> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        let affected = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![scope.scope_id(), key],
        )?;
        Ok(affected > 0)
    }

    fn get_global_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Snapshot of all global keys as a JSON object string
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ==========================================
    // generation parameters
    // ==========================================

    /// Effective parameters for a term
    ///
    /// Unparseable scalar values fall back to the default with a warning.
    /// The assembled parameter set must pass validation.
    pub fn get_generation_parameters_for(&self, term_id: &str) -> ConfigResult<GenerationParameters> {
        let mut params = GenerationParameters::default();

        params.default_min_class_size = self.effective_parsed(
            term_id,
            config_keys::DEFAULT_MIN_CLASS_SIZE,
            params.default_min_class_size,
        )?;
        params.default_max_class_size = self.effective_parsed(
            term_id,
            config_keys::DEFAULT_MAX_CLASS_SIZE,
            params.default_max_class_size,
        )?;
        params.new_student_ratio =
            self.effective_parsed(term_id, config_keys::NEW_STUDENT_RATIO, params.new_student_ratio)?;
        params.max_classes_per_teacher = self.effective_parsed(
            term_id,
            config_keys::MAX_CLASSES_PER_TEACHER,
            params.max_classes_per_teacher,
        )?;
        params.allow_undersized_classes = self.effective_parsed(
            term_id,
            config_keys::ALLOW_UNDERSIZED_CLASSES,
            params.allow_undersized_classes,
        )?;
        params.priority_strategy =
            self.effective_parsed(term_id, config_keys::PRIORITY_STRATEGY, params.priority_strategy)?;
        params.optimize_for_teacher_workload = self.effective_parsed(
            term_id,
            config_keys::OPTIMIZE_FOR_TEACHER_WORKLOAD,
            params.optimize_for_teacher_workload,
        )?;
        params.student_category_mix = self.effective_parsed(
            term_id,
            config_keys::STUDENT_CATEGORY_MIX,
            params.student_category_mix,
        )?;

        if let Some(raw) = self.get_effective_value(term_id, config_keys::LEVEL_SIZE_OVERRIDES)? {
            match serde_json::from_str::<BTreeMap<String, LevelSizeOverride>>(&raw) {
                Ok(overrides) => params.level_size_overrides = overrides,
                Err(e) => warn!(
                    config_key = config_keys::LEVEL_SIZE_OVERRIDES,
                    raw_value = %raw,
                    error = %e,
                    "level size overrides are not valid JSON, ignored"
                ),
            }
        }

        let problems = params.validate();
        if !problems.is_empty() {
            return Err(format!("invalid generation parameters for term {}: {}", term_id, problems.join("; ")).into());
        }
        Ok(params)
    }

    fn effective_parsed<T>(&self, term_id: &str, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr,
    {
        let raw = match self.get_effective_value(term_id, key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                warn!(config_key = key, raw_value = %raw, "unparseable config value, default kept");
                Ok(default)
            }
        }
    }
}

// ==========================================
// GenerationConfigReader impl
// ==========================================
#[async_trait]
impl GenerationConfigReader for ConfigManager {
    async fn get_approval_conflict_threshold(&self) -> ConfigResult<usize> {
        let value = self.get_global_or_default(
            config_keys::APPROVAL_CONFLICT_THRESHOLD,
            &DEFAULT_APPROVAL_CONFLICT_THRESHOLD.to_string(),
        )?;
        Ok(value.trim().parse::<usize>().unwrap_or(DEFAULT_APPROVAL_CONFLICT_THRESHOLD))
    }

    async fn get_supersede_active_proposal(&self) -> ConfigResult<bool> {
        let value = self.get_global_or_default(config_keys::SUPERSEDE_ACTIVE_PROPOSAL, "true")?;
        Ok(match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => DEFAULT_SUPERSEDE_ACTIVE_PROPOSAL,
        })
    }

    async fn get_lease_ttl_secs(&self) -> ConfigResult<u64> {
        let value = self.get_global_or_default(config_keys::LEASE_TTL_SECS, &DEFAULT_LEASE_TTL_SECS.to_string())?;
        Ok(value
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_LEASE_TTL_SECS))
    }

    async fn get_collaborator_timeout_ms(&self) -> ConfigResult<u64> {
        let value = self.get_global_or_default(
            config_keys::COLLABORATOR_TIMEOUT_MS,
            &DEFAULT_COLLABORATOR_TIMEOUT_MS.to_string(),
        )?;
        Ok(value
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_COLLABORATOR_TIMEOUT_MS))
    }
}

// ==========================================
// ParameterSource impl
// ==========================================
#[async_trait]
impl ParameterSource for ConfigManager {
    async fn get_generation_parameters(&self, term_id: &str) -> CollaboratorResult<GenerationParameters> {
        self.get_generation_parameters_for(term_id)
            .map_err(|e| CollaboratorError::InvalidData(e.to_string()))
    }
}

// ==========================================
// ConfigScope
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigScope {
    Global,                    // defaults
    Term { term_id: String },  // per-term overrides
}

impl ConfigScope {
    pub fn scope_id(&self) -> String {
        match self {
            ConfigScope::Global => "global".to_string(),
            ConfigScope::Term { term_id } => format!("term:{}", term_id),
        }
    }
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    // generation parameters (global or term scope)
    pub const DEFAULT_MIN_CLASS_SIZE: &str = "generation.default_min_class_size";
    pub const DEFAULT_MAX_CLASS_SIZE: &str = "generation.default_max_class_size";
    pub const NEW_STUDENT_RATIO: &str = "generation.new_student_ratio";
    pub const MAX_CLASSES_PER_TEACHER: &str = "generation.max_classes_per_teacher";
    pub const ALLOW_UNDERSIZED_CLASSES: &str = "generation.allow_undersized_classes";
    pub const PRIORITY_STRATEGY: &str = "generation.priority_strategy";
    pub const OPTIMIZE_FOR_TEACHER_WORKLOAD: &str = "generation.optimize_for_teacher_workload";
    pub const STUDENT_CATEGORY_MIX: &str = "generation.student_category_mix";
    pub const LEVEL_SIZE_OVERRIDES: &str = "generation.level_size_overrides"; // JSON object

    // lifecycle
    pub const APPROVAL_CONFLICT_THRESHOLD: &str = "lifecycle.approval_conflict_threshold";
    pub const SUPERSEDE_ACTIVE_PROPOSAL: &str = "lifecycle.supersede_active_proposal";

    // concurrency
    pub const LEASE_TTL_SECS: &str = "lease.ttl_secs";
    pub const COLLABORATOR_TIMEOUT_MS: &str = "collaborator.timeout_ms";
}
