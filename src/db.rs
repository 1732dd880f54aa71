// ==========================================
// Class Generation Engine - SQLite connection setup
// ==========================================
// Every Connection::open goes through here so PRAGMAs stay uniform
// (foreign keys per connection, busy timeout for concurrent writers).
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// Default busy_timeout (milliseconds)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Schema version written by `init_schema`
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Environment override for the database location
pub const DB_PATH_ENV: &str = "CLASS_GENERATION_DB_PATH";

/// Apply the shared PRAGMAs to a connection
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Open a SQLite connection with the shared configuration
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Create all tables (idempotent)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS academic_term (
            term_id TEXT PRIMARY KEY,
            term_name TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS class_proposal (
            proposal_id TEXT PRIMARY KEY,
            term_id TEXT NOT NULL REFERENCES academic_term(term_id),
            generation_run INTEGER NOT NULL,
            status TEXT NOT NULL,
            revision INTEGER NOT NULL,
            optimization_score REAL NOT NULL,
            conflict_count INTEGER NOT NULL,
            proposal_json TEXT NOT NULL,
            generated_by TEXT NOT NULL,
            generated_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (term_id, generation_run)
        );
        CREATE INDEX IF NOT EXISTS idx_class_proposal_term_status
            ON class_proposal (term_id, status);

        CREATE TABLE IF NOT EXISTS generation_log (
            log_id TEXT PRIMARY KEY,
            term_id TEXT NOT NULL,
            proposal_id TEXT,
            seq INTEGER NOT NULL,
            action TEXT NOT NULL,
            outcome TEXT NOT NULL,
            description TEXT NOT NULL,
            old_data TEXT,
            new_data TEXT,
            actor TEXT NOT NULL,
            performed_at TEXT NOT NULL,
            UNIQUE (term_id, seq)
        );
        CREATE INDEX IF NOT EXISTS idx_generation_log_proposal
            ON generation_log (proposal_id, seq);

        CREATE TABLE IF NOT EXISTS generation_lease (
            lease_key TEXT PRIMARY KEY,
            lease_token TEXT NOT NULL,
            holder TEXT NOT NULL,
            acquired_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// Read schema_version (None when the table does not exist)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// Default database file: env override, else the user data directory
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./class_generation.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("class-generation");
        // fall back to the working directory when the data dir is read-only
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("class_generation.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_default_db_path_not_empty() {
        assert!(get_default_db_path().ends_with("class_generation.db") || std::env::var(DB_PATH_ENV).is_ok());
    }
}
