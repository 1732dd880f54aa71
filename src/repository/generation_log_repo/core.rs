use crate::domain::generation_log::{GenerationLog, LogAction, LogOutcome};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_ts, parse_ts};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub(super) const SELECT_COLUMNS: &str = r#"SELECT log_id, term_id, proposal_id, seq, action, outcome,
       description, old_data, new_data, actor, performed_at
  FROM generation_log"#;

// ==========================================
// GenerationLogRepository
// ==========================================
pub struct GenerationLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl GenerationLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Append one entry
    ///
    /// Overwrites `log.seq` with the next sequence number of the term.
    ///
    /// # Returns
    /// the allocated seq
    pub fn append(&self, log: &mut GenerationLog) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let seq = insert_log_entry(&tx, log)?;
        tx.commit()?;
        Ok(seq)
    }

    pub(super) fn map_row(row: &rusqlite::Row) -> rusqlite::Result<GenerationLog> {
        let action_str: String = row.get(4)?;
        let outcome_str: String = row.get(5)?;
        let action = LogAction::from_str(&action_str).ok_or_else(|| conversion_error(4, &action_str))?;
        let outcome = LogOutcome::from_str(&outcome_str).ok_or_else(|| conversion_error(5, &outcome_str))?;

        Ok(GenerationLog {
            log_id: row.get(0)?,
            term_id: row.get(1)?,
            proposal_id: row.get(2)?,
            seq: row.get(3)?,
            action,
            outcome,
            description: row.get(6)?,
            old_data: row
                .get::<_, Option<String>>(7)?
                .and_then(|s| serde_json::from_str(&s).ok()),
            new_data: row
                .get::<_, Option<String>>(8)?
                .and_then(|s| serde_json::from_str(&s).ok()),
            actor: row.get(9)?,
            performed_at: parse_ts(10, &row.get::<_, String>(10)?)?,
        })
    }
}

fn conversion_error(column: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        format!("unknown enum value {}", value).into(),
    )
}

/// Allocate the next seq of the term and insert the entry
///
/// Runs on the caller's connection so a proposal write and its audit entry
/// can share one transaction.
pub(crate) fn insert_log_entry(conn: &Connection, log: &mut GenerationLog) -> RepositoryResult<i64> {
    let max_seq: Option<i64> = conn.query_row(
        "SELECT MAX(seq) FROM generation_log WHERE term_id = ?",
        params![&log.term_id],
        |row| row.get(0),
    )?;
    log.seq = max_seq.unwrap_or(0) + 1;

    conn.execute(
        r#"INSERT INTO generation_log (
            log_id, term_id, proposal_id, seq, action, outcome,
            description, old_data, new_data, actor, performed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        params![
            &log.log_id,
            &log.term_id,
            &log.proposal_id,
            log.seq,
            log.action.as_str(),
            log.outcome.as_str(),
            &log.description,
            log.old_data.as_ref().map(|v| v.to_string()),
            log.new_data.as_ref().map(|v| v.to_string()),
            &log.actor,
            format_ts(&log.performed_at),
        ],
    )?;
    Ok(log.seq)
}
