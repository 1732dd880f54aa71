// ==========================================
// Class Generation Engine - generation lease repository
// ==========================================
// Acquire = insert, or take over an expired row, in one transaction.
// A live lease held by anyone else is a conflict, never a wait.
// ==========================================

use crate::domain::lease::GenerationLease;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_ts, parse_ts};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct LeaseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LeaseRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Try to take the lease
    ///
    /// # Errors
    /// - `LeaseHeld`: a live lease exists for the key
    pub fn try_acquire(&self, lease: &GenerationLease) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let current = tx
            .query_row(
                r#"SELECT lease_key, lease_token, holder, acquired_at, expires_at
                   FROM generation_lease WHERE lease_key = ?"#,
                params![&lease.lease_key],
                map_row,
            )
            .optional()?;

        if let Some(current) = current {
            if current.is_live(lease.acquired_at) {
                return Err(RepositoryError::LeaseHeld {
                    lease_key: current.lease_key,
                    holder: current.holder,
                    expires_at: format_ts(&current.expires_at),
                });
            }
            debug!(lease_key = %lease.lease_key, previous_holder = %current.holder, "taking over expired lease");
        }

        tx.execute(
            r#"INSERT OR REPLACE INTO generation_lease
                   (lease_key, lease_token, holder, acquired_at, expires_at)
               VALUES (?, ?, ?, ?, ?)"#,
            params![
                &lease.lease_key,
                &lease.lease_token,
                &lease.holder,
                format_ts(&lease.acquired_at),
                format_ts(&lease.expires_at),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Release a lease; only the acquiring token can release it
    ///
    /// # Returns
    /// whether a row was removed
    pub fn release(&self, lease_key: &str, lease_token: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM generation_lease WHERE lease_key = ? AND lease_token = ?",
            params![lease_key, lease_token],
        )?;
        Ok(rows > 0)
    }

    pub fn find(&self, lease_key: &str) -> RepositoryResult<Option<GenerationLease>> {
        let conn = self.get_conn()?;
        let lease = conn
            .query_row(
                r#"SELECT lease_key, lease_token, holder, acquired_at, expires_at
                   FROM generation_lease WHERE lease_key = ?"#,
                params![lease_key],
                map_row,
            )
            .optional()?;
        Ok(lease)
    }

    /// Drop every lease that expired before `now`
    pub fn purge_expired(&self, now: NaiveDateTime) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT lease_key, lease_token, holder, acquired_at, expires_at FROM generation_lease")?;
        let expired: Vec<GenerationLease> = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|l| !l.is_live(now))
            .collect();
        for lease in &expired {
            conn.execute(
                "DELETE FROM generation_lease WHERE lease_key = ? AND lease_token = ?",
                params![&lease.lease_key, &lease.lease_token],
            )?;
        }
        Ok(expired.len())
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<GenerationLease> {
    Ok(GenerationLease {
        lease_key: row.get(0)?,
        lease_token: row.get(1)?,
        holder: row.get(2)?,
        acquired_at: parse_ts(3, &row.get::<_, String>(3)?)?,
        expires_at: parse_ts(4, &row.get::<_, String>(4)?)?,
    })
}
