// ==========================================
// Class Generation Engine - academic term repository
// ==========================================

use crate::domain::term::Term;
use crate::domain::types::TermStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_ts, parse_ts};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct TermRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TermRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Insert or replace name/status of a term
    pub fn upsert(&self, term: &Term) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO academic_term (term_id, term_name, status, created_at)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(term_id) DO UPDATE SET term_name = excluded.term_name, status = excluded.status"#,
            params![
                &term.term_id,
                &term.term_name,
                term.status.to_db_str(),
                format_ts(&term.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, term_id: &str) -> RepositoryResult<Option<Term>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            "SELECT term_id, term_name, status, created_at FROM academic_term WHERE term_id = ?",
            params![term_id],
            map_row,
        ) {
            Ok(term) => Ok(Some(term)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list(&self) -> RepositoryResult<Vec<Term>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT term_id, term_name, status, created_at FROM academic_term ORDER BY created_at, term_id",
        )?;
        let terms = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<Term>, _>>()?;
        Ok(terms)
    }

    pub fn update_status(&self, term_id: &str, status: TermStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE academic_term SET status = ? WHERE term_id = ?",
            params![status.to_db_str(), term_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Term".to_string(),
                id: term_id.to_string(),
            });
        }
        Ok(())
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Term> {
    let status_str: String = row.get(2)?;
    let status = TermStatus::from_db_str(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown term status {}", status_str).into(),
        )
    })?;
    Ok(Term {
        term_id: row.get(0)?,
        term_name: row.get(1)?,
        status,
        created_at: parse_ts(3, &row.get::<_, String>(3)?)?,
    })
}
