use crate::domain::generation_log::GenerationLog;
use crate::domain::proposal::ClassProposal;
use crate::domain::types::ProposalStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::format_ts;
use crate::repository::generation_log_repo::insert_log_entry;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "SELECT proposal_json FROM class_proposal";

/// One row change inside `commit_with_logs`
#[derive(Debug, Clone, Copy)]
pub enum ProposalWrite<'a> {
    Insert(&'a ClassProposal),
    Update {
        proposal: &'a ClassProposal,
        expected_revision: u64,
    },
}

// ==========================================
// ProposalRepository
// ==========================================
// Rule: no business logic, mapping only
pub struct ProposalRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProposalRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // Writes
    // ==========================================

    /// Insert a new proposal
    ///
    /// # Errors
    /// - `UniqueConstraintViolation`: run number already taken for the term
    /// - `ForeignKeyViolation`: unknown term
    pub fn insert(&self, proposal: &ClassProposal) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_row(&conn, proposal)?;
        Ok(proposal.proposal_id.clone())
    }

    /// Store a mutated proposal (optimistic lock on revision)
    ///
    /// # Parameters
    /// - `expected_revision`: revision the caller loaded before mutating
    ///
    /// # Errors
    /// - `OptimisticLockFailure`: someone else stored a newer revision
    /// - `NotFound`: proposal does not exist
    pub fn update(&self, proposal: &ClassProposal, expected_revision: u64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        update_row(&conn, proposal, expected_revision)
    }

    /// Apply proposal writes and append their log entries in one transaction
    ///
    /// Either every write and every entry is stored, or nothing is.
    /// `seq` of each entry is filled in on success.
    pub fn commit_with_logs(
        &self,
        writes: &[ProposalWrite<'_>],
        logs: &mut [GenerationLog],
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        for write in writes {
            match write {
                ProposalWrite::Insert(proposal) => insert_row(&tx, proposal)?,
                ProposalWrite::Update {
                    proposal,
                    expected_revision,
                } => update_row(&tx, proposal, *expected_revision)?,
            }
        }
        for log in logs.iter_mut() {
            insert_log_entry(&tx, log)?;
        }

        tx.commit()?;
        Ok(())
    }

    // ==========================================
    // Queries
    // ==========================================

    pub fn find_by_id(&self, proposal_id: &str) -> RepositoryResult<Option<ClassProposal>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            &format!("{} WHERE proposal_id = ?", SELECT_COLUMNS),
            params![proposal_id],
            map_row,
        ) {
            Ok(proposal) => Ok(Some(proposal)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All proposals of a term, newest run first
    pub fn find_by_term(&self, term_id: &str) -> RepositoryResult<Vec<ClassProposal>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE term_id = ? ORDER BY generation_run DESC",
            SELECT_COLUMNS
        ))?;
        let proposals = stmt
            .query_map(params![term_id], map_row)?
            .collect::<Result<Vec<ClassProposal>, _>>()?;
        Ok(proposals)
    }

    /// The GENERATED/REFINING proposal of a term, if any
    pub fn find_active_by_term(&self, term_id: &str) -> RepositoryResult<Option<ClassProposal>> {
        let conn = self.get_conn()?;
        match conn.query_row(
            &format!(
                "{} WHERE term_id = ? AND status IN (?, ?) ORDER BY generation_run DESC LIMIT 1",
                SELECT_COLUMNS
            ),
            params![
                term_id,
                ProposalStatus::Generated.to_db_str(),
                ProposalStatus::Refining.to_db_str()
            ],
            map_row,
        ) {
            Ok(proposal) => Ok(Some(proposal)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Next run number for a term (MAX + 1, starting at 1)
    pub fn next_generation_run(&self, term_id: &str) -> RepositoryResult<u32> {
        let conn = self.get_conn()?;
        let max_run: Option<u32> = conn.query_row(
            "SELECT MAX(generation_run) FROM class_proposal WHERE term_id = ?",
            params![term_id],
            |row| row.get(0),
        )?;
        Ok(max_run.unwrap_or(0) + 1)
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ClassProposal> {
    let document: String = row.get(0)?;
    serde_json::from_str(&document).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn insert_row(conn: &Connection, proposal: &ClassProposal) -> RepositoryResult<()> {
    let document = serde_json::to_string(proposal)?;
    conn.execute(
        r#"INSERT INTO class_proposal (
            proposal_id, term_id, generation_run, status, revision,
            optimization_score, conflict_count, proposal_json,
            generated_by, generated_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        params![
            &proposal.proposal_id,
            &proposal.term_id,
            proposal.generation_run,
            proposal.status.to_db_str(),
            proposal.revision as i64,
            proposal.optimization_score,
            proposal.conflict_count as i64,
            document,
            &proposal.generated_by,
            format_ts(&proposal.generated_at),
            format_ts(&chrono::Utc::now().naive_utc()),
        ],
    )?;
    Ok(())
}

fn update_row(conn: &Connection, proposal: &ClassProposal, expected_revision: u64) -> RepositoryResult<()> {
    let document = serde_json::to_string(proposal)?;
    let rows_affected = conn.execute(
        r#"UPDATE class_proposal
           SET status = ?, revision = ?, optimization_score = ?, conflict_count = ?,
               proposal_json = ?, updated_at = ?
           WHERE proposal_id = ? AND revision = ?"#,
        params![
            proposal.status.to_db_str(),
            proposal.revision as i64,
            proposal.optimization_score,
            proposal.conflict_count as i64,
            document,
            format_ts(&chrono::Utc::now().naive_utc()),
            &proposal.proposal_id,
            expected_revision as i64,
        ],
    )?;

    if rows_affected == 0 {
        let actual: Result<i64, _> = conn.query_row(
            "SELECT revision FROM class_proposal WHERE proposal_id = ?",
            params![&proposal.proposal_id],
            |row| row.get(0),
        );

        return match actual {
            Ok(actual_revision) => Err(RepositoryError::OptimisticLockFailure {
                proposal_id: proposal.proposal_id.clone(),
                expected: expected_revision,
                actual: actual_revision.max(0) as u64,
            }),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(RepositoryError::NotFound {
                entity: "ClassProposal".to_string(),
                id: proposal.proposal_id.clone(),
            }),
            Err(e) => Err(e.into()),
        };
    }

    Ok(())
}
