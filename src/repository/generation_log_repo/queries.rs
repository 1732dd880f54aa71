use super::core::SELECT_COLUMNS;
use super::GenerationLogRepository;
use crate::domain::generation_log::{GenerationLog, LogAction};
use crate::repository::error::RepositoryResult;
use rusqlite::params;

impl GenerationLogRepository {
    /// All entries of a term in sequence order
    pub fn find_by_term(&self, term_id: &str) -> RepositoryResult<Vec<GenerationLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} WHERE term_id = ? ORDER BY seq ASC", SELECT_COLUMNS))?;
        let logs = stmt
            .query_map(params![term_id], Self::map_row)?
            .collect::<Result<Vec<GenerationLog>, _>>()?;
        Ok(logs)
    }

    /// Entries that reference one proposal, in sequence order
    pub fn find_by_proposal(&self, proposal_id: &str) -> RepositoryResult<Vec<GenerationLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE proposal_id = ? ORDER BY seq ASC",
            SELECT_COLUMNS
        ))?;
        let logs = stmt
            .query_map(params![proposal_id], Self::map_row)?
            .collect::<Result<Vec<GenerationLog>, _>>()?;
        Ok(logs)
    }

    pub fn find_by_action(&self, term_id: &str, action: LogAction) -> RepositoryResult<Vec<GenerationLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE term_id = ? AND action = ? ORDER BY seq ASC",
            SELECT_COLUMNS
        ))?;
        let logs = stmt
            .query_map(params![term_id, action.as_str()], Self::map_row)?
            .collect::<Result<Vec<GenerationLog>, _>>()?;
        Ok(logs)
    }

    pub fn count_by_term(&self, term_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM generation_log WHERE term_id = ?",
            params![term_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
