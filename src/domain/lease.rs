// ==========================================
// Class Generation Engine - generation lease
// ==========================================
// Explicit expiring lock record. One live lease per key:
//   "term:<term_id>"         held for one generation call
//   "proposal:<proposal_id>" held for one mutation
// ==========================================

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationLease {
    pub lease_key: String,
    pub lease_token: String, // unique per acquisition, required to release
    pub holder: String,      // actor id
    pub acquired_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

impl GenerationLease {
    pub fn new(lease_key: impl Into<String>, holder: impl Into<String>, ttl_secs: u64) -> Self {
        let acquired_at = chrono::Utc::now().naive_utc();
        Self {
            lease_key: lease_key.into(),
            lease_token: uuid::Uuid::new_v4().to_string(),
            holder: holder.into(),
            acquired_at,
            expires_at: acquired_at + Duration::seconds(ttl_secs.min(i64::MAX as u64) as i64),
        }
    }

    pub fn term_key(term_id: &str) -> String {
        format!("term:{}", term_id)
    }

    pub fn proposal_key(proposal_id: &str) -> String {
        format!("proposal:{}", proposal_id)
    }

    pub fn is_live(&self, now: NaiveDateTime) -> bool {
        self.expires_at > now
    }
}
