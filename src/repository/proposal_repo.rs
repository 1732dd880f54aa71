// ==========================================
// Class Generation Engine - class proposal repository
// ==========================================
// One row per (term_id, generation_run). The typed aggregate is
// serialized to proposal_json here and nowhere else; status, revision,
// score and conflict count are mirrored into columns for queries.
// ==========================================

mod core;


pub use core::{ProposalRepository, ProposalWrite};
