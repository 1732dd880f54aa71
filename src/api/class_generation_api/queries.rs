use super::*;

impl ClassGenerationApi {
    // ==========================================
    // read side
    // ==========================================

    /// One proposal, checked against the term it is requested under
    pub fn get_proposal(&self, term_id: &str, proposal_id: &str) -> ApiResult<ClassProposal> {
        let proposal = self.load_proposal(proposal_id)?;
        if proposal.term_id != term_id {
            return Err(ApiError::NotFound(format!(
                "proposal {} in term {}",
                proposal_id, term_id
            )));
        }
        Ok(proposal)
    }

    /// All proposals of a term, newest run first
    pub fn list_proposals(&self, term_id: &str) -> ApiResult<Vec<ClassProposal>> {
        self.get_term(term_id)?;
        Ok(self.proposal_repo.find_by_term(term_id)?)
    }

    /// Term audit trail in sequence order
    pub fn get_generation_log(&self, term_id: &str) -> ApiResult<Vec<GenerationLog>> {
        Ok(self.log_repo.find_by_term(term_id)?)
    }

    /// Audit trail of one proposal
    pub fn get_proposal_log(&self, proposal_id: &str) -> ApiResult<Vec<GenerationLog>> {
        Ok(self.log_repo.find_by_proposal(proposal_id)?)
    }

    /// Term audit entries of one action type
    pub fn get_generation_log_by_action(&self, term_id: &str, action: LogAction) -> ApiResult<Vec<GenerationLog>> {
        Ok(self.log_repo.find_by_action(term_id, action)?)
    }
}
