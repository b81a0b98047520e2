//! Confirmation state machine.
//!
//! ```text
//! PENDING ──consume──▶ CONSUMED
//!    │
//!    └──TTL / defensive expiry──▶ EXPIRED / ABSENT
//! ```
//!
//! `CONSUMED`, `EXPIRED` and `ABSENT` are terminal. The consume step runs on
//! the first attempt before any credential is compared, so each proposal gets
//! exactly one guess: a wrong phrase or token burns it.

use super::consume::{consume, ConsumeOutcome};
use super::error::{ConfirmError, ProposeError};
use super::record::{hash_token, Proposal, ProposalId};
use super::store::{NewProposal, ProposalStore};
use crate::store::SharedStore;
use tracing::{info, warn};

/// Turns raw confirm requests into authorize/deny decisions.
pub struct ConfirmationProtocol<S> {
    proposals: ProposalStore<S>,
}

impl<S: Clone> Clone for ConfirmationProtocol<S> {
    fn clone(&self) -> Self {
        Self {
            proposals: self.proposals.clone(),
        }
    }
}

impl<S: SharedStore> ConfirmationProtocol<S> {
    pub fn new(proposals: ProposalStore<S>) -> Self {
        Self { proposals }
    }

    pub fn proposals(&self) -> &ProposalStore<S> {
        &self.proposals
    }

    /// Propose step: persist a new proposal and hand back its one-time token.
    pub async fn propose(&self, table: &str, record_id: &str) -> Result<NewProposal, ProposeError> {
        self.proposals.create(table, record_id).await
    }

    /// Confirm step.
    ///
    /// On success the returned proposal is consumed and authorizes exactly
    /// one execution of the guarded action. Every failure leaves the
    /// proposal in whatever state the store last recorded; there is no retry.
    pub async fn validate_and_consume(
        &self,
        proposal_id: &ProposalId,
        confirm_token: &str,
        confirm_phrase: &str,
    ) -> Result<Proposal, ConfirmError> {
        let result = self
            .run_checks(proposal_id, confirm_token, confirm_phrase)
            .await;

        match &result {
            Ok(proposal) => info!(
                proposal_id = %proposal_id,
                table = %proposal.table,
                record_id = %proposal.record_id,
                "proposal confirmed"
            ),
            Err(e) => warn!(
                proposal_id = %proposal_id,
                reason = %e.kind(),
                "proposal confirmation denied"
            ),
        }

        result
    }

    async fn run_checks(
        &self,
        proposal_id: &ProposalId,
        confirm_token: &str,
        confirm_phrase: &str,
    ) -> Result<Proposal, ConfirmError> {
        // 1. Lookup
        let Some(mut proposal) = self.proposals.read(proposal_id).await? else {
            return Err(ConfirmError::NotFound {
                proposal_id: proposal_id.clone(),
            });
        };

        // 2. Defensive expiry; store TTL is primary but may lag
        let ttl = self.proposals.settings().confirm_window;
        let now = self.proposals.now_millis();
        if proposal.is_expired(now, ttl) {
            self.proposals.delete(proposal_id).await?;
            return Err(ConfirmError::Expired {
                proposal_id: proposal_id.clone(),
                age: proposal.age(now),
                ttl,
            });
        }

        // 3. Consume before any credential check
        match consume(&self.proposals, proposal_id).await? {
            ConsumeOutcome::NewlyConsumed => proposal.used = true,
            ConsumeOutcome::AlreadyUsed => {
                return Err(ConfirmError::AlreadyUsed {
                    proposal_id: proposal_id.clone(),
                })
            }
            ConsumeOutcome::Absent => {
                return Err(ConfirmError::NotFound {
                    proposal_id: proposal_id.clone(),
                })
            }
        }

        // 4. Phrase
        if confirm_phrase != proposal.confirm_phrase {
            return Err(ConfirmError::PhraseMismatch {
                proposal_id: proposal_id.clone(),
            });
        }

        // 5. Token
        let supplied = hash_token(confirm_token);
        if ring::constant_time::verify_slices_are_equal(
            supplied.as_bytes(),
            proposal.token_hash.as_bytes(),
        )
        .is_err()
        {
            return Err(ConfirmError::TokenMismatch {
                proposal_id: proposal_id.clone(),
            });
        }

        Ok(proposal)
    }
}
