//! Atomic single-use consumption of a proposal.
//!
//! The flip of `used` from unset to set happens inside the shared store in a
//! single round trip. This is the only mutual exclusion the confirmation
//! protocol relies on.

use super::record::ProposalId;
use super::store::ProposalStore;
use crate::store::{FlagClaim, SharedStore, StoreResult};

/// Outcome of [`consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The proposal was unused and this caller consumed it.
    NewlyConsumed,
    /// Another attempt consumed it first. Nothing changed.
    AlreadyUsed,
    /// The record vanished (TTL or delete) before it could be consumed.
    Absent,
}

impl From<FlagClaim> for ConsumeOutcome {
    fn from(claim: FlagClaim) -> Self {
        match claim {
            FlagClaim::Claimed => ConsumeOutcome::NewlyConsumed,
            FlagClaim::AlreadySet => ConsumeOutcome::AlreadyUsed,
            FlagClaim::Missing => ConsumeOutcome::Absent,
        }
    }
}

/// Atomically mark `proposal_id` as used.
///
/// Among any number of concurrent callers, across any number of processes
/// sharing the store, exactly one observes [`ConsumeOutcome::NewlyConsumed`].
pub async fn consume<S: SharedStore>(
    proposals: &ProposalStore<S>,
    proposal_id: &ProposalId,
) -> StoreResult<ConsumeOutcome> {
    proposals.claim_used(proposal_id).await.map(ConsumeOutcome::from)
}
