//! Proposal error taxonomy.

use super::record::ProposalId;
use crate::store::StoreError;
use std::fmt;
use std::time::Duration;

/// Failure while creating a proposal.
#[derive(Debug, thiserror::Error)]
pub enum ProposeError {
    #[error("Failed to persist proposal: {0}")]
    Store(#[from] StoreError),

    #[error("Secure random generator failed")]
    Entropy,
}

/// Why a confirm request was denied.
///
/// Messages name the proposal but never the stored token hash or phrase.
#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("No proposal found with id '{proposal_id}'. It may have expired or never existed.")]
    NotFound { proposal_id: ProposalId },

    #[error(
        "Proposal '{proposal_id}' expired ({}s > {}s TTL). Please create a new request.",
        .age.as_secs(),
        .ttl.as_secs()
    )]
    Expired {
        proposal_id: ProposalId,
        age: Duration,
        ttl: Duration,
    },

    #[error(
        "Proposal '{proposal_id}' has already been used. Each proposal can only be confirmed once."
    )]
    AlreadyUsed { proposal_id: ProposalId },

    #[error("Confirmation phrase mismatch for proposal '{proposal_id}'.")]
    PhraseMismatch { proposal_id: ProposalId },

    #[error(
        "Confirmation token does not match for proposal '{proposal_id}'. \
         Use the exact token returned by the propose step."
    )]
    TokenMismatch { proposal_id: ProposalId },

    #[error("Proposal store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// Fieldless mirror of [`ConfirmError`] for audit records and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmErrorKind {
    NotFound,
    Expired,
    AlreadyUsed,
    PhraseMismatch,
    TokenMismatch,
    StoreUnavailable,
}

impl ConfirmErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmErrorKind::NotFound => "not_found",
            ConfirmErrorKind::Expired => "expired",
            ConfirmErrorKind::AlreadyUsed => "already_used",
            ConfirmErrorKind::PhraseMismatch => "phrase_mismatch",
            ConfirmErrorKind::TokenMismatch => "token_mismatch",
            ConfirmErrorKind::StoreUnavailable => "store_unavailable",
        }
    }
}

impl fmt::Display for ConfirmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfirmError {
    pub fn kind(&self) -> ConfirmErrorKind {
        match self {
            ConfirmError::NotFound { .. } => ConfirmErrorKind::NotFound,
            ConfirmError::Expired { .. } => ConfirmErrorKind::Expired,
            ConfirmError::AlreadyUsed { .. } => ConfirmErrorKind::AlreadyUsed,
            ConfirmError::PhraseMismatch { .. } => ConfirmErrorKind::PhraseMismatch,
            ConfirmError::TokenMismatch { .. } => ConfirmErrorKind::TokenMismatch,
            ConfirmError::StoreUnavailable(_) => ConfirmErrorKind::StoreUnavailable,
        }
    }
}
