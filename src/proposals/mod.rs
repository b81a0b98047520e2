//! Two-step propose/confirm protocol for irreversible actions.
//!
//! - Proposals are persisted in a shared store with a TTL
//! - Only the SHA-256 of the confirm token is stored
//! - Consumption is a store-side atomic claim (exactly once)
//! - The claim runs before credentials are checked: one guess per proposal

pub mod clock;
pub mod consume;
pub mod error;
pub mod protocol;
pub mod record;
pub mod store;

#[cfg(test)]
mod proptests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use consume::{consume, ConsumeOutcome};
pub use error::{ConfirmError, ConfirmErrorKind, ProposeError};
pub use protocol::ConfirmationProtocol;
pub use record::{
    hash_token, token_fingerprint, ConfirmToken, Proposal, ProposalId, CONFIRM_PHRASE,
};
pub use store::{
    NewProposal, ProposalSettings, ProposalStore, DEFAULT_CONFIRM_WINDOW, DEFAULT_KEY_PREFIX,
};
