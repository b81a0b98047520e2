//! TTL-bound persistence of proposals in the shared store.

use super::clock::{Clock, SystemClock};
use super::error::ProposeError;
use super::record::{
    token_fingerprint, ConfirmToken, Proposal, ProposalId, CONFIRM_PHRASE, FIELD_USED,
};
use crate::store::{FlagClaim, SharedStore, StoreResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default confirm window.
pub const DEFAULT_CONFIRM_WINDOW: Duration = Duration::from_secs(120);

/// Default key namespace for proposals.
pub const DEFAULT_KEY_PREFIX: &str = "confirmgate:proposal:";

/// Process-wide proposal settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalSettings {
    /// How long a proposal may wait for its confirmation.
    pub confirm_window: Duration,
    /// Namespace prepended to every proposal id.
    pub key_prefix: String,
}

impl Default for ProposalSettings {
    fn default() -> Self {
        Self {
            confirm_window: DEFAULT_CONFIRM_WINDOW,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl ProposalSettings {
    pub fn with_confirm_window(mut self, window: Duration) -> Self {
        self.confirm_window = window;
        self
    }

    /// TTL handed to the store: the window rounded up to whole seconds, at
    /// least one second so the record outlives a zero window long enough to
    /// be reported as expired.
    pub fn store_ttl(&self) -> Duration {
        let secs = self.confirm_window.as_secs()
            + u64::from(self.confirm_window.subsec_nanos() > 0);
        Duration::from_secs(secs.max(1))
    }
}

/// Result of [`ProposalStore::create`]. The only place the plaintext token exists.
#[derive(Debug)]
pub struct NewProposal {
    pub proposal_id: ProposalId,
    pub confirm_token: ConfirmToken,
    pub confirm_phrase: &'static str,
    /// Log-safe prefix of the token hash.
    pub token_fingerprint: String,
    pub expires_in: Duration,
}

/// Create/read/delete of proposals against a [`SharedStore`].
///
/// Holds no proposal state of its own; every call goes to the store.
pub struct ProposalStore<S> {
    backend: S,
    settings: ProposalSettings,
    clock: Arc<dyn Clock>,
}

impl<S: Clone> Clone for ProposalStore<S> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            settings: self.settings.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: SharedStore> ProposalStore<S> {
    pub fn new(backend: S, settings: ProposalSettings) -> Self {
        Self::with_clock(backend, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: S, settings: ProposalSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            settings,
            clock,
        }
    }

    pub fn settings(&self) -> &ProposalSettings {
        &self.settings
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Current time according to this store's clock, in Unix milliseconds.
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    fn key(&self, proposal_id: &ProposalId) -> String {
        format!("{}{}", self.settings.key_prefix, proposal_id)
    }

    /// Create a proposal for `(table, record_id)` and return its one-time token.
    pub async fn create(&self, table: &str, record_id: &str) -> Result<NewProposal, ProposeError> {
        let proposal_id = ProposalId::generate();
        let confirm_token = ConfirmToken::generate().map_err(|_| ProposeError::Entropy)?;
        let token_hash = confirm_token.hash();
        let fingerprint = token_fingerprint(&token_hash);

        self.put(&Proposal {
            proposal_id: proposal_id.clone(),
            table: table.to_string(),
            record_id: record_id.to_string(),
            token_hash,
            confirm_phrase: CONFIRM_PHRASE.to_string(),
            created_at: self.clock.now_millis(),
            used: false,
        })
        .await?;

        info!(
            proposal_id = %proposal_id,
            table,
            record_id,
            token_fingerprint = %fingerprint,
            "proposal created"
        );

        Ok(NewProposal {
            proposal_id,
            confirm_token,
            confirm_phrase: CONFIRM_PHRASE,
            token_fingerprint: fingerprint,
            expires_in: self.settings.confirm_window,
        })
    }

    /// Write `proposal` with a fresh store TTL, replacing any existing record.
    pub async fn put(&self, proposal: &Proposal) -> StoreResult<()> {
        let key = self.key(&proposal.proposal_id);
        self.backend
            .put_fields(&key, &proposal.to_fields(), self.settings.store_ttl())
            .await
    }

    /// Plain lookup. Never mutates.
    pub async fn read(&self, proposal_id: &ProposalId) -> StoreResult<Option<Proposal>> {
        let key = self.key(proposal_id);
        match self.backend.get_fields(&key).await? {
            Some(fields) => Proposal::from_fields(&key, &fields).map(Some),
            None => Ok(None),
        }
    }

    /// Explicit removal. Returns whether a record was removed.
    pub async fn delete(&self, proposal_id: &ProposalId) -> StoreResult<bool> {
        let removed = self.backend.remove(&self.key(proposal_id)).await?;
        debug!(proposal_id = %proposal_id, removed, "proposal deleted");
        Ok(removed)
    }

    pub(crate) async fn claim_used(&self, proposal_id: &ProposalId) -> StoreResult<FlagClaim> {
        self.backend
            .claim_flag(&self.key(proposal_id), FIELD_USED)
            .await
    }
}
