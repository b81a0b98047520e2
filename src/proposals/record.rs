//! Proposal record and confirm-token primitives.

use crate::store::traits::{RecordFields, StoreError, FLAG_SET, FLAG_UNSET};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Fixed phrase the caller must echo back. Not a secret.
pub const CONFIRM_PHRASE: &str = "CONFIRM DELETE";

/// Random bytes per confirm token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Hex characters of the token hash that may appear in logs.
pub const FINGERPRINT_LEN: usize = 8;

pub(crate) const FIELD_PROPOSAL_ID: &str = "proposal_id";
pub(crate) const FIELD_TABLE: &str = "table";
pub(crate) const FIELD_RECORD_ID: &str = "record_id";
pub(crate) const FIELD_TOKEN_HASH: &str = "token_hash";
pub(crate) const FIELD_CONFIRM_PHRASE: &str = "confirm_phrase";
pub(crate) const FIELD_CREATED_AT: &str = "created_at";
pub(crate) const FIELD_USED: &str = "used";

/// Proposal identifier (UUID v4, hyphenated).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(String);

impl ProposalId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProposalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProposalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Plaintext confirm token. Handed to the caller once, never stored.
///
/// The buffer is wiped on drop and `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ConfirmToken(String);

impl ConfirmToken {
    /// Draw [`TOKEN_BYTES`] from the OS CSPRNG, URL-safe base64 without padding.
    pub fn generate() -> Result<Self, ring::error::Unspecified> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; TOKEN_BYTES];
        rng.fill(&mut bytes)?;
        let token = URL_SAFE_NO_PAD.encode(bytes);
        bytes.zeroize();
        Ok(Self(token))
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// SHA-256 hex digest of the token.
    pub fn hash(&self) -> String {
        hash_token(&self.0)
    }
}

impl fmt::Debug for ConfirmToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConfirmToken(<redacted>)")
    }
}

/// SHA-256 hex digest of a confirm token.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Log-safe prefix of a token hash.
pub fn token_fingerprint(token_hash: &str) -> String {
    token_hash.chars().take(FINGERPRINT_LEN).collect()
}

/// One pending or settled confirmation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub proposal_id: ProposalId,
    pub table: String,
    pub record_id: String,
    /// SHA-256 hex digest of the confirm token.
    pub token_hash: String,
    pub confirm_phrase: String,
    /// Unix milliseconds.
    pub created_at: u64,
    pub used: bool,
}

impl Proposal {
    /// Time elapsed since creation. Zero if `now_millis` precedes `created_at`.
    pub fn age(&self, now_millis: u64) -> Duration {
        Duration::from_millis(now_millis.saturating_sub(self.created_at))
    }

    /// Whether the proposal has outlived `window`.
    ///
    /// Age is measured in whole milliseconds, so a zero window counts as
    /// expired immediately rather than for the rest of the creation millisecond.
    pub fn is_expired(&self, now_millis: u64, window: Duration) -> bool {
        window.is_zero() || self.age(now_millis) > window
    }

    /// Encode as a flat field map for the shared store.
    pub fn to_fields(&self) -> RecordFields {
        let mut fields = RecordFields::new();
        fields.insert(
            FIELD_PROPOSAL_ID.to_string(),
            self.proposal_id.as_str().to_string(),
        );
        fields.insert(FIELD_TABLE.to_string(), self.table.clone());
        fields.insert(FIELD_RECORD_ID.to_string(), self.record_id.clone());
        fields.insert(FIELD_TOKEN_HASH.to_string(), self.token_hash.clone());
        fields.insert(FIELD_CONFIRM_PHRASE.to_string(), self.confirm_phrase.clone());
        fields.insert(FIELD_CREATED_AT.to_string(), self.created_at.to_string());
        let used = if self.used { FLAG_SET } else { FLAG_UNSET };
        fields.insert(FIELD_USED.to_string(), used.to_string());
        fields
    }

    /// Decode a field map read from `key`.
    pub fn from_fields(key: &str, fields: &RecordFields) -> Result<Self, StoreError> {
        let get = |name: &str| -> Result<String, StoreError> {
            fields
                .get(name)
                .cloned()
                .ok_or_else(|| StoreError::CorruptRecord {
                    key: key.to_string(),
                    reason: format!("missing field '{}'", name),
                })
        };

        let created_at = get(FIELD_CREATED_AT)?
            .parse::<u64>()
            .map_err(|e| StoreError::CorruptRecord {
                key: key.to_string(),
                reason: format!("bad '{}': {}", FIELD_CREATED_AT, e),
            })?;

        Ok(Self {
            proposal_id: ProposalId::from(get(FIELD_PROPOSAL_ID)?),
            table: get(FIELD_TABLE)?,
            record_id: get(FIELD_RECORD_ID)?,
            token_hash: get(FIELD_TOKEN_HASH)?,
            confirm_phrase: get(FIELD_CONFIRM_PHRASE)?,
            created_at,
            used: get(FIELD_USED)? == FLAG_SET,
        })
    }
}
