//! Trait abstractions for the shared key-value store.
//!
//! Proposals live in a store shared by every process that can confirm them.
//! The store owns two guarantees the rest of the crate relies on: per-key TTL
//! expiry, and an atomic claim of a single flag field evaluated inside the
//! store itself.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Flat string field map stored under one key.
pub type RecordFields = BTreeMap<String, String>;

/// Value of a flag field once it has been claimed.
pub const FLAG_SET: &str = "1";

/// Value of a flag field that has not been claimed yet.
pub const FLAG_UNSET: &str = "0";

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Transport or backend fault. The operation may or may not have been applied.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A record exists but its fields cannot be decoded.
    #[error("Corrupt record at '{key}': {reason}")]
    CorruptRecord { key: String, reason: String },
}

/// Outcome of an atomic flag claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagClaim {
    /// The flag was unset; this caller set it.
    Claimed,
    /// The flag was already set; nothing changed.
    AlreadySet,
    /// No live record exists under the key. Nothing was created.
    Missing,
}

/// Shared key-value store with TTL and a server-side claim primitive.
///
/// Implementations must evaluate `claim_flag` atomically inside the store so
/// that exactly one caller across every process observes `Claimed`.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Write `fields` under `key`, replacing any previous record, expiring after `ttl`.
    async fn put_fields(&self, key: &str, fields: &RecordFields, ttl: Duration)
        -> StoreResult<()>;

    /// Read the live record under `key`.
    async fn get_fields(&self, key: &str) -> StoreResult<Option<RecordFields>>;

    /// Remove the record under `key`. Returns whether a live record was removed.
    async fn remove(&self, key: &str) -> StoreResult<bool>;

    /// Atomically set `field` to [`FLAG_SET`] if it is not set already.
    async fn claim_flag(&self, key: &str, field: &str) -> StoreResult<FlagClaim>;

    /// Round-trip health check.
    async fn ping(&self) -> StoreResult<()>;

    /// Release backend resources. Further calls fail with [`StoreError::Unavailable`].
    async fn close(&self) -> StoreResult<()>;
}

/// Lets callers pick a backend at runtime (`Arc<dyn SharedStore>`).
#[async_trait]
impl<T: SharedStore + ?Sized> SharedStore for Arc<T> {
    async fn put_fields(
        &self,
        key: &str,
        fields: &RecordFields,
        ttl: Duration,
    ) -> StoreResult<()> {
        (**self).put_fields(key, fields, ttl).await
    }

    async fn get_fields(&self, key: &str) -> StoreResult<Option<RecordFields>> {
        (**self).get_fields(key).await
    }

    async fn remove(&self, key: &str) -> StoreResult<bool> {
        (**self).remove(key).await
    }

    async fn claim_flag(&self, key: &str, field: &str) -> StoreResult<FlagClaim> {
        (**self).claim_flag(key, field).await
    }

    async fn ping(&self) -> StoreResult<()> {
        (**self).ping().await
    }

    async fn close(&self) -> StoreResult<()> {
        (**self).close().await
    }
}
