//! In-process shared store.
//!
//! Every operation runs inside one critical section, which makes
//! `claim_flag` atomic for all clones of the same handle. Suitable for tests
//! and for single-process deployments; it is not visible to other processes.

use super::traits::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// In-memory store with lazy TTL eviction.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    records: Mutex<HashMap<String, Entry>>,
    closed: AtomicBool,
    offline: AtomicBool,
}

struct Entry {
    fields: RecordFields,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a transport fault: while offline every call fails with
    /// [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.inner
            .records
            .lock()
            .map(|records| records.values().filter(|e| e.is_live(now)).count())
            .unwrap_or(0)
    }

    /// Whether the store holds no live records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(&self) -> StoreResult<MutexGuard<'_, HashMap<String, Entry>>> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is closed".to_string()));
        }
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        self.inner
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

/// Drop `key` if its entry has expired, returning the live entry if any.
fn live_entry<'a>(
    records: &'a mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> Option<&'a mut Entry> {
    if records.get(key).is_some_and(|e| !e.is_live(now)) {
        records.remove(key);
    }
    records.get_mut(key)
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn put_fields(
        &self,
        key: &str,
        fields: &RecordFields,
        ttl: Duration,
    ) -> StoreResult<()> {
        let mut records = self.records()?;
        let now = Instant::now();
        records.retain(|_, e| e.is_live(now));
        records.insert(
            key.to_string(),
            Entry {
                fields: fields.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get_fields(&self, key: &str) -> StoreResult<Option<RecordFields>> {
        let mut records = self.records()?;
        Ok(live_entry(&mut records, key, Instant::now()).map(|e| e.fields.clone()))
    }

    async fn remove(&self, key: &str) -> StoreResult<bool> {
        let mut records = self.records()?;
        let now = Instant::now();
        Ok(records.remove(key).is_some_and(|e| e.is_live(now)))
    }

    async fn claim_flag(&self, key: &str, field: &str) -> StoreResult<FlagClaim> {
        let mut records = self.records()?;
        let Some(entry) = live_entry(&mut records, key, Instant::now()) else {
            return Ok(FlagClaim::Missing);
        };

        if entry.fields.get(field).map(String::as_str) == Some(FLAG_SET) {
            return Ok(FlagClaim::AlreadySet);
        }

        entry.fields.insert(field.to_string(), FLAG_SET.to_string());
        Ok(FlagClaim::Claimed)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.records().map(|_| ())
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
