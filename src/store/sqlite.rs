//! SQLite-backed shared store.
//!
//! Every process that opens the same database file sees the same records, so
//! a proposal created by one process can be confirmed by another. The claim
//! primitive is a single conditional `UPDATE`, which SQLite executes under
//! its write lock; no client-side lock is involved.
//!
//! Records are one row per key: the field map as a JSON object plus an
//! absolute expiry in Unix milliseconds. Expired rows are invisible to reads
//! and are swept on every write.

use super::traits::*;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS shared_records (
    key TEXT PRIMARY KEY NOT NULL,
    fields TEXT NOT NULL,
    expires_at_ms INTEGER NOT NULL
)
"#;

/// Writers wait this long for the database write lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_CONNECTIONS: u32 = 4;

/// Shared store over a SQLite database file.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as i64
}

fn expiry_ms(ttl: Duration) -> i64 {
    now_ms().saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64)
}

/// JSON path addressing one field of the stored object.
fn field_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!(
                    "Failed to create store directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        Self::init(pool).await
    }

    /// Open a private in-memory database. Not shared with any other handle
    /// except clones of the returned one.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // A memory database lives as long as its single connection.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Delete every expired row. Returns the number of rows removed.
    pub async fn purge_expired(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM shared_records WHERE expires_at_ms <= ?1")
            .bind(now_ms())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 FROM shared_records WHERE key = ?1 AND expires_at_ms > ?2")
            .bind(key)
            .bind(now_ms())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl SharedStore for SqliteStore {
    async fn put_fields(
        &self,
        key: &str,
        fields: &RecordFields,
        ttl: Duration,
    ) -> StoreResult<()> {
        let encoded = serde_json::to_string(fields).map_err(|e| StoreError::CorruptRecord {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let swept = self.purge_expired().await?;
        if swept > 0 {
            debug!(swept, "expired records purged");
        }

        sqlx::query(
            "INSERT INTO shared_records (key, fields, expires_at_ms) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET fields = excluded.fields, \
             expires_at_ms = excluded.expires_at_ms",
        )
        .bind(key)
        .bind(encoded)
        .bind(expiry_ms(ttl))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_fields(&self, key: &str) -> StoreResult<Option<RecordFields>> {
        let row =
            sqlx::query("SELECT fields FROM shared_records WHERE key = ?1 AND expires_at_ms > ?2")
                .bind(key)
                .bind(now_ms())
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let encoded: String = row.try_get("fields")?;
        serde_json::from_str(&encoded)
            .map(Some)
            .map_err(|e| StoreError::CorruptRecord {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn remove(&self, key: &str) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM shared_records WHERE key = ?1 AND expires_at_ms > ?2")
                .bind(key)
                .bind(now_ms())
                .execute(&self.pool)
                .await?;

        // Expired leftovers under the same key go too.
        sqlx::query("DELETE FROM shared_records WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn claim_flag(&self, key: &str, field: &str) -> StoreResult<FlagClaim> {
        let result = sqlx::query(
            "UPDATE shared_records SET fields = json_set(fields, ?1, ?2) \
             WHERE key = ?3 AND expires_at_ms > ?4 \
             AND coalesce(json_extract(fields, ?1), ?5) <> ?2",
        )
        .bind(field_path(field))
        .bind(FLAG_SET)
        .bind(key)
        .bind(now_ms())
        .bind(FLAG_UNSET)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(FlagClaim::Claimed);
        }

        // The claim itself is settled; this read only tells the two losing cases apart.
        if self.exists(key).await? {
            Ok(FlagClaim::AlreadySet)
        } else {
            Ok(FlagClaim::Missing)
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
