//! Shared key-value store adapters.
//!
//! - `SharedStore` trait: TTL-bound records plus an atomic flag claim
//! - `MemoryStore`: in-process, for tests and single-process use
//! - `SqliteStore`: one database file shared by every process that opens it

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{FlagClaim, RecordFields, SharedStore, StoreError, StoreResult};
