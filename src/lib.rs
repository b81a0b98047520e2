//! confirmgate - Two-step confirmation for irreversible operations
//!
//! No destructive action runs without an explicit, single-use, time-bounded
//! confirmation.
//!
//! Key principles:
//! - Propose returns a one-time token; only its SHA-256 is stored
//! - Confirm consumes the proposal atomically in the shared store, exactly once
//! - Consumption happens before credentials are checked (one guess per proposal)
//! - The shared store is the single source of truth (no local proposal cache)

pub mod audit;
pub mod gate;
pub mod proposals;
pub mod store;
pub mod validation;
