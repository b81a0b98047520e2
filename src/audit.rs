//! Audit trail for destructive-action proposals.
//!
//! Every proposal creation, confirmation outcome and execution outcome is
//! written as one structured event. Consumption and execution are separate
//! events so a consumed-but-not-executed proposal can be reconciled later.
//!
//! Events carry a token fingerprint at most, never the plaintext token or the
//! full token hash.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Tracing target for audit records.
pub const AUDIT_TARGET: &str = "confirmgate::audit";

/// Caller identity, when the outer surface knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            user_name: Some(user_name.into()),
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    DeleteProposed {
        proposal_id: String,
        table: String,
        record_id: String,
        impact: String,
        ttl_seconds: u64,
        token_fingerprint: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        actor: Option<Actor>,
        ts: u64,
    },
    DeleteConfirmed {
        proposal_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        actor: Option<Actor>,
        ts: u64,
    },
    DeleteConfirmFailed {
        proposal_id: String,
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        actor: Option<Actor>,
        ts: u64,
    },
    DeleteExecuted {
        proposal_id: String,
        table: String,
        record_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        actor: Option<Actor>,
        ts: u64,
    },
    DeleteExecutionFailed {
        proposal_id: String,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        actor: Option<Actor>,
        ts: u64,
    },
}

impl AuditEvent {
    pub fn proposal_id(&self) -> &str {
        match self {
            AuditEvent::DeleteProposed { proposal_id, .. }
            | AuditEvent::DeleteConfirmed { proposal_id, .. }
            | AuditEvent::DeleteConfirmFailed { proposal_id, .. }
            | AuditEvent::DeleteExecuted { proposal_id, .. }
            | AuditEvent::DeleteExecutionFailed { proposal_id, .. } => proposal_id,
        }
    }

    /// Stable event name, as serialized in the `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            AuditEvent::DeleteProposed { .. } => "delete_proposed",
            AuditEvent::DeleteConfirmed { .. } => "delete_confirmed",
            AuditEvent::DeleteConfirmFailed { .. } => "delete_confirm_failed",
            AuditEvent::DeleteExecuted { .. } => "delete_executed",
            AuditEvent::DeleteExecutionFailed { .. } => "delete_execution_failed",
        }
    }
}

/// Current Unix time in seconds, for event timestamps.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Destination for audit events. Must not fail the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Writes each event as a JSON line on the [`AUDIT_TARGET`] tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        match serde_json::to_string(event) {
            Ok(line) => tracing::info!(target: AUDIT_TARGET, "{}", line),
            Err(e) => tracing::error!(
                target: AUDIT_TARGET,
                event = event.name(),
                proposal_id = event.proposal_id(),
                "failed to encode audit event: {}",
                e
            ),
        }
    }
}

/// Keeps events in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events recorded for one proposal, oldest first.
    pub fn events_for(&self, proposal_id: &str) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.proposal_id() == proposal_id)
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
