//! Two-step delete workflow.
//!
//! Wraps the confirmation protocol with input validation and audit events,
//! and hands the confirmed target to a [`RecordDeleter`]. Proposing never
//! touches the deleter; only a successful confirmation reaches it, once.

use crate::audit::{unix_now, Actor, AuditEvent, AuditSink};
use crate::proposals::{
    ConfirmError, ConfirmToken, ConfirmationProtocol, Proposal, ProposalId, ProposeError,
};
use crate::store::SharedStore;
use crate::validation::{validate_guid, validate_table_name, ValidationError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::error;

/// Error reported by the component that performs the actual deletion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DeleteError(pub String);

/// Performs the destructive action after a successful confirmation.
#[async_trait]
pub trait RecordDeleter: Send + Sync {
    async fn delete_record(&self, table: &str, record_id: &str) -> Result<(), DeleteError>;
}

/// Delete workflow errors.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Proposal failed: {0}")]
    Propose(#[from] ProposeError),

    #[error("Confirmation failed: {0}")]
    Confirm(#[from] ConfirmError),

    /// The proposal was consumed but the deletion itself failed. The proposal
    /// cannot be confirmed again.
    #[error("Failed to delete record {record_id} in '{table}' (proposal '{proposal_id}'): {source}")]
    Execution {
        proposal_id: ProposalId,
        table: String,
        record_id: String,
        source: DeleteError,
    },
}

/// Output of the propose step.
#[derive(Debug)]
pub struct DeleteTicket {
    pub proposal_id: ProposalId,
    pub confirm_token: ConfirmToken,
    pub confirm_phrase: &'static str,
    pub table: String,
    pub record_id: String,
    pub impact: String,
    pub expires_in: Duration,
}

impl DeleteTicket {
    /// User-facing text; the three confirm values appear in backticks.
    pub fn render(&self) -> String {
        format!(
            "**Confirmation required.** {impact}\n\
             \n\
             To proceed, confirm with these exact values:\n\
             - proposalId: `{id}`\n\
             - confirmToken: `{token}`\n\
             - confirmPhrase: `{phrase}`\n\
             \n\
             The proposal expires in {secs} seconds and can be confirmed only once. \
             A wrong token or phrase cancels it.",
            impact = self.impact,
            id = self.proposal_id,
            token = self.confirm_token.expose_secret(),
            phrase = self.confirm_phrase,
            secs = self.expires_in.as_secs(),
        )
    }
}

/// Output of a completed deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReceipt {
    pub proposal_id: ProposalId,
    pub table: String,
    pub record_id: String,
}

impl DeleteReceipt {
    pub fn message(&self) -> String {
        format!(
            "Record {} in '{}' deleted successfully.",
            self.record_id, self.table
        )
    }
}

/// Impact summary shown to the caller and written to the audit trail.
pub fn impact_summary(table: &str, record_id: &str) -> String {
    format!(
        "This will permanently delete record {} from '{}'.",
        record_id, table
    )
}

/// Validation + protocol + audit for record deletion.
pub struct DeleteGate<S, A> {
    protocol: ConfirmationProtocol<S>,
    audit: A,
}

impl<S: Clone, A: Clone> Clone for DeleteGate<S, A> {
    fn clone(&self) -> Self {
        Self {
            protocol: self.protocol.clone(),
            audit: self.audit.clone(),
        }
    }
}

impl<S: SharedStore, A: AuditSink> DeleteGate<S, A> {
    pub fn new(protocol: ConfirmationProtocol<S>, audit: A) -> Self {
        Self { protocol, audit }
    }

    pub fn protocol(&self) -> &ConfirmationProtocol<S> {
        &self.protocol
    }

    pub fn audit(&self) -> &A {
        &self.audit
    }

    /// Propose deleting `record_id` from `table`. Deletes nothing.
    pub async fn propose_delete(
        &self,
        table: &str,
        record_id: &str,
        actor: Option<&Actor>,
    ) -> Result<DeleteTicket, GateError> {
        validate_table_name(table)?;
        validate_guid(record_id)?;

        let created = self.protocol.propose(table, record_id).await?;
        let impact = impact_summary(table, record_id);

        self.audit.record(&AuditEvent::DeleteProposed {
            proposal_id: created.proposal_id.to_string(),
            table: table.to_string(),
            record_id: record_id.to_string(),
            impact: impact.clone(),
            ttl_seconds: created.expires_in.as_secs(),
            token_fingerprint: created.token_fingerprint.clone(),
            actor: actor.cloned(),
            ts: unix_now(),
        });

        Ok(DeleteTicket {
            proposal_id: created.proposal_id,
            confirm_token: created.confirm_token,
            confirm_phrase: created.confirm_phrase,
            table: table.to_string(),
            record_id: record_id.to_string(),
            impact,
            expires_in: created.expires_in,
        })
    }

    /// Validate and consume a proposal, auditing the outcome.
    pub async fn authorize(
        &self,
        proposal_id: &ProposalId,
        confirm_token: &str,
        confirm_phrase: &str,
        actor: Option<&Actor>,
    ) -> Result<Proposal, GateError> {
        match self
            .protocol
            .validate_and_consume(proposal_id, confirm_token, confirm_phrase)
            .await
        {
            Ok(proposal) => {
                self.audit.record(&AuditEvent::DeleteConfirmed {
                    proposal_id: proposal_id.to_string(),
                    actor: actor.cloned(),
                    ts: unix_now(),
                });
                Ok(proposal)
            }
            Err(e) => {
                self.audit.record(&AuditEvent::DeleteConfirmFailed {
                    proposal_id: proposal_id.to_string(),
                    reason: e.kind().as_str().to_string(),
                    actor: actor.cloned(),
                    ts: unix_now(),
                });
                Err(e.into())
            }
        }
    }

    /// Run the deletion for an authorized proposal, auditing the outcome.
    pub async fn execute<D: RecordDeleter>(
        &self,
        deleter: &D,
        proposal: &Proposal,
        actor: Option<&Actor>,
    ) -> Result<DeleteReceipt, GateError> {
        match deleter
            .delete_record(&proposal.table, &proposal.record_id)
            .await
        {
            Ok(()) => {
                self.audit.record(&AuditEvent::DeleteExecuted {
                    proposal_id: proposal.proposal_id.to_string(),
                    table: proposal.table.clone(),
                    record_id: proposal.record_id.clone(),
                    actor: actor.cloned(),
                    ts: unix_now(),
                });
                Ok(DeleteReceipt {
                    proposal_id: proposal.proposal_id.clone(),
                    table: proposal.table.clone(),
                    record_id: proposal.record_id.clone(),
                })
            }
            Err(source) => {
                error!(
                    proposal_id = %proposal.proposal_id,
                    table = %proposal.table,
                    record_id = %proposal.record_id,
                    "delete failed after confirmation: {}",
                    source
                );
                self.audit.record(&AuditEvent::DeleteExecutionFailed {
                    proposal_id: proposal.proposal_id.to_string(),
                    error: source.to_string(),
                    actor: actor.cloned(),
                    ts: unix_now(),
                });
                Err(GateError::Execution {
                    proposal_id: proposal.proposal_id.clone(),
                    table: proposal.table.clone(),
                    record_id: proposal.record_id.clone(),
                    source,
                })
            }
        }
    }

    /// Confirm step: authorize, then delete exactly once.
    pub async fn confirm_delete<D: RecordDeleter>(
        &self,
        deleter: &D,
        proposal_id: &ProposalId,
        confirm_token: &str,
        confirm_phrase: &str,
        actor: Option<&Actor>,
    ) -> Result<DeleteReceipt, GateError> {
        let proposal = self
            .authorize(proposal_id, confirm_token, confirm_phrase, actor)
            .await?;
        self.execute(deleter, &proposal, actor).await
    }
}
