use super::config::GateConfig;
use super::{close_gate, open_gate};
use confirmgate::proposals::{Proposal, ProposalId};
use serde_json::{json, Value};
use std::time::Duration;

/// Show a proposal's state. Read-only: never consumes.
pub async fn execute(
    config: &GateConfig,
    proposal_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let gate = open_gate(config).await?;
    let proposals = gate.protocol().proposals();
    let id = ProposalId::from(proposal_id);

    let result = proposals.read(&id).await;
    let now = proposals.now_millis();
    let window = proposals.settings().confirm_window;
    close_gate(&gate).await;

    let value = match result? {
        Some(proposal) => status_json(&proposal, now, window),
        None => json!({ "status": "absent", "proposal_id": proposal_id }),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// `consumed`, `expired` or `pending`.
pub fn status(proposal: &Proposal, now_millis: u64, window: Duration) -> &'static str {
    if proposal.used {
        "consumed"
    } else if proposal.is_expired(now_millis, window) {
        "expired"
    } else {
        "pending"
    }
}

/// JSON view of a stored proposal, without the token hash.
pub fn status_json(proposal: &Proposal, now_millis: u64, window: Duration) -> Value {
    let age = proposal.age(now_millis);
    json!({
        "status": status(proposal, now_millis, window),
        "proposal_id": proposal.proposal_id.as_str(),
        "table": proposal.table,
        "record_id": proposal.record_id,
        "created_at": proposal.created_at,
        "age_secs": age.as_secs(),
        "expires_in_secs": window.saturating_sub(age).as_secs(),
    })
}
