use super::config::GateConfig;
use super::{close_gate, open_gate};
use confirmgate::gate::impact_summary;
use confirmgate::proposals::{Proposal, ProposalId};
use serde_json::{json, Value};

/// Confirm a proposal
///
/// Consumes the proposal whatever the outcome. On success prints the
/// authorized target as JSON; the caller performs the deletion.
pub async fn execute(
    config: &GateConfig,
    proposal_id: &str,
    token: &str,
    phrase: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let gate = open_gate(config).await?;
    let result = gate
        .authorize(&ProposalId::from(proposal_id), token, phrase, None)
        .await;
    close_gate(&gate).await;

    let proposal = result?;
    println!(
        "{}",
        serde_json::to_string_pretty(&authorized_json(&proposal))?
    );
    Ok(())
}

/// JSON view of an authorized proposal. Never includes the token hash.
pub fn authorized_json(proposal: &Proposal) -> Value {
    json!({
        "status": "confirmed",
        "proposal_id": proposal.proposal_id.as_str(),
        "table": proposal.table,
        "record_id": proposal.record_id,
        "impact": impact_summary(&proposal.table, &proposal.record_id),
    })
}
