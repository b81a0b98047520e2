use super::config::GateConfig;
use super::{close_gate, open_gate};
use confirmgate::gate::DeleteTicket;
use serde_json::{json, Value};

/// Propose deleting `record_id` from `table`
///
/// Prints the proposal as JSON on stdout. The token is shown here once and
/// never again; the store keeps only its hash.
pub async fn execute(
    config: &GateConfig,
    table: &str,
    record_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let gate = open_gate(config).await?;
    let result = gate.propose_delete(table, record_id, None).await;
    close_gate(&gate).await;

    let ticket = result?;
    println!("{}", serde_json::to_string_pretty(&ticket_json(&ticket))?);
    Ok(())
}

/// JSON view of a ticket, including the plaintext token.
pub fn ticket_json(ticket: &DeleteTicket) -> Value {
    json!({
        "proposal_id": ticket.proposal_id.as_str(),
        "confirm_token": ticket.confirm_token.expose_secret(),
        "confirm_phrase": ticket.confirm_phrase,
        "table": ticket.table,
        "record_id": ticket.record_id,
        "impact": ticket.impact,
        "expires_in_secs": ticket.expires_in.as_secs(),
    })
}
