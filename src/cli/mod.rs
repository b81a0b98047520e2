use clap::{Parser, Subcommand};
use confirmgate::audit::TracingAuditSink;
use confirmgate::gate::DeleteGate;
use confirmgate::proposals::{ConfirmationProtocol, ProposalStore};
use confirmgate::store::{MemoryStore, SharedStore, SqliteStore};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

pub mod confirm;
pub mod config;
pub mod init_config;
pub mod logging;
pub mod propose;
pub mod show;
pub mod version;

use config::{GateConfig, StoreBackend};

#[derive(Parser)]
#[command(name = "confirmgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Two-step confirmation for destructive operations", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    InitConfig {
        /// Where to write the config (default: ~/.config/confirmgate/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Proposal database path to put in the config
        #[arg(long)]
        store_path: Option<String>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Propose deleting a record; prints the one-time confirmation values
    Propose {
        /// Table holding the record
        #[arg(long)]
        table: String,

        /// Record GUID
        #[arg(long)]
        record_id: String,

        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },

    /// Confirm a pending proposal (single use; a wrong value cancels it)
    Confirm {
        /// Proposal id returned by `propose`
        #[arg(long)]
        proposal_id: String,

        /// Confirmation token returned by `propose`
        #[arg(long)]
        token: String,

        /// Confirmation phrase, exactly as shown by `propose`
        #[arg(long)]
        phrase: String,

        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },

    /// Show the state of a proposal without consuming it
    Show {
        /// Proposal id returned by `propose`
        #[arg(long)]
        proposal_id: String,

        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },

    /// Display version information
    Version,
}

/// Delete gate as assembled by the CLI: backend chosen at runtime.
pub type CliGate = DeleteGate<Arc<dyn SharedStore>, TracingAuditSink>;

/// Open the configured store and build the gate around it.
pub async fn open_gate(config: &GateConfig) -> Result<CliGate, Box<dyn std::error::Error>> {
    let backend: Arc<dyn SharedStore> = match config.store.backend {
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&config.store.path).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    let proposals = ProposalStore::new(backend, config.proposal_settings()?);
    Ok(DeleteGate::new(
        ConfirmationProtocol::new(proposals),
        TracingAuditSink,
    ))
}

/// Release the store. Failures are logged, never surfaced.
pub async fn close_gate(gate: &CliGate) {
    if let Err(e) = gate.protocol().proposals().backend().close().await {
        warn!("failed to close proposal store: {}", e);
    }
}

fn load(config: Option<String>) -> Result<GateConfig, Box<dyn std::error::Error>> {
    let config = GateConfig::resolve(config.as_deref().map(Path::new))?;
    logging::init(&config.logging)?;
    Ok(config)
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::InitConfig {
            config,
            store_path,
            force,
        } => init_config::execute(config, store_path, force),
        Commands::Propose {
            table,
            record_id,
            config,
        } => propose::execute(&load(config)?, &table, &record_id).await,
        Commands::Confirm {
            proposal_id,
            token,
            phrase,
            config,
        } => confirm::execute(&load(config)?, &proposal_id, &token, &phrase).await,
        Commands::Show {
            proposal_id,
            config,
        } => show::execute(&load(config)?, &proposal_id).await,
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
