//! Parlay - a minimal distributed chat fabric
//!
//! One coordinator process owns the username directory; every other process
//! is a peer that bridges one terminal client into the group.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use parlay_core::{ParlayConfig, PeerId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod client;
mod launcher;
mod node;

/// Parlay chat fabric.
#[derive(Parser)]
#[command(name = "parlay", version, about = "Minimal distributed chat fabric")]
struct Cli {
    /// Path to config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one member of the group (rank 0 is the coordinator).
    Run {
        /// This process's rank.
        #[arg(long)]
        rank: u32,
        /// Number of processes in the group.
        #[arg(long)]
        size: usize,
    },
    /// Spawn a whole group on this machine.
    Launch {
        /// Number of processes, coordinator included.
        #[arg(long)]
        size: usize,
    },
    /// Attach this terminal to a peer.
    Client {
        /// Rank of the peer to attach to.
        #[arg(long)]
        rank: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so client output on stdout stays clean
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { rank, size } => {
            let config = ParlayConfig::load(cli.config.as_deref())?;
            node::run(PeerId(rank), size, &config).await
        }
        Command::Launch { size } => launcher::launch(size, cli.config).await,
        Command::Client { rank } => {
            let config = ParlayConfig::load(cli.config.as_deref())?;
            client::attach(PeerId(rank), &config).await
        }
    }
}
