//! One member of the group
//!
//! Rank 0 runs the coordinator; every other rank runs a peer bridged to its
//! client through the rank's FIFOs.

use anyhow::{bail, Context, Result};
use parlay_core::{ParlayConfig, PeerId};
use parlay_net::fifo::{self, FifoPaths};
use parlay_net::{Coordinator, Peer, TcpTransport};
use tracing::info;

/// Reject group shapes the launcher should never produce
pub fn validate_group(rank: PeerId, size: usize) -> Result<()> {
    if size < 2 {
        bail!("need at least 2 ranks, got {}", size);
    }
    if rank.index() >= size {
        bail!("rank {} is outside a group of {}", rank, size);
    }
    Ok(())
}

pub async fn run(rank: PeerId, size: usize, config: &ParlayConfig) -> Result<()> {
    validate_group(rank, size)?;

    let transport = TcpTransport::bind(rank, size, &config.transport)
        .await
        .with_context(|| format!("failed to bind transport for rank {}", rank))?;

    if rank.is_coordinator() {
        info!(peers = size - 1, "Registrar started, waiting for peers");
        Coordinator::new(transport, config.poll_interval()).run().await;
        return Ok(());
    }

    let paths = FifoPaths::for_rank(&config.channel.fifo_dir, rank);
    let channel = fifo::accept_client(&paths, config.channel.connect_retry())
        .await
        .with_context(|| format!("failed to open client FIFOs in {}", config.channel.fifo_dir.display()))?;

    Peer::new(transport, channel, config.poll_interval())
        .run()
        .await
        .context("peer runtime failed")?;

    info!(rank = %rank, "Peer finished");
    Ok(())
}
