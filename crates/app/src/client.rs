//! Terminal client bridge
//!
//! Forwards keyboard lines to a peer and prints whatever the peer sends
//! back. All chat semantics live in the peer; this is only plumbing.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use parlay_core::{ParlayConfig, PeerId};
use parlay_net::fifo::{self, FifoPaths};
use parlay_net::{ClientChannel, LinePoll};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

/// Upper bound on one wait for peer output
const PEER_WAIT: Duration = Duration::from_millis(250);

/// Attach this terminal to the peer at `rank`
pub async fn attach(rank: PeerId, config: &ParlayConfig) -> Result<()> {
    if rank.is_coordinator() {
        bail!("rank 0 is the coordinator and has no client");
    }

    let paths = FifoPaths::for_rank(&config.channel.fifo_dir, rank);
    info!(rank = %rank, "Connecting to peer");
    let mut channel = fifo::connect_to_peer(&paths, config.channel.connect_retry())
        .await
        .context("failed to open peer FIFOs")?;

    let result = pump(tokio::io::stdin(), tokio::io::stdout(), &mut channel).await;
    channel.close().await;
    result
}

/// Shuttle lines between the terminal and the peer until either side ends
pub async fn pump<I, O, R, W>(
    input: I,
    mut output: O,
    channel: &mut ClientChannel<R, W>,
) -> Result<()>
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut input = BufReader::new(input).lines();

    loop {
        // Peer output first, so nothing pending is lost when input ends
        tokio::select! {
            biased;

            polled = channel.poll_line(PEER_WAIT) => match polled? {
                LinePoll::Line(line) => {
                    output.write_all(line.as_bytes()).await?;
                    output.write_all(b"\n").await?;
                    output.flush().await?;
                }
                LinePoll::Idle => {}
                LinePoll::Closed => {
                    info!("Peer closed the connection");
                    return Ok(());
                }
            },
            line = input.next_line() => match line.context("failed to read input")? {
                Some(line) => channel.write_line(&line).await.context("peer went away")?,
                None => return Ok(()),
            },
        }
    }
}
