//! Group launcher
//!
//! Spawns one `parlay run` process per rank on this machine and tracks them.
//! The group is torn down when the coordinator exits, when every peer has
//! exited, or on Ctrl-C. A single peer leaving does not stop the others.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use parlay_core::PeerId;
use tokio::process::{Child, Command};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::node::validate_group;

/// How often child processes are checked
const CHECK_INTERVAL: Duration = Duration::from_millis(200);

/// Status of a launched rank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankStatus {
    /// Process is running
    Running,
    /// Process has exited on its own
    Exited,
    /// Process was killed by the launcher
    Stopped,
    /// Status could not be read
    Failed,
}

impl RankStatus {
    pub fn is_alive(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// One spawned member of the group
pub struct LaunchedRank {
    pub rank: PeerId,
    status: RankStatus,
    child: Option<Child>,
}

impl LaunchedRank {
    /// Get current status (updates from process state)
    pub fn status(&mut self) -> RankStatus {
        if self.status == RankStatus::Running {
            if let Some(ref mut child) = self.child {
                match child.try_wait() {
                    Ok(Some(exit)) => {
                        info!(rank = %self.rank, status = %exit, "Rank exited");
                        self.status = RankStatus::Exited;
                        self.child = None;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(rank = %self.rank, error = %e, "Cannot read rank status");
                        self.status = RankStatus::Failed;
                        self.child = None;
                    }
                }
            } else {
                self.status = RankStatus::Exited;
            }
        }
        self.status
    }

    /// Kill the process if it is still running
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                warn!(rank = %self.rank, error = %e, "Failed to stop rank");
            }
            self.status = RankStatus::Stopped;
        }
    }
}

/// Arguments that make a child act as `rank`
pub fn run_args(rank: PeerId, size: usize, config: Option<&Path>) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    if let Some(path) = config {
        args.push("--config".into());
        args.push(path.as_os_str().to_owned());
    }
    let rank = rank.to_string();
    let size = size.to_string();
    args.extend(["run", "--rank", rank.as_str(), "--size", size.as_str()].map(OsString::from));
    args
}

/// Spawn the whole group and wait until it should stop
pub async fn launch(size: usize, config: Option<PathBuf>) -> Result<()> {
    validate_group(PeerId::COORDINATOR, size)?;
    let exe = std::env::current_exe().context("cannot locate the parlay executable")?;

    let mut ranks = Vec::with_capacity(size);
    for rank in (0..size as u32).map(PeerId) {
        let child = Command::new(&exe)
            .args(run_args(rank, size, config.as_deref()))
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn rank {}", rank))?;
        info!(rank = %rank, pid = ?child.id(), "Spawned rank");
        ranks.push(LaunchedRank {
            rank,
            status: RankStatus::Running,
            child: Some(child),
        });
    }

    info!(size, "Group launched; attach clients with `parlay client --rank <r>`");
    let reason = wait_for_stop(&mut ranks).await;
    info!(reason, "Stopping group");

    for rank in &mut ranks {
        rank.stop().await;
    }
    Ok(())
}

async fn wait_for_stop(ranks: &mut [LaunchedRank]) -> &'static str {
    wait_for_stop_or(tokio::signal::ctrl_c(), ranks).await
}

/// Wait until `interrupt` resolves or the group should stop on its own.
///
/// `interrupt` is polled across checks, so a signal between two checks is
/// never lost.
async fn wait_for_stop_or<F>(interrupt: F, ranks: &mut [LaunchedRank]) -> &'static str
where
    F: Future,
{
    tokio::pin!(interrupt);
    let mut checks = tokio::time::interval(CHECK_INTERVAL);
    checks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut interrupt => return "interrupted",
            _ = checks.tick() => {
                if let Some(reason) = stop_reason(ranks) {
                    return reason;
                }
            }
        }
    }
}

fn stop_reason(ranks: &mut [LaunchedRank]) -> Option<&'static str> {
    let alive: Vec<bool> = ranks.iter_mut().map(|r| r.status().is_alive()).collect();
    match alive.split_first() {
        Some((false, _)) => Some("coordinator exited"),
        Some((true, peers)) if peers.iter().all(|alive| !alive) => Some("all peers exited"),
        _ => None,
    }
}
