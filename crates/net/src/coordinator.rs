//! Directory coordinator (rank 0)
//!
//! Owns the authoritative username directory. Every registration overwrites
//! the username's binding and is followed by a full snapshot pushed to every
//! peer rank, the registrant included. Sends are fire-and-forget.

use std::time::Duration;

use parlay_core::invariants::assert_directory_invariants;
use parlay_core::{Directory, PeerId};
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::protocol::{Envelope, Message};
use crate::transport::Transport;

/// Result of one coordinator poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// An envelope was taken and handled
    Handled,
    /// Nothing was pending
    Idle,
}

/// The single directory owner
pub struct Coordinator<T> {
    transport: T,
    directory: Directory,
    poll_interval: Duration,
}

impl<T: Transport> Coordinator<T> {
    pub fn new(transport: T, poll_interval: Duration) -> Self {
        Self {
            transport,
            directory: Directory::new(),
            poll_interval,
        }
    }

    /// Authoritative directory
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Handle one pending envelope, or sleep for the poll interval if none
    pub async fn poll_and_handle(&mut self) -> Result<PollOutcome> {
        match self.transport.try_recv() {
            Some(envelope) => {
                self.handle(envelope)?;
                Ok(PollOutcome::Handled)
            }
            None => {
                tokio::time::sleep(self.poll_interval).await;
                Ok(PollOutcome::Idle)
            }
        }
    }

    /// Apply one envelope. Anything but `Register` is a protocol violation.
    pub fn handle(&mut self, envelope: Envelope) -> Result<()> {
        let Envelope { source, message } = envelope;
        match message {
            Message::Register { username } => {
                info!(username = %username, rank = %source, "Registering user");
                if let Some(previous) = self.directory.register(username.clone(), source) {
                    debug!(username = %username, previous = %previous, "Overwrote existing binding");
                }
                assert_directory_invariants(&self.directory, self.transport.size());
                self.broadcast_directory();
                Ok(())
            }
            other => Err(Error::ProtocolViolation {
                rank: self.transport.rank(),
                sender: source,
                kind: other.kind(),
            }),
        }
    }

    /// Push the full directory to every peer rank
    fn broadcast_directory(&mut self) {
        let size = self.transport.size();
        for rank in PeerId::peers(size) {
            self.transport.isend(
                rank,
                Message::DirectoryUpdate {
                    snapshot: self.directory.clone(),
                },
            );
        }
        info!(recipients = size.saturating_sub(1), "Broadcast updated directory");
    }

    /// Serve forever. Errors are reported and the loop keeps going.
    pub async fn run(mut self) {
        info!(size = self.transport.size(), "Coordinator started");
        loop {
            if let Err(e) = self.poll_and_handle().await {
                error!(error = %e, "Dropped message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn setup(size: usize) -> (Coordinator<MemoryTransport>, Vec<MemoryTransport>) {
        let mut fabric = MemoryTransport::fabric(size);
        let coordinator_end = fabric.remove(0);
        (
            Coordinator::new(coordinator_end, Duration::from_millis(1)),
            fabric,
        )
    }

    fn register(peer: &mut MemoryTransport, username: &str) {
        peer.isend(
            PeerId::COORDINATOR,
            Message::Register {
                username: username.into(),
            },
        );
    }

    fn drain(peer: &mut MemoryTransport) -> Vec<Envelope> {
        std::iter::from_fn(|| peer.try_recv()).collect()
    }

    #[tokio::test]
    async fn test_idle_poll_has_no_side_effects() {
        let (mut coordinator, mut peers) = setup(3);

        assert_eq!(
            coordinator.poll_and_handle().await.unwrap(),
            PollOutcome::Idle
        );
        assert!(coordinator.directory().is_empty());
        assert!(peers.iter_mut().all(|p| p.try_recv().is_none()));
    }

    #[tokio::test]
    async fn test_register_broadcasts_to_every_peer() {
        let (mut coordinator, mut peers) = setup(4);
        register(&mut peers[0], "alice");

        assert_eq!(
            coordinator.poll_and_handle().await.unwrap(),
            PollOutcome::Handled
        );
        assert_eq!(coordinator.directory().lookup("alice"), Some(PeerId(1)));

        // Ranks 1..4, registrant included
        for peer in peers.iter_mut() {
            let received = drain(peer);
            assert_eq!(received.len(), 1);
            assert!(received[0].source.is_coordinator());
            match &received[0].message {
                Message::DirectoryUpdate { snapshot } => {
                    assert_eq!(snapshot, coordinator.directory());
                }
                other => panic!("Unexpected {}", other.kind()),
            }
        }
    }

    #[tokio::test]
    async fn test_reregistration_keeps_latest_registrant() {
        let (mut coordinator, mut peers) = setup(3);
        register(&mut peers[0], "alice");
        register(&mut peers[1], "alice");

        coordinator.poll_and_handle().await.unwrap();
        coordinator.poll_and_handle().await.unwrap();

        assert_eq!(coordinator.directory().lookup("alice"), Some(PeerId(2)));
        assert_eq!(coordinator.directory().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_is_protocol_violation() {
        let (mut coordinator, mut peers) = setup(2);
        peers[0].isend(
            PeerId::COORDINATOR,
            Message::Chat {
                sender: "alice".into(),
                body: "hi".into(),
            },
        );

        let result = coordinator.poll_and_handle().await;
        assert!(matches!(
            result,
            Err(Error::ProtocolViolation {
                sender: PeerId(1),
                kind: "Chat",
                ..
            })
        ));
        assert!(coordinator.directory().is_empty());
        assert!(peers[0].try_recv().is_none());
    }
}
