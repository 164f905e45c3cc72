//! Process-to-process message passing
//!
//! A [`Transport`] gives one rank fire-and-forget sends to any rank in the
//! group and a non-blocking receive from any source. Messages from one
//! sender to one receiver arrive in the order they were sent; nothing is
//! promised across different senders.

use parlay_core::PeerId;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::{Envelope, Message};

/// Message passing endpoint of a single rank
pub trait Transport: Send {
    /// This endpoint's rank
    fn rank(&self) -> PeerId;

    /// Number of ranks in the group, coordinator included
    fn size(&self) -> usize;

    /// Queue `message` for `dest` and return immediately.
    ///
    /// Delivery failures are never reported back to the caller.
    fn isend(&mut self, dest: PeerId, message: Message);

    /// Take the next pending envelope from any sender, if one is waiting
    fn try_recv(&mut self) -> Option<Envelope>;
}

/// In-process transport where every rank lives in the same address space
pub struct MemoryTransport {
    rank: PeerId,
    outboxes: Vec<mpsc::UnboundedSender<Envelope>>,
    inbox: mpsc::UnboundedReceiver<Envelope>,
}

impl MemoryTransport {
    /// Build a fully connected group of `size` endpoints, indexed by rank
    pub fn fabric(size: usize) -> Vec<MemoryTransport> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..size).map(|_| mpsc::unbounded_channel()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| MemoryTransport {
                rank: PeerId(rank as u32),
                outboxes: senders.clone(),
                inbox,
            })
            .collect()
    }
}

impl Transport for MemoryTransport {
    fn rank(&self) -> PeerId {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn isend(&mut self, dest: PeerId, message: Message) {
        let Some(outbox) = self.outboxes.get(dest.index()) else {
            warn!(rank = %self.rank, dest = %dest, "Dropping message to rank outside the group");
            return;
        };

        if outbox.send(Envelope::new(self.rank, message)).is_err() {
            debug!(rank = %self.rank, dest = %dest, "Destination endpoint gone, message dropped");
        }
    }

    fn try_recv(&mut self) -> Option<Envelope> {
        self.inbox.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(body: &str) -> Message {
        Message::Chat {
            sender: "alice".into(),
            body: body.into(),
        }
    }

    #[test]
    fn test_per_pair_order_preserved() {
        let mut fabric = MemoryTransport::fabric(3);
        let mut receiver = fabric.pop().unwrap();
        let mut sender = fabric.pop().unwrap();

        for i in 0..5 {
            sender.isend(PeerId(2), chat(&i.to_string()));
        }

        let bodies: Vec<String> = std::iter::from_fn(|| receiver.try_recv())
            .map(|env| {
                assert_eq!(env.source, PeerId(1));
                match env.message {
                    Message::Chat { body, .. } => body,
                    other => panic!("Unexpected {}", other.kind()),
                }
            })
            .collect();
        assert_eq!(bodies, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn test_try_recv_empty_returns_none() {
        let mut fabric = MemoryTransport::fabric(2);
        assert!(fabric[0].try_recv().is_none());
        assert_eq!(fabric[1].size(), 2);
        assert_eq!(fabric[1].rank(), PeerId(1));
    }

    #[test]
    fn test_out_of_group_send_dropped() {
        let mut fabric = MemoryTransport::fabric(2);
        fabric[1].isend(PeerId(7), chat("lost"));
        assert!(fabric[0].try_recv().is_none());
        assert!(fabric[1].try_recv().is_none());
    }

    #[test]
    fn test_send_to_self() {
        let mut fabric = MemoryTransport::fabric(2);
        fabric[1].isend(PeerId(1), chat("echo"));
        let env = fabric[1].try_recv().unwrap();
        assert_eq!(env.source, PeerId(1));
    }
}
