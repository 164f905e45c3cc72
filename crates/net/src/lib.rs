//! Parlay Network Library
//!
//! Message passing between the ranks of a Parlay group and the runtimes that
//! sit on top of it.
//!
//! # Architecture
//!
//! - **Transport**: fire-and-forget sends, non-blocking receive from any rank
//! - **Coordinator**: rank 0, owns the username directory and broadcasts it
//! - **Peer**: every other rank, bridges one client into the group
//! - **Channel**: line-oriented duplex link between a peer and its client
//! - **Protocol**: length-prefixed JSON envelopes
//!
//! # Usage
//!
//! ```ignore
//! // Rank 0
//! let transport = TcpTransport::bind(PeerId(0), size, &config.transport).await?;
//! Coordinator::new(transport, config.poll_interval()).run().await;
//!
//! // Any other rank
//! let transport = TcpTransport::bind(rank, size, &config.transport).await?;
//! let channel = fifo::accept_client(&paths, config.channel.connect_retry()).await?;
//! Peer::new(transport, channel, config.poll_interval()).run().await?;
//! ```

pub mod channel;
pub mod coordinator;
pub mod error;
#[cfg(unix)]
pub mod fifo;
mod frame;
pub mod peer;
pub mod protocol;
pub mod tcp;
pub mod transport;

pub use channel::{ClientChannel, LinePoll};
pub use coordinator::{Coordinator, PollOutcome};
pub use error::{Error, Result};
pub use peer::{Peer, PeerState};
pub use protocol::{Envelope, Message};
pub use tcp::TcpTransport;
pub use transport::{MemoryTransport, Transport};
