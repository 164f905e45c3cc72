//! Network error types

use std::io;

use parlay_core::PeerId;

/// Network result type
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A message arrived at a role that must never receive it
    #[error("Protocol violation: rank {rank} received {kind} from rank {sender}")]
    ProtocolViolation {
        rank: PeerId,
        sender: PeerId,
        kind: &'static str,
    },

    #[error("Client channel closed")]
    ChannelClosed,

    #[error(transparent)]
    Core(#[from] parlay_core::Error),
}
