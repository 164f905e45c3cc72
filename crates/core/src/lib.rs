//! Parlay Core Library
//!
//! Directory, identities, client command grammar and configuration shared by
//! the coordinator and peer processes.

pub mod command;
pub mod config;
pub mod directory;
pub mod error;
pub mod invariants;
pub mod models;

pub use command::ClientCommand;
pub use config::{ChannelConfig, ParlayConfig, RuntimeConfig, TransportConfig};
pub use directory::Directory;
pub use error::{Error, Result};
pub use models::*;
