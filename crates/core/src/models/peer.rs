//! Peer identity model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one process in the group, assigned by the launcher.
///
/// Rank 0 is always the coordinator; every other rank hosts one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub u32);

impl PeerId {
    /// The single directory owner
    pub const COORDINATOR: PeerId = PeerId(0);

    pub fn is_coordinator(self) -> bool {
        self == Self::COORDINATOR
    }

    /// Position of this rank in a group-sized table
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Ranks that host clients in a group of `size` processes
    pub fn peers(size: usize) -> impl Iterator<Item = PeerId> {
        (1..size as u32).map(PeerId)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
