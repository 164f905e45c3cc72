//! Username directory
//!
//! Maps usernames to the rank hosting that user's client. The coordinator
//! owns the authoritative copy; peers hold snapshots that are replaced
//! wholesale whenever an update arrives.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::PeerId;

/// Mapping from username to peer rank
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Directory {
    entries: BTreeMap<String, PeerId>,
}

impl Directory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `username` to `peer`, overwriting any earlier binding.
    ///
    /// Returns the rank the username was previously bound to, if any.
    pub fn register(&mut self, username: impl Into<String>, peer: PeerId) -> Option<PeerId> {
        self.entries.insert(username.into(), peer)
    }

    /// Look up the rank hosting `username`
    pub fn lookup(&self, username: &str) -> Option<PeerId> {
        self.entries.get(username).copied()
    }

    /// Iterate entries in username order
    pub fn iter(&self) -> impl Iterator<Item = (&str, PeerId)> {
        self.entries.iter().map(|(name, peer)| (name.as_str(), *peer))
    }

    /// Entries hosted anywhere but `me`, i.e. the fan-out set of a broadcast
    pub fn others(&self, me: PeerId) -> impl Iterator<Item = (&str, PeerId)> {
        self.iter().filter(move |(_, peer)| *peer != me)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Human-readable listing, e.g. `{alice: 1, bob: 2}`
impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, peer)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", name, peer)?;
        }
        f.write_str("}")
    }
}

impl FromIterator<(String, PeerId)> for Directory {
    fn from_iter<I: IntoIterator<Item = (String, PeerId)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
