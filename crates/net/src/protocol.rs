//! Inter-process protocol message types
//!
//! All envelopes are JSON-serialized and length-prefixed on the wire.

use parlay_core::{Directory, PeerId};
use serde::{Deserialize, Serialize};

/// Protocol messages exchanged between ranks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Peer asks the coordinator to bind a username to its rank
    Register { username: String },

    /// Coordinator pushes its full directory (replacement, not a delta)
    DirectoryUpdate { snapshot: Directory },

    /// Chat from one peer to another
    Chat { sender: String, body: String },
}

impl Message {
    /// Short name used in logs and protocol-violation reports
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Register { .. } => "Register",
            Message::DirectoryUpdate { .. } => "DirectoryUpdate",
            Message::Chat { .. } => "Chat",
        }
    }
}

/// A message together with the rank that sent it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub source: PeerId,
    pub message: Message,
}

impl Envelope {
    pub fn new(source: PeerId, message: Message) -> Self {
        Self { source, message }
    }

    /// Serialize envelope to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize envelope from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let env = Envelope::new(
            PeerId(2),
            Message::Chat {
                sender: "alice".to_string(),
                body: "hello".to_string(),
            },
        );

        let value: serde_json::Value = serde_json::from_slice(&env.to_bytes().unwrap()).unwrap();
        assert_eq!(value["source"], 2);
        assert_eq!(value["message"]["type"], "Chat");
        assert_eq!(value["message"]["body"], "hello");
    }

    #[test]
    fn test_directory_update_decodes() {
        let raw = br#"{"source":0,"message":{"type":"DirectoryUpdate","snapshot":{"alice":1,"bob":2}}}"#;
        let env = Envelope::from_bytes(raw).unwrap();

        assert!(env.source.is_coordinator());
        match env.message {
            Message::DirectoryUpdate { snapshot } => {
                assert_eq!(snapshot.lookup("bob"), Some(PeerId(2)));
                assert_eq!(snapshot.len(), 2);
            }
            other => panic!("Wrong message type: {}", other.kind()),
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let raw = br#"{"source":1,"message":{"type":"Ping"}}"#;
        assert!(Envelope::from_bytes(raw).is_err());
    }
}
