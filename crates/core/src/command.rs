//! Client text commands
//!
//! Grammar of a registered client's input lines:
//!
//! - `/ls` lists the cached directory
//! - `/all <text>` broadcasts to every other known user
//! - `/<user> <text>` sends directly to one user
//!
//! Anything else is a format error. The first line of a session is never
//! parsed here; it is always taken as the username.

/// Target name reserved for broadcast
pub const BROADCAST_TARGET: &str = "all";

/// Command that lists the directory
pub const LIST_COMMAND: &str = "/ls";

/// A parsed client line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand<'a> {
    /// `/ls`
    List,
    /// `/all <body>`
    Broadcast { body: &'a str },
    /// `/<target> <body>`
    Direct { target: &'a str, body: &'a str },
    /// Non-empty line that is not a command
    Malformed,
}

impl<'a> ClientCommand<'a> {
    /// Parse an already-trimmed, non-empty line.
    ///
    /// The target ends at the first space; the body is everything after it,
    /// or empty when the line has no space.
    pub fn parse(line: &'a str) -> Self {
        if line == LIST_COMMAND {
            return ClientCommand::List;
        }

        let Some(rest) = line.strip_prefix('/') else {
            return ClientCommand::Malformed;
        };

        let (target, body) = rest.split_once(' ').unwrap_or((rest, ""));
        if target == BROADCAST_TARGET {
            ClientCommand::Broadcast { body }
        } else {
            ClientCommand::Direct { target, body }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list() {
        assert_eq!(ClientCommand::parse("/ls"), ClientCommand::List);
        // Only the exact literal lists
        assert_eq!(
            ClientCommand::parse("/ls now"),
            ClientCommand::Direct {
                target: "ls",
                body: "now"
            }
        );
    }

    #[test]
    fn test_split_on_first_space_only() {
        assert_eq!(
            ClientCommand::parse("/bob hello there  bob"),
            ClientCommand::Direct {
                target: "bob",
                body: "hello there  bob"
            }
        );
    }

    #[test]
    fn test_missing_body_is_empty() {
        assert_eq!(
            ClientCommand::parse("/bob"),
            ClientCommand::Direct {
                target: "bob",
                body: ""
            }
        );
        assert_eq!(
            ClientCommand::parse("/all"),
            ClientCommand::Broadcast { body: "" }
        );
    }

    #[test]
    fn test_broadcast() {
        assert_eq!(
            ClientCommand::parse("/all hi everyone"),
            ClientCommand::Broadcast { body: "hi everyone" }
        );
    }

    #[test]
    fn test_plain_text_is_malformed() {
        assert_eq!(ClientCommand::parse("hello"), ClientCommand::Malformed);
        assert_eq!(ClientCommand::parse("ls"), ClientCommand::Malformed);
    }
}
