//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use crate::directory::Directory;
use crate::models::PeerId;

/// Validate a directory snapshot against the group it was built for
pub fn assert_directory_invariants(directory: &Directory, size: usize) {
    for (username, peer) in directory.iter() {
        // The coordinator never hosts a client
        debug_assert!(
            !peer.is_coordinator(),
            "User '{}' is bound to the coordinator",
            username
        );

        debug_assert!(
            peer.index() < size,
            "User '{}' is bound to rank {} outside a group of {}",
            username,
            peer,
            size
        );
    }
}

/// Validate that a peer never routes a message to a rank outside the group
pub fn assert_route_in_group(target: PeerId, size: usize) {
    debug_assert!(
        target.index() < size,
        "Route to rank {} outside a group of {}",
        target,
        size
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_directory_passes() {
        let mut dir = Directory::new();
        dir.register("alice", PeerId(1));
        dir.register("bob", PeerId(2));
        assert_directory_invariants(&dir, 3);
        assert_route_in_group(PeerId(2), 3);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside a group")]
    fn test_out_of_group_rank_detected() {
        let mut dir = Directory::new();
        dir.register("alice", PeerId(5));
        assert_directory_invariants(&dir, 3);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "bound to the coordinator")]
    fn test_coordinator_binding_detected() {
        let mut dir = Directory::new();
        dir.register("root", PeerId::COORDINATOR);
        assert_directory_invariants(&dir, 3);
    }
}
