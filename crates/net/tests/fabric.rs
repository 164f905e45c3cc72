//! Whole-group behaviour over the in-memory transport

mod common;

use common::{spawn_coordinator, spawn_peer};
use parlay_net::MemoryTransport;

#[tokio::test]
async fn test_alice_messages_bob() {
    let mut fabric = MemoryTransport::fabric(3).into_iter();
    let coordinator = spawn_coordinator(fabric.next().unwrap());
    let (_a, mut alice) = spawn_peer(fabric.next().unwrap());
    let (_b, mut bob) = spawn_peer(fabric.next().unwrap());

    alice.register("alice").await;
    bob.register("bob").await;

    alice.wait_for_listing("{alice: 1, bob: 2}").await;

    alice.send("/bob hello").await;
    assert_eq!(alice.recv().await, "[To bob]: hello");
    assert_eq!(bob.recv().await, "[alice]: hello");

    coordinator.abort();
}

#[tokio::test]
async fn test_directories_converge() {
    let names = ["ann", "ben", "cat", "dan"];
    let mut fabric = MemoryTransport::fabric(names.len() + 1).into_iter();
    let coordinator = spawn_coordinator(fabric.next().unwrap());

    let mut clients = Vec::new();
    for (transport, name) in fabric.zip(names) {
        let (_handle, mut client) = spawn_peer(transport);
        client.register(name).await;
        clients.push(client);
    }

    let full = "{ann: 1, ben: 2, cat: 3, dan: 4}";
    for client in &mut clients {
        client.wait_for_listing(full).await;
    }

    coordinator.abort();
}

#[tokio::test]
async fn test_broadcast_reaches_everyone_else() {
    let mut fabric = MemoryTransport::fabric(4).into_iter();
    let coordinator = spawn_coordinator(fabric.next().unwrap());
    let (_a, mut alice) = spawn_peer(fabric.next().unwrap());
    let (_b, mut bob) = spawn_peer(fabric.next().unwrap());
    let (_c, mut carol) = spawn_peer(fabric.next().unwrap());

    alice.register("alice").await;
    bob.register("bob").await;
    carol.register("carol").await;
    alice
        .wait_for_listing("{alice: 1, bob: 2, carol: 3}")
        .await;

    alice.send("/all standup in 5").await;
    assert_eq!(alice.recv().await, "[Broadcast]: standup in 5");
    assert_eq!(bob.recv().await, "[alice]: [Broadcast] standup in 5");
    assert_eq!(carol.recv().await, "[alice]: [Broadcast] standup in 5");

    coordinator.abort();
}

#[tokio::test]
async fn test_peer_exit_leaves_group_running() {
    let mut fabric = MemoryTransport::fabric(3).into_iter();
    let coordinator = spawn_coordinator(fabric.next().unwrap());
    let (alice_task, mut alice) = spawn_peer(fabric.next().unwrap());
    let (_b, mut bob) = spawn_peer(fabric.next().unwrap());

    alice.register("alice").await;
    bob.register("bob").await;
    bob.wait_for_listing("{alice: 1, bob: 2}").await;

    let mut leftover = alice.hang_up().await;
    alice_task.await.unwrap().unwrap();
    // Peer released its writer on exit
    assert!(leftover.next_line().await.unwrap().is_none());

    // Stale entry stays; sending to it is silently lost, not an error
    bob.send("/alice anyone?").await;
    assert_eq!(bob.recv().await, "[To alice]: anyone?");
    bob.send("/ls").await;
    assert_eq!(bob.recv().await, "User online: {alice: 1, bob: 2}");

    coordinator.abort();
}
