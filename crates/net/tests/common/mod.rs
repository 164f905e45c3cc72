//! Shared helpers for whole-group tests

#![allow(dead_code)]

use std::time::Duration;

use parlay_net::{ClientChannel, Coordinator, Peer, Transport};
use tokio::io::{
    duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};
use tokio::task::JoinHandle;

pub const POLL: Duration = Duration::from_millis(2);

/// The client end of a peer's channel
pub struct TestClient {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl TestClient {
    pub async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }

    pub async fn recv(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("line should arrive")
            .unwrap()
            .expect("peer closed the channel")
    }

    /// Consume the banner and register
    pub async fn register(&mut self, name: &str) {
        self.recv().await;
        self.recv().await;
        self.send(name).await;
        assert_eq!(self.recv().await, format!("[System] Registered as '{}'.", name));
        self.recv().await;
    }

    /// Repeat `/ls` until the listing matches
    pub async fn wait_for_listing(&mut self, expected: &str) {
        let expected = format!("User online: {}", expected);
        for _ in 0..500 {
            self.send("/ls").await;
            if self.recv().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("listing never became {}", expected);
    }

    pub async fn hang_up(mut self) -> Lines<BufReader<ReadHalf<DuplexStream>>> {
        self.writer.shutdown().await.unwrap();
        self.lines
    }
}

/// Spawn a peer runtime on `transport` and hand back its client
pub fn spawn_peer<T>(transport: T) -> (JoinHandle<parlay_net::Result<()>>, TestClient)
where
    T: Transport + 'static,
{
    let (client_side, peer_side) = duplex(16 * 1024);
    let (peer_r, peer_w) = tokio::io::split(peer_side);
    let (client_r, client_w) = tokio::io::split(client_side);

    let peer = Peer::new(transport, ClientChannel::new(peer_r, peer_w), POLL);
    let handle = tokio::spawn(peer.run());

    let client = TestClient {
        lines: BufReader::new(client_r).lines(),
        writer: client_w,
    };
    (handle, client)
}

pub fn spawn_coordinator<T>(transport: T) -> JoinHandle<()>
where
    T: Transport + 'static,
{
    tokio::spawn(Coordinator::new(transport, POLL).run())
}
