//! TCP transport between ranks
//!
//! Every rank listens on a well-known address. Outbound traffic to each
//! destination goes through one link task that owns a single connection and
//! an unbounded queue, which keeps per-pair ordering. Links connect lazily
//! and retry for a bounded number of attempts to absorb start-up skew; once a
//! link gives up or a write fails, its queued messages are dropped and the
//! next send to that rank opens a fresh link.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use parlay_core::{PeerId, TransportConfig};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::frame::{read_envelope, write_envelope};
use crate::protocol::{Envelope, Message};
use crate::transport::Transport;

/// Transport endpoint backed by TCP connections
///
/// Must be created and used inside a tokio runtime.
pub struct TcpTransport {
    rank: PeerId,
    addrs: Vec<SocketAddr>,
    links: HashMap<PeerId, mpsc::UnboundedSender<Envelope>>,
    inbox: mpsc::UnboundedReceiver<Envelope>,
    connect_retry: Duration,
    connect_attempts: u32,
    accept_task: JoinHandle<()>,
}

impl TcpTransport {
    /// Bind this rank's listener at its configured address
    pub async fn bind(rank: PeerId, size: usize, config: &TransportConfig) -> Result<Self> {
        let addrs = config.group_addrs(size)?;
        let addr = *addrs.get(rank.index()).ok_or_else(|| {
            Error::Protocol(format!("rank {} outside a group of {}", rank, size))
        })?;

        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(
            rank,
            listener,
            addrs,
            config.connect_retry(),
            config.connect_attempts,
        ))
    }

    /// Build an endpoint around an already bound listener.
    ///
    /// `addrs[r]` is where rank `r` listens.
    pub fn from_listener(
        rank: PeerId,
        listener: TcpListener,
        addrs: Vec<SocketAddr>,
        connect_retry: Duration,
        connect_attempts: u32,
    ) -> Self {
        match listener.local_addr() {
            Ok(addr) => info!(rank = %rank, addr = %addr, "Transport listening"),
            Err(e) => warn!(rank = %rank, error = %e, "Transport listening on unknown address"),
        }

        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let accept_task = tokio::spawn(accept_loop(listener, addrs.len(), inbox_tx));

        Self {
            rank,
            addrs,
            links: HashMap::new(),
            inbox,
            connect_retry,
            connect_attempts,
            accept_task,
        }
    }

    fn open_link(&mut self, dest: PeerId, addr: SocketAddr) -> mpsc::UnboundedSender<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(link_task(
            self.rank,
            dest,
            addr,
            rx,
            self.connect_retry,
            self.connect_attempts,
        ));
        self.links.insert(dest, tx.clone());
        tx
    }
}

impl Transport for TcpTransport {
    fn rank(&self) -> PeerId {
        self.rank
    }

    fn size(&self) -> usize {
        self.addrs.len()
    }

    fn isend(&mut self, dest: PeerId, message: Message) {
        let Some(&addr) = self.addrs.get(dest.index()) else {
            warn!(rank = %self.rank, dest = %dest, "Dropping message to rank outside the group");
            return;
        };

        let mut envelope = Envelope::new(self.rank, message);
        if let Some(link) = self.links.get(&dest) {
            match link.send(envelope) {
                Ok(()) => return,
                // Link task ended; reopen below
                Err(mpsc::error::SendError(returned)) => envelope = returned,
            }
        }

        let link = self.open_link(dest, addr);
        if link.send(envelope).is_err() {
            debug!(dest = %dest, "New link closed before first send");
        }
    }

    fn try_recv(&mut self) -> Option<Envelope> {
        self.inbox.try_recv().ok()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// Accept incoming connections and feed their envelopes into the inbox
async fn accept_loop(listener: TcpListener, size: usize, inbox: mpsc::UnboundedSender<Envelope>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!(addr = %addr, "Inbound link accepted");
                tokio::spawn(reader_task(stream, addr, size, inbox.clone()));
            }
            Err(e) => {
                error!(error = %e, "Accept failed");
            }
        }
    }
}

/// Read envelopes from one inbound connection until it closes.
///
/// Envelopes claiming a source rank outside the group never reach the inbox.
async fn reader_task(
    mut stream: TcpStream,
    addr: SocketAddr,
    size: usize,
    inbox: mpsc::UnboundedSender<Envelope>,
) {
    loop {
        match read_envelope(&mut stream).await {
            Ok(envelope) if envelope.source.index() >= size => {
                error!(
                    addr = %addr,
                    source = %envelope.source,
                    size,
                    kind = envelope.message.kind(),
                    "Dropping envelope from rank outside the group"
                );
            }
            Ok(envelope) => {
                if inbox.send(envelope).is_err() {
                    // Transport dropped
                    return;
                }
            }
            Err(Error::ConnectionClosed) => {
                debug!(addr = %addr, "Inbound link closed");
                return;
            }
            Err(e) => {
                warn!(addr = %addr, error = %e, "Inbound link read error");
                return;
            }
        }
    }
}

/// Own the outbound connection to one destination
async fn link_task(
    rank: PeerId,
    dest: PeerId,
    addr: SocketAddr,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    connect_retry: Duration,
    connect_attempts: u32,
) {
    let Some(mut stream) = connect_with_retry(dest, addr, connect_retry, connect_attempts).await
    else {
        warn!(
            rank = %rank,
            dest = %dest,
            dropped = rx.len(),
            "Link gave up connecting, dropping queued messages"
        );
        return;
    };

    if let Err(e) = stream.set_nodelay(true) {
        debug!(dest = %dest, error = %e, "Failed to set TCP_NODELAY");
    }
    debug!(rank = %rank, dest = %dest, "Outbound link connected");

    while let Some(envelope) = rx.recv().await {
        if let Err(e) = write_envelope(&mut stream, &envelope).await {
            warn!(rank = %rank, dest = %dest, error = %e, "Link write failed, dropping link");
            return;
        }
    }
}

async fn connect_with_retry(
    dest: PeerId,
    addr: SocketAddr,
    retry: Duration,
    attempts: u32,
) -> Option<TcpStream> {
    for attempt in 1..=attempts {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Some(stream),
            Err(e) => {
                debug!(dest = %dest, attempt, error = %e, "Connect failed, retrying");
                tokio::time::sleep(retry).await;
            }
        }
    }
    None
}
