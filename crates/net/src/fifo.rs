//! Named-pipe realisation of the client channel
//!
//! Each peer rank owns two FIFOs in a shared directory:
//! `parlay_fifo_in_<rank>` carries client → peer lines and
//! `parlay_fifo_out_<rank>` carries peer → client lines.
//!
//! Handshake order matters. The peer opens its inbound end for reading first
//! and then waits for the client to open the outbound end. The client opens
//! the inbound end for writing before opening the outbound end, so by the
//! time the peer is connected the client's writer already exists and the
//! peer never sees a spurious end-of-stream.
//!
//! The client holds a writer on its own outbound FIFO until the first byte
//! from the peer arrives, which covers the window before the peer has
//! opened that FIFO. After that only the peer writes to it, so the client
//! sees end-of-stream as soon as the peer exits.

use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use parlay_core::PeerId;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::net::unix::pipe;
use tracing::{debug, info};

use crate::channel::ClientChannel;
use crate::error::Result;

/// Peer-side client channel over a pair of FIFOs
pub type FifoChannel = ClientChannel<pipe::Receiver, pipe::Sender>;

/// Client-side channel: reads peer output, writes client input
pub type PeerLink = ClientChannel<PeerOutput, pipe::Sender>;

/// Read end of a peer's outbound FIFO, as held by the client
pub struct PeerOutput {
    receiver: pipe::Receiver,
    keepalive: Option<pipe::Sender>,
}

impl AsyncRead for PeerOutput {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let polled = Pin::new(&mut self.receiver).poll_read(cx, buf);

        // Bytes can only come from the peer, so its writer is attached
        if matches!(polled, Poll::Ready(Ok(())))
            && buf.filled().len() > before
            && self.keepalive.take().is_some()
        {
            debug!("Peer output attached, releasing keepalive writer");
        }
        polled
    }
}

/// Well-known FIFO locations of one peer rank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoPaths {
    /// Client → peer
    pub inbound: PathBuf,
    /// Peer → client
    pub outbound: PathBuf,
}

impl FifoPaths {
    pub fn for_rank(dir: &Path, rank: PeerId) -> Self {
        Self {
            inbound: dir.join(format!("parlay_fifo_in_{}", rank)),
            outbound: dir.join(format!("parlay_fifo_out_{}", rank)),
        }
    }

    /// Create both FIFOs, reusing any that already exist
    pub fn ensure(&self) -> Result<()> {
        ensure_fifo(&self.inbound)?;
        ensure_fifo(&self.outbound)?;
        Ok(())
    }
}

/// Create a FIFO at `path` unless one is already there
pub fn ensure_fifo(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.file_type().is_fifo() => {
            debug!(path = %path.display(), "Reusing existing FIFO");
            Ok(())
        }
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a FIFO", path.display()),
        )
        .into()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            match mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR) {
                // Lost a creation race with the other side
                Ok(()) | Err(Errno::EEXIST) => Ok(()),
                Err(errno) => Err(io::Error::from(errno).into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn no_reader_yet(e: &io::Error) -> bool {
    e.raw_os_error() == Some(Errno::ENXIO as i32)
}

/// Open a FIFO for writing, retrying until the reading side exists
async fn open_sender_when_ready(path: &Path, retry: Duration) -> Result<pipe::Sender> {
    loop {
        match pipe::OpenOptions::new().open_sender(path) {
            Ok(sender) => return Ok(sender),
            Err(e) if no_reader_yet(&e) => tokio::time::sleep(retry).await,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Peer side: create the FIFOs and wait until the client has connected
pub async fn accept_client(paths: &FifoPaths, retry: Duration) -> Result<FifoChannel> {
    paths.ensure()?;

    let receiver = pipe::OpenOptions::new().open_receiver(&paths.inbound)?;
    info!(path = %paths.outbound.display(), "Waiting for client connection");
    let sender = open_sender_when_ready(&paths.outbound, retry).await?;
    info!("Client connected");

    Ok(ClientChannel::new(receiver, sender))
}

/// Client side: attach to a peer's FIFOs, retrying until the peer is up.
///
/// The returned channel reads peer output and writes client input.
pub async fn connect_to_peer(paths: &FifoPaths, retry: Duration) -> Result<PeerLink> {
    paths.ensure()?;

    let sender = open_sender_when_ready(&paths.inbound, retry).await?;

    let receiver = pipe::OpenOptions::new().open_receiver(&paths.outbound)?;
    // Our own reader exists, so this open cannot fail with ENXIO
    let keepalive = pipe::OpenOptions::new().open_sender(&paths.outbound)?;
    let output = PeerOutput {
        receiver,
        keepalive: Some(keepalive),
    };

    Ok(ClientChannel::new(output, sender))
}
