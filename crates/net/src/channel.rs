//! Line-oriented bridge to the local client
//!
//! Wraps the two ends of a duplex byte channel (client → peer reader and
//! peer → client writer) and exposes bounded-wait line reads plus flushed
//! line writes. Closing releases both ends exactly once.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tracing::debug;

use crate::error::{Error, Result};

/// Outcome of a bounded wait for the next client line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinePoll {
    /// A complete line, without its terminator
    Line(String),
    /// Nothing arrived within the wait
    Idle,
    /// The client hung up, or the channel was already closed
    Closed,
}

/// Duplex line channel to one external client
pub struct ClientChannel<R, W> {
    lines: Option<Lines<BufReader<R>>>,
    writer: Option<W>,
}

impl<R, W> ClientChannel<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            lines: Some(BufReader::new(reader).lines()),
            writer: Some(writer),
        }
    }

    /// Wait at most `wait` for the next line.
    ///
    /// A line only partially received when the wait expires stays buffered
    /// and is returned by a later call.
    pub async fn poll_line(&mut self, wait: Duration) -> Result<LinePoll> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(LinePoll::Closed);
        };

        match tokio::time::timeout(wait, lines.next_line()).await {
            Err(_elapsed) => Ok(LinePoll::Idle),
            Ok(Ok(Some(line))) => Ok(LinePoll::Line(line)),
            Ok(Ok(None)) => Ok(LinePoll::Closed),
            Ok(Err(e)) => Err(Error::Io(e)),
        }
    }

    /// Write one line and flush it to the client
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::ChannelClosed)?;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Release both ends. Returns false if they were already released.
    pub async fn close(&mut self) -> bool {
        let writer = self.writer.take();
        let reader = self.lines.take();
        if writer.is_none() && reader.is_none() {
            return false;
        }

        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                debug!(error = %e, "Client writer shutdown failed");
            }
        }
        drop(reader);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.lines.is_none() && self.writer.is_none()
    }
}
