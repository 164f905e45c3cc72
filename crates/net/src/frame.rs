//! Framing of envelopes on a rank-to-rank TCP link
//!
//! Each [`Envelope`] (sending rank plus message) is one frame: a 4-byte
//! big-endian payload length followed by the envelope as JSON. A directory
//! snapshot is the largest thing a rank ever sends, so frames are capped at
//! 1 MiB; anything bigger means the link is out of sync.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::Envelope;

/// Upper bound on one envelope's JSON payload
const MAX_FRAME_SIZE: u32 = 1024 * 1024;

/// EOF mid-frame means the sending rank hung up
fn eof_as_closed(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::ConnectionClosed
    } else {
        Error::Io(e)
    }
}

/// Read the next envelope from an inbound link.
///
/// Returns `ConnectionClosed` when the link ends, even partway through a frame.
pub async fn read_envelope<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Envelope> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(eof_as_closed)?;

    let len = u32::from_be_bytes(len_buf);

    if len == 0 {
        return Err(Error::Protocol("Empty envelope frame".into()));
    }
    if len > MAX_FRAME_SIZE {
        return Err(Error::Protocol(format!(
            "Envelope frame of {} bytes exceeds {}",
            len, MAX_FRAME_SIZE
        )));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await.map_err(eof_as_closed)?;

    Envelope::from_bytes(&payload).map_err(|e| Error::Protocol(format!("Malformed envelope: {}", e)))
}

/// Write one envelope to an outbound link and flush it
pub async fn write_envelope<W: AsyncWrite + Unpin>(writer: &mut W, envelope: &Envelope) -> Result<()> {
    let payload = envelope
        .to_bytes()
        .map_err(|e| Error::Protocol(format!("Cannot encode envelope: {}", e)))?;

    let len = payload.len() as u32;
    if len > MAX_FRAME_SIZE {
        return Err(Error::Protocol(format!(
            "Envelope of {} bytes exceeds {}",
            len, MAX_FRAME_SIZE
        )));
    }

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;

    Ok(())
}
