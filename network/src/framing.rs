//! Length-prefixed message framing.
//!
//! Every message begins with a 5-byte header: byte 0 is the wire version tag
//! (always `1`), bytes 1..5 encode the body length as an unsigned 32-bit
//! little-endian integer. The body follows as opaque serialized bytes.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::NetworkError;

/// Size of the fixed message header.
pub const MESSAGE_HEADER_SIZE: usize = 5;

/// Maximum accepted body size. A header announcing more is a protocol error
/// and the session is dropped.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Wire format version written into header byte 0. The byte is ignored on
/// read; only length framing is derived from the header.
pub const WIRE_VERSION: u8 = 1;

/// Read one framed body. Returns `None` on a clean end of stream.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, NetworkError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; MESSAGE_HEADER_SIZE];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let body_len = u32::from_le_bytes([header[1], header[2], header[3], header[4]]) as usize;
    if body_len > MAX_MESSAGE_SIZE {
        return Err(NetworkError::MessageTooLarge(body_len));
    }

    let mut body = vec![0u8; body_len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Write one framed body: version byte, little-endian length, payload.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), NetworkError>
where
    W: AsyncWrite + Unpin,
{
    if body.len() > MAX_MESSAGE_SIZE {
        return Err(NetworkError::MessageTooLarge(body.len()));
    }

    let mut header = [0u8; MESSAGE_HEADER_SIZE];
    header[0] = WIRE_VERSION;
    header[1..].copy_from_slice(&(body.len() as u32).to_le_bytes());

    writer.write_all(&header).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}
