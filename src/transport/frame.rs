//! Length-prefixed framing.
//!
//! ```text
//! frame := length (u32, little-endian) || payload (length bytes)
//! ```
//!
//! There is no resynchronization: if a frame cannot be read as declared, the
//! stream position is lost and the connection is finished.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::core::{ChannelError, FramingError, FRAME_HEADER_SIZE};

/// Encode the 4-byte length prefix for a payload.
pub fn encode_header(payload_len: usize) -> io::Result<[u8; FRAME_HEADER_SIZE]> {
    let len = u32::try_from(payload_len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("payload of {payload_len} bytes does not fit a u32 length prefix"),
        )
    })?;
    Ok(len.to_le_bytes())
}

/// Decode a length prefix.
pub fn decode_header(header: [u8; FRAME_HEADER_SIZE]) -> usize {
    u32::from_le_bytes(header) as usize
}

/// Encode a complete frame into one buffer.
pub fn encode_frame(payload: &[u8]) -> io::Result<Vec<u8>> {
    let header = encode_header(payload.len())?;
    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header);
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Whether an I/O error means the peer is gone rather than a local fault.
pub fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

/// Read until `buf` is full or the stream ends; returns bytes read.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read exactly one frame.
///
/// End of stream on a frame boundary is a clean
/// [`ChannelError::PeerDisconnected`]; anywhere else it is a
/// [`FramingError::Truncated`].
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Vec<u8>, ChannelError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];
    let got = match read_full(reader, &mut header).await {
        Ok(n) => n,
        Err(e) if is_disconnect(&e) => return Err(ChannelError::PeerDisconnected),
        Err(e) => return Err(e.into()),
    };
    match got {
        0 => return Err(ChannelError::PeerDisconnected),
        n if n < FRAME_HEADER_SIZE => {
            return Err(FramingError::Truncated {
                expected: FRAME_HEADER_SIZE,
                received: n,
            }
            .into());
        }
        _ => {}
    }

    let len = decode_header(header);
    if len > max_len {
        return Err(FramingError::TooLarge { len, max: max_len }.into());
    }

    let mut payload = vec![0u8; len];
    let received = read_full(reader, &mut payload).await?;
    if received != len {
        return Err(FramingError::Truncated {
            expected: len,
            received,
        }
        .into());
    }
    Ok(payload)
}

/// Write one frame and flush it.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await
}
