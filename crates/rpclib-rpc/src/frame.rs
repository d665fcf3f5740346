//! Wire framing for the duplex stream.
//!
//! ```text
//! handshake (client → server, once):  "rpc0" | version: u32 LE
//! frame (either direction):           length: u32 LE | request id: u64 LE | body
//! ```
//!
//! `length` counts only the body. A body is an encoded object: its 20-byte
//! type id followed by its fields.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use rpclib_core::prelude::*;

/// Magic bytes opening every connection.
pub const MAGIC: &[u8; 4] = b"rpc0";

/// Largest body accepted in either direction.
pub const MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Smallest write chunk the writer will use, whatever the configured MTU.
pub const MIN_MTU: usize = 64;

/// Bytes before the body: length plus request id.
pub const HEADER_SIZE: usize = 12;

/// One request or reply on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: u64,
    pub body: Bytes,
}

/// Handshake bytes for `version`.
pub fn handshake(version: u32) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..4].copy_from_slice(MAGIC);
    out[4..].copy_from_slice(&version.to_le_bytes());
    out
}

pub async fn write_handshake<W>(writer: &mut W, version: u32) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&handshake(version)).await?;
    writer.flush().await?;
    Ok(())
}

/// Read and validate the peer's handshake, returning its protocol version.
pub async fn read_handshake<R>(reader: &mut R) -> Result<u32>
where
    R: AsyncRead + Unpin,
{
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).await?;
    if &magic != MAGIC {
        return Err(Error::protocol(format!("bad handshake magic {magic:02x?}")));
    }
    Ok(reader.read_u32_le().await?)
}

/// Serialize a frame into a single contiguous buffer.
pub fn encode_frame(frame: &Frame) -> Result<Bytes> {
    if frame.body.len() > MAX_BODY_SIZE {
        return Err(Error::protocol(format!(
            "frame body of {} bytes exceeds limit of {}",
            frame.body.len(),
            MAX_BODY_SIZE
        )));
    }
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + frame.body.len());
    buf.put_u32_le(frame.body.len() as u32);
    buf.put_u64_le(frame.id);
    buf.put_slice(&frame.body);
    Ok(buf.freeze())
}

/// Write `frame` in chunks of at most `mtu` bytes, then flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame, mtu: usize) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let raw = encode_frame(frame)?;
    write_encoded(writer, &raw, mtu).await
}

/// Write an already encoded frame in chunks of at most `mtu` bytes, then
/// flush.
pub async fn write_encoded<W>(writer: &mut W, raw: &[u8], mtu: usize) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    for chunk in raw.chunks(mtu.max(MIN_MTU)) {
        writer.write_all(chunk).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Read the next frame. Returns `None` when the stream ends cleanly on a
/// frame boundary; an end of stream inside the length prefix is an error.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    let mut filled = 0;
    while filled < prefix.len() {
        match reader.read(&mut prefix[filled..]).await? {
            0 if filled == 0 => return Ok(None),
            0 => {
                return Err(Error::transport(format!(
                    "stream ended after {filled} of 4 length bytes"
                )))
            }
            n => filled += n,
        }
    }
    let len = u32::from_le_bytes(prefix) as usize;
    if len > MAX_BODY_SIZE {
        return Err(Error::protocol(format!(
            "incoming frame of {len} bytes exceeds limit of {MAX_BODY_SIZE}"
        )));
    }
    let id = reader.read_u64_le().await?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(Frame {
        id,
        body: Bytes::from(body),
    }))
}
