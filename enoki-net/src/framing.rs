//! Length-prefixed envelope framing over an async byte stream.
//!
//! Each handshake envelope travels as one frame: a `u32` big-endian length
//! prefix followed by the envelope encoding. The total frame (prefix,
//! fields, and field overhead) must fit in [`MAX_FRAME_SIZE`] bytes, and
//! an oversize announced length is rejected before its body is read.
//! Partial reads are absorbed: [`read_envelope`] awaits until a full frame
//! is available or the transport errors.

use bytes::{BufMut, BytesMut};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use enoki_handshake::HandshakeEnvelope;

/// Enough space for an encoded envelope with an act payload, a peer
/// identity, and a signature. Frames longer than this are rejected.
pub const MAX_FRAME_SIZE: usize = 1024;

/// Length of the `u32` big-endian frame length prefix.
const FRAME_PREFIX_LEN: usize = 4;

/// Why a frame could not be written or read.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The total frame length exceeds [`MAX_FRAME_SIZE`].
    #[error("frame of {0} bytes exceeds the {MAX_FRAME_SIZE}-byte maximum")]
    Oversize(usize),

    /// The frame body is not a valid envelope encoding.
    #[error("malformed envelope frame")]
    Malformed,

    /// The underlying transport failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Serialize one envelope, write it as a single frame, and flush.
pub async fn write_envelope<W>(writer: &mut W, envelope: &HandshakeEnvelope) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let body = envelope.encode().map_err(|_| FrameError::Malformed)?;
    let total = FRAME_PREFIX_LEN + body.len();
    if total > MAX_FRAME_SIZE {
        return Err(FrameError::Oversize(total));
    }

    let mut frame = BytesMut::with_capacity(total);
    frame.put_u32(body.len() as u32);
    frame.put_slice(&body);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read exactly one frame and decode its envelope.
///
/// An announced length that would push the frame past [`MAX_FRAME_SIZE`]
/// fails with [`FrameError::Oversize`] without reading the body.
pub async fn read_envelope<R>(reader: &mut R) -> Result<HandshakeEnvelope, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; FRAME_PREFIX_LEN];
    reader.read_exact(&mut prefix).await?;

    let body_len = u32::from_be_bytes(prefix) as usize;
    let total = FRAME_PREFIX_LEN + body_len;
    if total > MAX_FRAME_SIZE {
        return Err(FrameError::Oversize(total));
    }

    let mut body = vec![0u8; body_len];
    reader.read_exact(&mut body).await?;

    HandshakeEnvelope::decode(&body).map_err(|_| FrameError::Malformed)
}
