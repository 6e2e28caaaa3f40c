//! Length-prefixed framing of HTTP request heads on a virtual stream
//!
//! The broker writes an 8-byte big-endian length followed by the request line
//! and header block. The body follows unframed, so the head has to be read
//! without consuming any byte past its declared end.

use bytes::Bytes;
use std::io::{Cursor, ErrorKind};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::{HEAD_LENGTH_PREFIX_BYTES, MAX_HEAD_SIZE_BYTES};
use crate::error::{Result, TunnelError};

/// Initial buffer reservation; the head buffer grows only as bytes arrive
const INITIAL_HEAD_CAPACITY: u64 = 16 * 1024;

/// A request head read off a virtual stream, bounded by its declared length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedHead {
    bytes: Bytes,
}

impl FramedHead {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Replayable reader over the head bytes
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.bytes.as_ref())
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Write `head` behind its length prefix
///
/// Returns the number of head bytes written, excluding the prefix.
pub async fn write_head<W>(dst: &mut W, head: &[u8]) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let len = head.len() as u64;

    // One write so the prefix and head travel in the same frame
    let mut buf = Vec::with_capacity(HEAD_LENGTH_PREFIX_BYTES + head.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(head);

    dst.write_all(&buf).await?;
    dst.flush().await?;

    Ok(len)
}

/// Read a length-prefixed head
///
/// A declared length above [`MAX_HEAD_SIZE_BYTES`] fails with
/// [`TunnelError::FrameTooLarge`] before anything past the prefix is read.
pub async fn read_head<R>(src: &mut R) -> Result<FramedHead>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut prefix = [0u8; HEAD_LENGTH_PREFIX_BYTES];
    src.read_exact(&mut prefix).await.map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => TunnelError::Truncated {
            expected: HEAD_LENGTH_PREFIX_BYTES as u64,
        },
        _ => TunnelError::Io(e),
    })?;

    let declared = u64::from_be_bytes(prefix);
    if declared > MAX_HEAD_SIZE_BYTES {
        return Err(TunnelError::FrameTooLarge {
            declared,
            max: MAX_HEAD_SIZE_BYTES,
        });
    }

    let mut buf = Vec::with_capacity(declared.min(INITIAL_HEAD_CAPACITY) as usize);
    let read = (&mut *src).take(declared).read_to_end(&mut buf).await?;
    if (read as u64) < declared {
        return Err(TunnelError::Truncated { expected: declared });
    }

    Ok(FramedHead {
        bytes: Bytes::from(buf),
    })
}
