//! Pass-through of chunked transfer-coding
//!
//! Chunks are copied byte for byte; sizes are parsed only to find where the
//! message ends so a kept-alive local connection does not stall the relay.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, TunnelError};

/// Longest accepted chunk-size or trailer line
const MAX_CHUNK_LINE_BYTES: u64 = 64 * 1024;

/// Copy a chunked body from `src` to `dst`, including the last-chunk and trailers
///
/// Returns the number of bytes copied.
pub async fn copy_chunked<R, W>(src: &mut R, dst: &mut W) -> Result<u64>
where
    R: AsyncBufRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut total = 0u64;
    let mut line = Vec::with_capacity(32);

    loop {
        read_line(src, &mut line).await?;
        let size = parse_chunk_size(&line)?;
        dst.write_all(&line).await.map_err(TunnelError::upstream)?;
        total += line.len() as u64;

        if size == 0 {
            break;
        }

        // chunk-data CRLF
        let want = size
            .checked_add(2)
            .ok_or_else(|| TunnelError::upstream("chunk size overflow"))?;
        let copied = tokio::io::copy(&mut (&mut *src).take(want), dst)
            .await
            .map_err(TunnelError::upstream)?;
        if copied < want {
            return Err(TunnelError::upstream("chunked body ended mid-chunk"));
        }
        total += copied;
    }

    // trailer-section CRLF
    loop {
        read_line(src, &mut line).await?;
        dst.write_all(&line).await.map_err(TunnelError::upstream)?;
        total += line.len() as u64;

        if line == b"\r\n" || line == b"\n" {
            return Ok(total);
        }
    }
}

async fn read_line<R>(src: &mut R, line: &mut Vec<u8>) -> Result<()>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    line.clear();
    (&mut *src)
        .take(MAX_CHUNK_LINE_BYTES)
        .read_until(b'\n', line)
        .await
        .map_err(TunnelError::upstream)?;

    if !line.ends_with(b"\n") {
        return Err(TunnelError::upstream(if line.is_empty() {
            "chunked body ended early"
        } else {
            "chunk line too long or truncated"
        }));
    }
    Ok(())
}

/// Parse the hex size of a chunk-size line, ignoring extensions
fn parse_chunk_size(line: &[u8]) -> Result<u64> {
    let line = std::str::from_utf8(line)
        .map_err(|_| TunnelError::upstream("chunk size is not ASCII"))?;
    let size = line
        .split(';')
        .next()
        .unwrap_or_default()
        .trim_matches(|c: char| c.is_ascii_whitespace());

    u64::from_str_radix(size, 16)
        .map_err(|_| TunnelError::upstream(format!("invalid chunk size: {size:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[test]
    fn test_parse_chunk_size() {
        assert_eq!(parse_chunk_size(b"5\r\n").unwrap(), 5);
        assert_eq!(parse_chunk_size(b"1A\r\n").unwrap(), 26);
        assert_eq!(parse_chunk_size(b"ff;name=value\r\n").unwrap(), 255);
        assert_eq!(parse_chunk_size(b"0\r\n").unwrap(), 0);
        assert!(parse_chunk_size(b"zz\r\n").is_err());
        assert!(parse_chunk_size(b"\r\n").is_err());
    }

    #[tokio::test]
    async fn test_copy_chunked_stops_at_last_chunk() {
        let body: &[u8] = b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
        let mut wire = body.to_vec();
        wire.extend_from_slice(b"HTTP/1.1 200 OK\r\n");

        let mut src = BufReader::new(&wire[..]);
        let mut out = Vec::new();
        let copied = copy_chunked(&mut src, &mut out).await.unwrap();

        assert_eq!(out, body);
        assert_eq!(copied, body.len() as u64);

        let mut rest = Vec::new();
        src.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"HTTP/1.1 200 OK\r\n");
    }

    #[tokio::test]
    async fn test_copy_chunked_with_trailers() {
        let body: &[u8] = b"3;ext=1\r\nabc\r\n0\r\nX-Checksum: 42\r\n\r\n";
        let mut src = BufReader::new(body);
        let mut out = Vec::new();
        copy_chunked(&mut src, &mut out).await.unwrap();
        assert_eq!(out, body);
    }

    #[tokio::test]
    async fn test_copy_chunked_truncated() {
        let mut src = BufReader::new(&b"5\r\nhel"[..]);
        let mut out = Vec::new();
        let err = copy_chunked(&mut src, &mut out).await.unwrap_err();
        assert!(matches!(err, TunnelError::UpstreamIo(_)));

        let mut src = BufReader::new(&b"5\r\nhello\r\n"[..]);
        let mut out = Vec::new();
        let err = copy_chunked(&mut src, &mut out).await.unwrap_err();
        assert!(matches!(err, TunnelError::UpstreamIo(msg) if msg.contains("ended early")));
    }
}
