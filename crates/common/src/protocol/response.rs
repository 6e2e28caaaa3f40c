use bytes::Bytes;
use http::{Method, StatusCode};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::chunked::copy_chunked;
use crate::constants::{BAD_GATEWAY_BODY, MAX_HEADERS, MAX_RESPONSE_HEAD_BYTES};
use crate::error::{Result, TunnelError};
use crate::utils::headers::{
    HeaderList, content_length, has_transfer_encoding, headers_from_parsed, is_chunked,
    write_header_block,
};

/// How a response body is delimited, or the body itself when synthesized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// No body (HEAD, 1xx, 204, 304, or Content-Length: 0)
    Empty,
    /// Body already in memory
    Full(Bytes),
    /// Exactly this many bytes follow the head
    Length(u64),
    /// Chunked transfer-coding, passed through without decoding
    Chunked,
    /// Body runs until the connection closes
    UntilClose,
}

/// An HTTP response on its way back onto a virtual stream
#[derive(Debug, Clone)]
pub struct RelayResponse {
    /// Minor version of HTTP/1.x
    pub version: u8,

    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,

    /// Reason phrase from the status line
    pub reason: String,

    /// Response headers in wire order
    pub headers: HeaderList,

    /// Body framing
    pub body: ResponseBody,

    /// Status line and header block exactly as they go on the wire
    head: Bytes,
}

impl RelayResponse {
    /// Build a complete HTTP/1.1 response with an in-memory body
    pub fn synthesize(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        let reason = status.canonical_reason().unwrap_or("").to_string();
        let headers: HeaderList = vec![
            ("Content-Type".to_string(), content_type.as_bytes().to_vec()),
            (
                "Content-Length".to_string(),
                body.len().to_string().into_bytes(),
            ),
        ];

        let mut head = format!("HTTP/1.1 {} {}\r\n", status.as_u16(), reason).into_bytes();
        write_header_block(&mut head, &headers);
        head.extend_from_slice(b"\r\n");

        Self {
            version: 1,
            status: status.as_u16(),
            reason,
            headers,
            body: if body.is_empty() {
                ResponseBody::Empty
            } else {
                ResponseBody::Full(body)
            },
            head: Bytes::from(head),
        }
    }

    /// Response written back when the local target cannot be dialed
    pub fn bad_gateway() -> Self {
        Self::synthesize(StatusCode::BAD_GATEWAY, "text/plain", BAD_GATEWAY_BODY)
    }

    /// Parse a raw response head read from the local target
    ///
    /// `request_method` decides whether a body can follow at all.
    pub fn parse_head(raw: impl Into<Bytes>, request_method: &str) -> Result<Self> {
        let raw: Bytes = raw.into();

        let mut raw_headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut resp = httparse::Response::new(&mut raw_headers);
        match resp.parse(&raw) {
            Ok(httparse::Status::Complete(_)) => {}
            Ok(httparse::Status::Partial) => {
                return Err(TunnelError::upstream("response head is incomplete"));
            }
            Err(e) => return Err(TunnelError::upstream(format!("malformed response: {e}"))),
        }

        let (Some(version), Some(status)) = (resp.version, resp.code) else {
            return Err(TunnelError::upstream("missing status line"));
        };
        let reason = resp.reason.unwrap_or("").to_string();
        let headers = headers_from_parsed(resp.headers);

        let body = body_framing(status, &headers, request_method)?;

        Ok(Self {
            version,
            status,
            reason,
            headers,
            body,
            head: raw,
        })
    }

    /// Status line and header block as they go on the wire
    pub fn head_bytes(&self) -> &[u8] {
        &self.head
    }

    /// Informational response that precedes the final one
    pub fn is_interim(&self) -> bool {
        (100..200).contains(&self.status) && self.status != 101
    }

    /// Check if the response is successful (2xx status code)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response is a client error (4xx status code)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the response is a server error (5xx status code)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Write the head, then the body pulled from `src` per its framing
    ///
    /// Returns the number of body bytes written. Failures on either side are
    /// reported as [`TunnelError::UpstreamIo`].
    pub async fn relay_to<R, W>(&self, src: &mut R, dst: &mut W) -> Result<u64>
    where
        R: AsyncBufRead + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
    {
        dst.write_all(&self.head)
            .await
            .map_err(TunnelError::upstream)?;

        let written = match &self.body {
            ResponseBody::Empty => 0,
            ResponseBody::Full(body) => {
                dst.write_all(body).await.map_err(TunnelError::upstream)?;
                body.len() as u64
            }
            ResponseBody::Length(len) => {
                let copied = tokio::io::copy(&mut (&mut *src).take(*len), dst)
                    .await
                    .map_err(TunnelError::upstream)?;
                if copied < *len {
                    return Err(TunnelError::upstream(format!(
                        "response body ended after {copied} of {len} bytes"
                    )));
                }
                copied
            }
            ResponseBody::Chunked => copy_chunked(src, dst).await?,
            ResponseBody::UntilClose => tokio::io::copy(src, dst)
                .await
                .map_err(TunnelError::upstream)?,
        };

        dst.flush().await.map_err(TunnelError::upstream)?;
        Ok(written)
    }

    /// Write a response whose body is already in memory
    pub async fn write_to<W>(&self, dst: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut empty: &[u8] = &[];
        self.relay_to(&mut empty, dst).await
    }
}

/// Body framing of a response, following RFC 9112 section 6.3
fn body_framing(
    status: u16,
    headers: &[(String, Vec<u8>)],
    request_method: &str,
) -> Result<ResponseBody> {
    if request_method.eq_ignore_ascii_case(Method::HEAD.as_str())
        || (100..200).contains(&status)
        || status == StatusCode::NO_CONTENT.as_u16()
        || status == StatusCode::NOT_MODIFIED.as_u16()
    {
        return Ok(ResponseBody::Empty);
    }

    if has_transfer_encoding(headers) {
        return Ok(if is_chunked(headers) {
            ResponseBody::Chunked
        } else {
            ResponseBody::UntilClose
        });
    }

    match content_length(headers).map_err(TunnelError::upstream)? {
        Some(0) => Ok(ResponseBody::Empty),
        Some(len) => Ok(ResponseBody::Length(len)),
        None => Ok(ResponseBody::UntilClose),
    }
}

/// Read a status line and header block, up to and including the blank line
///
/// The read is bounded by [`MAX_RESPONSE_HEAD_BYTES`] and never consumes body
/// bytes from `src`.
pub async fn read_response_head<R>(src: &mut R) -> Result<Bytes>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut head = Vec::with_capacity(1024);

    loop {
        let remaining = MAX_RESPONSE_HEAD_BYTES.saturating_sub(head.len());
        if remaining == 0 {
            return Err(TunnelError::upstream(format!(
                "response head exceeds {MAX_RESPONSE_HEAD_BYTES} bytes"
            )));
        }

        let line_start = head.len();
        let read = (&mut *src)
            .take(remaining as u64)
            .read_until(b'\n', &mut head)
            .await
            .map_err(TunnelError::upstream)?;

        if read == 0 {
            return Err(TunnelError::upstream(if head.is_empty() {
                "local target closed the connection without a response".to_string()
            } else {
                "response head ended early".to_string()
            }));
        }

        let line = &head[line_start..];
        if !line.ends_with(b"\n") {
            // Either the size cap or EOF cut the line short; the next pass reports it
            continue;
        }

        let blank = line == b"\r\n" || line == b"\n";
        if blank && line_start == 0 {
            // Tolerate stray empty lines before the status line
            head.clear();
            continue;
        }
        if blank {
            return Ok(Bytes::from(head));
        }
    }
}
