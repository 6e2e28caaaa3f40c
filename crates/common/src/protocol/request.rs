use bytes::Bytes;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::framing::FramedHead;
use crate::constants::MAX_HEADERS;
use crate::error::{Result, TunnelError};
use crate::utils::headers::{
    HeaderList, content_length, find_header, has_transfer_encoding, headers_from_parsed,
    write_header_block,
};

/// Initial body buffer reservation; grows only as bytes arrive
const INITIAL_BODY_CAPACITY: u64 = 64 * 1024;

/// How the body following a request head is delimited on the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPolicy {
    /// No body bytes follow the head
    Empty,
    /// Exactly this many bytes follow (Content-Length)
    Exact(u64),
    /// Bytes follow until the stream signals end-of-data (Transfer-Encoding
    /// without Content-Length); passed through without dechunking
    UntilEof,
}

/// An HTTP request received from the broker, with its body materialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    /// HTTP method (GET, POST, PUT, DELETE, etc.)
    pub method: String,

    /// Request target as sent by the broker
    /// Example: "/api/v1/users?limit=10"
    pub uri: String,

    /// Minor version of HTTP/1.x
    pub version: u8,

    /// Header fields in wire order
    pub headers: HeaderList,

    /// Request body, empty for requests without one
    pub body: Bytes,
}

impl RelayRequest {
    /// Create an HTTP/1.1 request without headers or body
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            version: 1,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl AsRef<[u8]>) -> Self {
        self.headers.push((name.into(), value.as_ref().to_vec()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Parse a framed head into a request with an empty body
    pub fn parse_head(head: &FramedHead) -> Result<Self> {
        let mut raw_headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut raw_headers);

        match req.parse(head.as_bytes()) {
            Ok(httparse::Status::Complete(_)) => {}
            Ok(httparse::Status::Partial) => {
                return Err(TunnelError::RequestParse(
                    "request head is incomplete".to_string(),
                ));
            }
            Err(e) => return Err(TunnelError::RequestParse(e.to_string())),
        }

        let (Some(method), Some(uri), Some(version)) = (req.method, req.path, req.version) else {
            return Err(TunnelError::RequestParse(
                "missing request line".to_string(),
            ));
        };

        Ok(Self {
            method: method.to_string(),
            uri: uri.to_string(),
            version,
            headers: headers_from_parsed(req.headers),
            body: Bytes::new(),
        })
    }

    /// First value of a header, case-insensitively
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        find_header(&self.headers, name)
    }

    /// Check if the request has a body
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    /// Decide how the body following the head is delimited
    pub fn body_policy(&self) -> Result<BodyPolicy> {
        let declared = content_length(&self.headers)
            .map_err(|e| TunnelError::RequestParse(e.to_string()))?;

        Ok(match declared {
            Some(0) => BodyPolicy::Empty,
            Some(len) => BodyPolicy::Exact(len),
            None if has_transfer_encoding(&self.headers) => BodyPolicy::UntilEof,
            None => BodyPolicy::Empty,
        })
    }

    /// Serialized request line and header block, terminated by a blank line
    pub fn head_bytes(&self) -> Vec<u8> {
        let uri = if self.uri.is_empty() { "/" } else { &self.uri };

        let mut buf = Vec::with_capacity(64 + self.headers.len() * 32);
        buf.extend_from_slice(
            format!("{} {} HTTP/1.{}\r\n", self.method, uri, self.version).as_bytes(),
        );
        write_header_block(&mut buf, &self.headers);
        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Write the full request (head and body) to `dst`
    pub async fn write_to<W>(&self, dst: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        dst.write_all(&self.head_bytes()).await?;
        if self.has_body() {
            dst.write_all(&self.body).await?;
        }
        dst.flush().await
    }
}

/// Materialize a request body from the stream
///
/// Never reads past the body, and never buffers more than `max + 1` bytes.
pub async fn read_body<R>(src: &mut R, policy: BodyPolicy, max: u64) -> Result<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match policy {
        BodyPolicy::Empty => Ok(Bytes::new()),
        BodyPolicy::Exact(len) => {
            if len > max {
                return Err(TunnelError::BodyTooLarge(max));
            }

            let mut buf = Vec::with_capacity(len.min(INITIAL_BODY_CAPACITY) as usize);
            let read = (&mut *src).take(len).read_to_end(&mut buf).await?;
            if (read as u64) < len {
                return Err(TunnelError::Io(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("stream ended after {read} of {len} body bytes"),
                )));
            }
            Ok(Bytes::from(buf))
        }
        BodyPolicy::UntilEof => {
            let mut buf = Vec::with_capacity(INITIAL_BODY_CAPACITY as usize);
            let read = (&mut *src)
                .take(max.saturating_add(1))
                .read_to_end(&mut buf)
                .await?;
            if read as u64 > max {
                return Err(TunnelError::BodyTooLarge(max));
            }
            Ok(Bytes::from(buf))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::framing::{read_head, write_head};

    async fn framed(head: &[u8]) -> FramedHead {
        let mut wire = Vec::new();
        write_head(&mut wire, head).await.unwrap();
        let mut src = &wire[..];
        read_head(&mut src).await.unwrap()
    }

    #[tokio::test]
    async fn test_parse_simple_get() {
        let head = framed(b"GET /api/users?limit=10 HTTP/1.1\r\nHost: localhost:3000\r\n\r\n").await;
        let req = RelayRequest::parse_head(&head).unwrap();

        assert_eq!(req.method, "GET");
        assert_eq!(req.uri, "/api/users?limit=10");
        assert_eq!(req.version, 1);
        assert_eq!(req.header("host"), Some(&b"localhost:3000"[..]));
        assert!(!req.has_body());
        assert_eq!(req.body_policy().unwrap(), BodyPolicy::Empty);
    }

    #[tokio::test]
    async fn test_parse_preserves_header_order_and_duplicates() {
        let head = framed(
            b"POST /submit HTTP/1.0\r\nX-B: 2\r\nx-a: 1\r\nCookie: a=1\r\nCookie: b=2\r\n\r\n",
        )
        .await;
        let req = RelayRequest::parse_head(&head).unwrap();

        assert_eq!(req.version, 0);
        let names: Vec<_> = req.headers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["X-B", "x-a", "Cookie", "Cookie"]);
        assert_eq!(req.headers[3].1, b"b=2");
    }

    #[tokio::test]
    async fn test_parse_rejects_malformed_head() {
        let head = framed(b"NOT A REQUEST\r\n\r\n").await;
        assert!(matches!(
            RelayRequest::parse_head(&head),
            Err(TunnelError::RequestParse(_))
        ));

        let head = framed(b"GET / HTTP/1.1\r\nBad Header\r\n\r\n").await;
        assert!(matches!(
            RelayRequest::parse_head(&head),
            Err(TunnelError::RequestParse(_))
        ));
    }

    #[tokio::test]
    async fn test_parse_rejects_incomplete_head() {
        let head = framed(b"GET / HTTP/1.1\r\nHost: x\r\n").await;
        let err = RelayRequest::parse_head(&head).unwrap_err();
        assert!(matches!(err, TunnelError::RequestParse(msg) if msg.contains("incomplete")));
    }

    #[test]
    fn test_body_policy() {
        let req = RelayRequest::new("POST", "/").with_header("Content-Length", "5");
        assert_eq!(req.body_policy().unwrap(), BodyPolicy::Exact(5));

        let req = RelayRequest::new("POST", "/").with_header("Content-Length", "0");
        assert_eq!(req.body_policy().unwrap(), BodyPolicy::Empty);

        let req = RelayRequest::new("POST", "/").with_header("Transfer-Encoding", "chunked");
        assert_eq!(req.body_policy().unwrap(), BodyPolicy::UntilEof);

        // Content-Length wins over Transfer-Encoding
        let req = RelayRequest::new("POST", "/")
            .with_header("Transfer-Encoding", "chunked")
            .with_header("Content-Length", "3");
        assert_eq!(req.body_policy().unwrap(), BodyPolicy::Exact(3));

        let req = RelayRequest::new("POST", "/").with_header("Content-Length", "five");
        assert!(matches!(
            req.body_policy(),
            Err(TunnelError::RequestParse(_))
        ));
    }

    #[tokio::test]
    async fn test_read_body_exact_reads_no_more() {
        let mut src: &[u8] = b"helloEXTRA";
        let body = read_body(&mut src, BodyPolicy::Exact(5), 1024).await.unwrap();
        assert_eq!(&body[..], b"hello");
        assert_eq!(src, b"EXTRA");
    }

    #[tokio::test]
    async fn test_read_body_exact_truncated() {
        let mut src: &[u8] = b"hel";
        let err = read_body(&mut src, BodyPolicy::Exact(5), 1024).await.unwrap_err();
        assert!(matches!(err, TunnelError::Io(e) if e.kind() == ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn test_read_body_exact_over_limit_reads_nothing() {
        let mut src: &[u8] = b"0123456789";
        let err = read_body(&mut src, BodyPolicy::Exact(10), 4).await.unwrap_err();
        assert!(matches!(err, TunnelError::BodyTooLarge(4)));
        assert_eq!(src.len(), 10);
    }

    #[tokio::test]
    async fn test_read_body_until_eof() {
        let raw = b"5\r\nhello\r\n0\r\n\r\n";
        let mut src: &[u8] = raw;
        let body = read_body(&mut src, BodyPolicy::UntilEof, 1024).await.unwrap();
        // Passed through as received, no dechunking
        assert_eq!(&body[..], raw);
    }

    #[tokio::test]
    async fn test_read_body_until_eof_at_limit() {
        let mut src: &[u8] = b"abcd";
        let body = read_body(&mut src, BodyPolicy::UntilEof, 4).await.unwrap();
        assert_eq!(&body[..], b"abcd");

        let mut src: &[u8] = b"abcde";
        let err = read_body(&mut src, BodyPolicy::UntilEof, 4).await.unwrap_err();
        assert!(matches!(err, TunnelError::BodyTooLarge(4)));
    }

    #[tokio::test]
    async fn test_read_body_empty_policy_leaves_stream() {
        let mut src: &[u8] = b"next";
        let body = read_body(&mut src, BodyPolicy::Empty, 1024).await.unwrap();
        assert!(body.is_empty());
        assert_eq!(src, b"next");
    }

    #[tokio::test]
    async fn test_head_bytes_parse_back() {
        let req = RelayRequest::new("PUT", "/items/1")
            .with_header("Host", "example.com")
            .with_header("Content-Length", "2");

        let head = framed(&req.head_bytes()).await;
        let parsed = RelayRequest::parse_head(&head).unwrap();
        assert_eq!(parsed, req);
    }

    #[test]
    fn test_head_bytes_empty_uri() {
        let req = RelayRequest::new("GET", "");
        assert_eq!(req.head_bytes(), b"GET / HTTP/1.1\r\n\r\n");
    }

    #[tokio::test]
    async fn test_write_to_includes_body() {
        let req = RelayRequest::new("POST", "/echo")
            .with_header("Content-Length", "5")
            .with_body(&b"hello"[..]);

        let mut out = Vec::new();
        req.write_to(&mut out).await.unwrap();
        assert_eq!(
            out,
            b"POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello".to_vec()
        );
    }
}
