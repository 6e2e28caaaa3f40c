//! WebSocket connection to the broker exposed as a byte stream
//!
//! The multiplexer runs on top of binary WebSocket messages: every write
//! becomes one binary message and reads concatenate incoming binary payloads.

use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::{
    io,
    pin::Pin,
    task::{Context, Poll, ready},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::debug;
use tunny_common::{Result, TunnelError};
use url::Url;

pub type WebSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dial the broker and wrap the socket for the multiplexer
pub async fn dial(url: &Url) -> Result<WsIo<WebSocket>> {
    debug!(
        "Connecting to {}://{}{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        url.path()
    );

    let (ws_stream, response) = connect_async(url.as_str())
        .await
        .map_err(|e| TunnelError::Session(format!("failed to connect to server: {}", e)))?;

    debug!("WebSocket handshake completed ({})", response.status());
    Ok(WsIo::new(ws_stream))
}

/// `AsyncRead + AsyncWrite` over binary WebSocket messages
pub struct WsIo<S> {
    inner: S,
    read_buf: Bytes,
    read_eof: bool,
}

impl<S> WsIo<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            read_buf: Bytes::new(),
            read_eof: false,
        }
    }
}

fn ws_to_io(e: WsError) -> io::Error {
    match e {
        WsError::Io(e) => e,
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            io::Error::new(io::ErrorKind::BrokenPipe, e)
        }
        other => io::Error::other(other),
    }
}

impl<S> AsyncRead for WsIo<S>
where
    S: Stream<Item = std::result::Result<WsMessage, WsError>> + Unpin,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            // Drain buffered bytes first.
            if !self.read_buf.is_empty() {
                let to_copy = std::cmp::min(self.read_buf.len(), buf.remaining());
                buf.put_slice(&self.read_buf.split_to(to_copy));
                return Poll::Ready(Ok(()));
            }

            if self.read_eof {
                return Poll::Ready(Ok(()));
            }

            match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(WsMessage::Binary(data))) => self.read_buf = data,
                Some(Ok(WsMessage::Close(_))) | None => self.read_eof = true,
                // Control frames are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(WsError::ConnectionClosed)) => self.read_eof = true,
                Some(Err(e)) => return Poll::Ready(Err(ws_to_io(e))),
            }
        }
    }
}

impl<S> AsyncWrite for WsIo<S>
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        if data.is_empty() {
            return Poll::Ready(Ok(0));
        }

        ready!(self.inner.poll_ready_unpin(cx)).map_err(ws_to_io)?;
        self.inner
            .start_send_unpin(WsMessage::Binary(Bytes::copy_from_slice(data)))
            .map_err(ws_to_io)?;
        Poll::Ready(Ok(data.len()))
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.inner.poll_flush_unpin(cx).map_err(ws_to_io)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match ready!(self.inner.poll_close_unpin(cx)) {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => {
                Poll::Ready(Ok(()))
            }
            Err(e) => Poll::Ready(Err(ws_to_io(e))),
        }
    }
}
