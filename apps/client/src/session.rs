//! Transport session abstraction
//!
//! A [`TransportSession`] is an established multiplexed connection to the
//! broker. Each call to `accept` yields one independent virtual stream.

use chrono::{DateTime, Utc};
use std::{future::Future, time::Duration};
use tokio::io::{AsyncRead, AsyncWrite};
use tunny_common::{Result, uptime_since};

/// Multiplexed connection yielding inbound virtual streams
pub trait TransportSession: Send {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wait for the next inbound stream
    ///
    /// `Ok(None)` means the broker ended the session cleanly. Errors are
    /// terminal for the session.
    fn accept(&mut self) -> impl Future<Output = Result<Option<Self::Stream>>> + Send;

    /// Close the session gracefully
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Identity of an established tunnel plus its transport
pub struct TunnelSession<T> {
    tunnel_id: String,
    subdomain: String,
    created_at: DateTime<Utc>,
    transport: T,
}

impl<T: TransportSession> TunnelSession<T> {
    pub fn new(tunnel_id: impl Into<String>, subdomain: impl Into<String>, transport: T) -> Self {
        Self {
            tunnel_id: tunnel_id.into(),
            subdomain: subdomain.into(),
            created_at: Utc::now(),
            transport,
        }
    }

    pub fn tunnel_id(&self) -> &str {
        &self.tunnel_id
    }

    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn uptime(&self) -> Duration {
        uptime_since(self.created_at, Utc::now())
    }
}

impl<T: TransportSession> TransportSession for TunnelSession<T> {
    type Stream = T::Stream;

    async fn accept(&mut self) -> Result<Option<Self::Stream>> {
        self.transport.accept().await
    }

    async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport for exercising the supervisor without a broker

    use super::*;
    use tokio::io::DuplexStream;
    use tokio::sync::mpsc;
    use tunny_common::TunnelError;

    /// Transport fed by a channel; dropping the sender ends the session
    pub struct ChannelTransport {
        incoming: mpsc::Receiver<Result<DuplexStream>>,
        pub closed: bool,
    }

    impl ChannelTransport {
        pub fn new(capacity: usize) -> (mpsc::Sender<Result<DuplexStream>>, Self) {
            let (tx, incoming) = mpsc::channel(capacity);
            (
                tx,
                Self {
                    incoming,
                    closed: false,
                },
            )
        }
    }

    impl TransportSession for ChannelTransport {
        type Stream = DuplexStream;

        async fn accept(&mut self) -> Result<Option<DuplexStream>> {
            match self.incoming.recv().await {
                Some(Ok(stream)) => Ok(Some(stream)),
                Some(Err(e)) => Err(e),
                None => Ok(None),
            }
        }

        async fn close(&mut self) -> Result<()> {
            if self.closed {
                return Err(TunnelError::Session("already closed".to_string()));
            }
            self.closed = true;
            self.incoming.close();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ChannelTransport;
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_tunnel_session_forwards_accept() {
        let (tx, transport) = ChannelTransport::new(4);
        let mut session = TunnelSession::new("abc123", "myapp", transport);

        assert_eq!(session.tunnel_id(), "abc123");
        assert_eq!(session.subdomain(), "myapp");
        assert!(session.created_at() <= Utc::now());

        let (mut near, far) = tokio::io::duplex(64);
        tx.send(Ok(far)).await.unwrap();

        let mut accepted = session.accept().await.unwrap().unwrap();
        near.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        accepted.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        drop(tx);
        assert!(session.accept().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tunnel_session_forwards_close() {
        let (_tx, transport) = ChannelTransport::new(1);
        let mut session = TunnelSession::new("abc123", "", transport);

        session.close().await.unwrap();
        assert!(session.close().await.is_err());
    }
}
