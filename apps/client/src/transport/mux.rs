//! yamux adapter implementing [`TransportSession`]
//!
//! A yamux connection only makes progress while it is polled, so a driver
//! task owns it, polls for inbound streams continuously and hands them over
//! a bounded channel. Polling inbound also drives I/O for every open stream,
//! so the driver never waits on that channel: streams arriving while the
//! backlog is full are dropped, which resets them.

use futures_util::io::{AsyncRead as FuturesRead, AsyncWrite as FuturesWrite};
use std::future::poll_fn;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::compat::{Compat, FuturesAsyncReadCompatExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tunny_common::{Result, TunnelError, constants::ACCEPT_BACKLOG};
use yamux::{Config, Connection, Mode};

use crate::session::TransportSession;

/// Virtual stream handed out by [`YamuxSession`]
pub type VirtualStream = Compat<yamux::Stream>;

/// Multiplexed session over any futures-io byte stream
pub struct YamuxSession {
    incoming: mpsc::Receiver<Result<yamux::Stream>>,
    shutdown: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

impl YamuxSession {
    /// Client side of a session; the broker opens the streams
    pub fn client<T>(socket: T) -> Self
    where
        T: FuturesRead + FuturesWrite + Unpin + Send + 'static,
    {
        Self::new(socket, Mode::Client)
    }

    pub fn new<T>(socket: T, mode: Mode) -> Self
    where
        T: FuturesRead + FuturesWrite + Unpin + Send + 'static,
    {
        let connection = Connection::new(socket, Config::default(), mode);
        let (tx, incoming) = mpsc::channel(ACCEPT_BACKLOG);
        let shutdown = CancellationToken::new();
        let driver = tokio::spawn(drive(connection, tx, shutdown.clone()));

        Self {
            incoming,
            shutdown,
            driver: Some(driver),
        }
    }
}

impl TransportSession for YamuxSession {
    type Stream = VirtualStream;

    async fn accept(&mut self) -> Result<Option<VirtualStream>> {
        match self.incoming.recv().await {
            Some(Ok(stream)) => Ok(Some(stream.compat())),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.shutdown.cancel();
        if let Some(driver) = self.driver.take() {
            driver
                .await
                .map_err(|e| TunnelError::Session(format!("session driver failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for YamuxSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn drive<T>(
    mut connection: Connection<T>,
    tx: mpsc::Sender<Result<yamux::Stream>>,
    shutdown: CancellationToken,
) where
    T: FuturesRead + FuturesWrite + Unpin + Send + 'static,
{
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => None,
            next = poll_fn(|cx| connection.poll_next_inbound(cx)) => Some(next),
        };

        match next {
            None => {
                debug!("Closing tunnel session");
                if let Err(e) = poll_fn(|cx| connection.poll_close(cx)).await {
                    debug!("Session close error: {}", e);
                }
                break;
            }
            Some(Some(Ok(stream))) => {
                let id = stream.id();
                debug!("Inbound stream {}", id);
                match tx.try_send(Ok(stream)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!("Accept backlog full, resetting stream {}", id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("No longer accepting, resetting stream {}", id);
                    }
                }
            }
            Some(Some(Err(e))) => {
                warn!("Tunnel session error: {}", e);
                let report = TunnelError::Session(e.to_string());
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = tx.send(Err(report)) => {}
                }
                break;
            }
            Some(None) => {
                debug!("Tunnel session closed by remote");
                break;
            }
        }
    }

    debug!("Session driver exiting");
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::future::Future;
    use tokio::io::DuplexStream;
    use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

    pub(crate) type BrokerConnection = Connection<Compat<DuplexStream>>;

    /// Client session plus the broker's end of the same connection
    pub(crate) fn session_pair() -> (YamuxSession, BrokerConnection) {
        let (a, b) = tokio::io::duplex(256 * 1024);
        let client = YamuxSession::client(a.compat());
        let broker = Connection::new(b.compat(), Config::default(), Mode::Server);
        (client, broker)
    }

    /// Open `n` broker streams; frames go out on first write
    pub(crate) async fn open_streams(
        conn: &mut BrokerConnection,
        n: usize,
    ) -> Vec<VirtualStream> {
        let mut streams = Vec::with_capacity(n);
        for _ in 0..n {
            let stream = poll_fn(|cx| conn.poll_new_outbound(cx)).await.unwrap();
            streams.push(stream.compat());
        }
        streams
    }

    /// Poll `conn` for I/O until `fut` completes
    pub(crate) async fn drive_until<T, F>(conn: &mut Connection<T>, fut: F) -> F::Output
    where
        T: FuturesRead + FuturesWrite + Unpin + Send + 'static,
        F: Future,
    {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                out = &mut fut => return out,
                next = poll_fn(|cx| conn.poll_next_inbound(cx)) => {
                    if next.is_none() {
                        return fut.await;
                    }
                }
            }
        }
    }
}
