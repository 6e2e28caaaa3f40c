//! Accept loop and shutdown coordination
//!
//! The supervisor accepts virtual streams from a [`TransportSession`] and
//! spawns one relay task per stream. Relay tasks share nothing; a failing
//! stream never affects the session or its siblings.

use std::time::Duration;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tunny_common::{Result, TunnelError};

use crate::relay::handle_stream;
use crate::session::TransportSession;

/// Why [`Supervisor::run`] returned successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The shutdown token fired (Ctrl-C / SIGTERM)
    UserRequested,
    /// The broker ended the session cleanly
    SessionClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Running,
    Stopped,
}

/// Drives the accept loop and owns the in-flight relay tasks
pub struct Supervisor {
    target: String,
    relays: JoinSet<()>,
    relay_cancel: CancellationToken,
    state: SupervisorState,
    accepted: u64,
}

impl Supervisor {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            relays: JoinSet::new(),
            relay_cancel: CancellationToken::new(),
            state: SupervisorState::Running,
            accepted: 0,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Streams accepted so far
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Relay tasks not yet reaped
    pub fn in_flight(&self) -> usize {
        self.relays.len()
    }

    /// Accept streams until shutdown or session end
    ///
    /// Shutdown is checked before every accept, so once `shutdown` fires no
    /// further stream is accepted. In-flight relays keep running; call
    /// [`Supervisor::drain`] afterwards to wait for them.
    pub async fn run<T>(
        &mut self,
        session: &mut T,
        shutdown: &CancellationToken,
    ) -> Result<ShutdownReason>
    where
        T: TransportSession,
    {
        if self.state == SupervisorState::Stopped {
            return Err(TunnelError::Session("supervisor already stopped".to_string()));
        }

        let result = loop {
            self.reap_finished();

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, no longer accepting streams");
                    break Ok(ShutdownReason::UserRequested);
                }
                accepted = session.accept() => match accepted {
                    Ok(Some(stream)) => self.spawn_relay(stream),
                    Ok(None) => {
                        info!("Tunnel session closed by server");
                        break Ok(ShutdownReason::SessionClosed);
                    }
                    Err(e) => {
                        error!("Tunnel session failed: {}", e);
                        break Err(match e {
                            TunnelError::Session(_) => e,
                            other => TunnelError::Session(other.to_string()),
                        });
                    }
                },
            }
        };

        self.state = SupervisorState::Stopped;
        debug!(
            accepted = self.accepted,
            in_flight = self.relays.len(),
            "Accept loop stopped"
        );
        result
    }

    /// Wait up to `grace` for in-flight relays, then cancel the rest
    ///
    /// Returns the number of relays that had to be cancelled.
    pub async fn drain(&mut self, grace: Duration) -> usize {
        if self.relays.is_empty() {
            return 0;
        }

        info!(
            "Waiting up to {:?} for {} in-flight request(s)",
            grace,
            self.relays.len()
        );

        let relays = &mut self.relays;
        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = relays.join_next().await {
                log_join(joined);
            }
        })
        .await;

        if drained.is_ok() {
            return 0;
        }

        let remaining = self.relays.len();
        warn!("Cancelling {} in-flight request(s)", remaining);
        self.relay_cancel.cancel();
        self.relays.abort_all();
        while self.relays.join_next().await.is_some() {}
        remaining
    }

    fn spawn_relay<S>(&mut self, stream: S)
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        self.accepted += 1;
        self.relays.spawn(handle_stream(
            stream,
            self.target.clone(),
            self.relay_cancel.child_token(),
        ));
    }

    fn reap_finished(&mut self) {
        while let Some(joined) = self.relays.try_join_next() {
            log_join(joined);
        }
    }
}

fn log_join(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined
        && e.is_panic()
    {
        error!("Relay task panicked: {}", e);
    }
}

/// Cancel `shutdown` on SIGINT or SIGTERM (Ctrl-C elsewhere)
pub fn spawn_signal_listener(shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.cancel();
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to install signal handlers: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT (Ctrl+C)"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
