//! Per-stream request relay
//!
//! Each virtual stream carries exactly one HTTP exchange: a framed request
//! head, an optional body, then the local target's response written back
//! unframed before the stream is closed.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use tunny_common::{
    RelayRequest, RelayResponse, Result, TunnelError, constants::MAX_BODY_SIZE_BYTES,
    generate_stream_id, read_body, read_head, read_response_head,
};

/// How a relayed exchange ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The local target answered and its response was written back
    Completed { status: u16 },
    /// The local target could not be dialed; a 502 was written back
    BadGateway,
}

/// Run one relay on `stream` and log how it ended
///
/// Errors stay local to the stream; nothing is retried.
pub async fn handle_stream<S>(mut stream: S, target: String, cancel: CancellationToken)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let stream_id = generate_stream_id();
    let span = info_span!("stream", id = %stream_id);

    async move {
        debug!("Stream accepted");

        match relay_stream(&mut stream, &target, &cancel).await {
            Ok(RelayOutcome::Completed { status }) => {
                debug!(status, "Response written back");
            }
            Ok(RelayOutcome::BadGateway) => {
                debug!("Answered 502 Bad Gateway");
            }
            Err(TunnelError::Cancelled) => {
                debug!("Relay cancelled");
            }
            Err(e) if e.is_frame_error() => {
                warn!("Rejected frame: {}", e);
            }
            Err(e) => {
                warn!("Stream aborted: {}", e);
            }
        }
    }
    .instrument(span)
    .await
}

/// Bridge one request from `stream` to the local `target` and back
///
/// Frame, parse and body errors abort the stream without a response. A
/// failed dial answers with `502 Bad Gateway`. The stream is shut down after
/// the response is written.
pub async fn relay_stream<S>(
    stream: &mut S,
    target: &str,
    cancel: &CancellationToken,
) -> Result<RelayOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    if cancel.is_cancelled() {
        return Err(TunnelError::Cancelled);
    }

    let head = read_head(stream).await?;
    let mut request = RelayRequest::parse_head(&head)?;
    info!(method = %request.method, uri = %request.uri, "Request received");

    let policy = request.body_policy()?;
    request.body = tokio::select! {
        _ = cancel.cancelled() => return Err(TunnelError::Cancelled),
        body = read_body(stream, policy, MAX_BODY_SIZE_BYTES) => body?,
    };
    debug!(body_bytes = request.body.len(), "Request body read");

    let upstream = tokio::select! {
        _ = cancel.cancelled() => return Err(TunnelError::Cancelled),
        dialed = dial_target(target) => dialed,
    };
    let upstream = match upstream {
        Ok(upstream) => upstream,
        Err(e @ TunnelError::UpstreamDial(_)) => {
            warn!(target_addr = %target, error = %e, "Answering 502");
            RelayResponse::bad_gateway().write_to(stream).await?;
            stream.shutdown().await?;
            return Ok(RelayOutcome::BadGateway);
        }
        Err(e) => return Err(e),
    };
    debug!("Connected to local target");

    let status = forward(request, upstream, stream).await?;
    stream.shutdown().await?;
    Ok(RelayOutcome::Completed { status })
}

async fn dial_target(target: &str) -> Result<TcpStream> {
    TcpStream::connect(target)
        .await
        .map_err(|e| TunnelError::UpstreamDial(format!("{}: {}", target, e)))
}

/// Send `request` to the local target and stream its response to `stream`
///
/// Interim 1xx responses are passed through before the final one.
async fn forward<S>(request: RelayRequest, upstream: TcpStream, stream: &mut S) -> Result<u16>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    let mut upstream = BufReader::new(upstream);
    request
        .write_to(upstream.get_mut())
        .await
        .map_err(TunnelError::upstream)?;
    debug!("Request forwarded to local target");

    loop {
        let raw = read_response_head(&mut upstream).await?;
        let response = RelayResponse::parse_head(raw, &request.method)?;
        debug!(status = response.status, "Response received from local target");

        let body_bytes = response.relay_to(&mut upstream, stream).await?;

        if response.is_interim() {
            continue;
        }

        info!(status = response.status, body_bytes, "Response relayed");
        return Ok(response.status);
    }
}
