use anyhow::{Context, Result};
use tokio_util::compat::TokioAsyncReadCompatExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::ConnectArgs;
use crate::config::{ClientConfig, FileConfig};
use crate::session::{TransportSession, TunnelSession};
use crate::supervisor::{ShutdownReason, Supervisor, spawn_signal_listener};
use crate::transport::{YamuxSession, dial};

/// `tunny connect`: expose `target` until interrupted or the session ends
pub async fn run(args: ConnectArgs) -> Result<()> {
    let file = FileConfig::load_from(&FileConfig::default_path()?)
        .context("failed to load configuration")?
        .apply_env(|key| std::env::var(key).ok());
    let config = ClientConfig::resolve(&args, file)?;

    let socket = dial(&config.connect_url()).await?;
    let transport = YamuxSession::client(socket.compat());
    let mut session = TunnelSession::new(
        config.tunnel_id(),
        config.credentials.subdomain.clone(),
        transport,
    );

    print_banner(&config);
    info!(
        tunnel_id = session.tunnel_id(),
        subdomain = session.subdomain(),
        local = %config.target,
        "Tunnel established"
    );

    let shutdown = CancellationToken::new();
    let signals = spawn_signal_listener(shutdown.clone());

    let mut supervisor = Supervisor::new(config.target.clone());
    let outcome = supervisor.run(&mut session, &shutdown).await;
    signals.abort();

    if matches!(outcome, Ok(ShutdownReason::UserRequested)) {
        println!("\n\n🛑 Shutting down tunnel...");
    }

    let cancelled = supervisor.drain(config.drain_timeout).await;
    if cancelled > 0 {
        warn!("{} request(s) cancelled at shutdown", cancelled);
    }

    if let Err(e) = session.close().await {
        warn!("Error closing tunnel session: {}", e);
    }
    info!(
        uptime = %tunny_common::format_uptime(session.uptime()),
        requests = supervisor.accepted(),
        "Tunnel closed"
    );

    match outcome.context("tunnel error")? {
        ShutdownReason::UserRequested => {}
        ShutdownReason::SessionClosed => info!("Tunnel server closed the session"),
    }
    Ok(())
}

/// Startup banner; the scheme of the public URL follows the server's (see
/// [`ClientConfig::public_url`])
fn print_banner(config: &ClientConfig) {
    let public_url = config.public_url();

    println!();
    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║              ✨ Tunny - Tunnel Established ✨             ║");
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();
    println!("  🌐 Public URL:    \x1b[1;36m{}\x1b[0m", public_url);
    println!("  🔑 Tunnel ID:     \x1b[1;33m{}\x1b[0m", config.tunnel_id());
    println!("  📡 Forwarding:    {} → {}", public_url, config.target);
    println!();
    println!("─────────────────────────────────────────────────────────────");
    println!("  Try it:  \x1b[1;32mcurl {}/hello\x1b[0m", public_url);
    println!("─────────────────────────────────────────────────────────────");
    println!();
    println!("  Press Ctrl+C to stop the tunnel");
    println!();
}
