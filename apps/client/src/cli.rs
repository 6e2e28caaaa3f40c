use clap::{Args, Parser, Subcommand};
use tunny_common::constants::{DEFAULT_DRAIN_TIMEOUT_SECS, DEFAULT_SERVER_URL, ENV_SERVER_URL};

/// CLI arguments for the tunnel client
#[derive(Parser, Debug)]
#[command(name = "tunny", display_name = "Tunny")]
#[command(about = "Tunny - Expose your local server to the internet", long_about = None)]
#[command(version = concat!("version ", env!("CARGO_PKG_VERSION")))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a tunnel to your local server
    Connect(ConnectArgs),

    /// Initialize Tunny configuration at ~/.tunny/config.json
    Init(InitArgs),

    /// List active tunnels on the server
    List(ListArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Local target in the format host:port (e.g., localhost:3000)
    pub target: String,

    /// Authentication token (overrides config/env)
    #[arg(short, long)]
    pub token: Option<String>,

    /// Subdomain for the tunnel (overrides config/env)
    #[arg(long)]
    pub subdomain: Option<String>,

    /// Custom tunnel ID (auto-generated if not provided)
    #[arg(short = 'i', long = "id")]
    pub id: Option<String>,

    /// Enable development mode with verbose logging
    #[arg(short, long)]
    pub dev: bool,

    /// Tunnel server endpoint
    #[arg(long, env = ENV_SERVER_URL, default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Seconds to wait for in-flight requests when shutting down
    #[arg(long, default_value_t = DEFAULT_DRAIN_TIMEOUT_SECS)]
    pub drain_timeout: u64,
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Authentication token
    #[arg(long, default_value = "")]
    pub token: String,

    /// Preferred subdomain
    #[arg(long, default_value = "")]
    pub subdomain: String,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Tunnel server endpoint
    #[arg(long, env = ENV_SERVER_URL, default_value = DEFAULT_SERVER_URL)]
    pub server: String,
}
