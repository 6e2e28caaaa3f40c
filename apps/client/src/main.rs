use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tunny_client::cli::{Cli, Command};
use tunny_client::commands;
use tunny_client::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let dev = matches!(&cli.command, Command::Connect(args) if args.dev);
    init_logging(dev);
    debug!("Tunny v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Connect(args) => commands::connect::run(args).await,
        Command::Init(args) => commands::init::run(args),
        Command::List(args) => commands::list::run(args).await,
    }
}
