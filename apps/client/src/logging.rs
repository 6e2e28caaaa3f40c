use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber
///
/// `dev` raises the default level to DEBUG; `RUST_LOG` takes precedence when set.
pub fn init_logging(dev: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(dev))
        .with_target(false)
        .try_init();
}

fn env_filter(dev: bool) -> EnvFilter {
    let default_level = if dev { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
