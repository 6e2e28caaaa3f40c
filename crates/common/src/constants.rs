/// Size of the big-endian length prefix in front of a framed request head
pub const HEAD_LENGTH_PREFIX_BYTES: usize = 8;

/// Maximum declared size of a framed request head (10 MiB)
pub const MAX_HEAD_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum request body materialized from a virtual stream (10 MiB)
pub const MAX_BODY_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum size of a response head read from the local target (10 MiB)
pub const MAX_RESPONSE_HEAD_BYTES: usize = 10 * 1024 * 1024;

/// Maximum number of headers parsed from a request or response head
pub const MAX_HEADERS: usize = 100;

/// Body of the response synthesized when the local target cannot be dialed
pub const BAD_GATEWAY_BODY: &str = "local target unavailable";

/// Production broker endpoint
pub const DEFAULT_SERVER_URL: &str = "wss://tunny-server-251376301627.us-central1.run.app/ws";

/// Directory under the user's home holding the client configuration
pub const CONFIG_DIR_NAME: &str = ".tunny";

/// Configuration file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable overriding the configured token
pub const ENV_TOKEN: &str = "TUNNY_TOKEN";

/// Environment variable overriding the configured subdomain
pub const ENV_SUBDOMAIN: &str = "TUNNY_SUBDOMAIN";

/// Environment variable overriding the broker endpoint
pub const ENV_SERVER_URL: &str = "TUNNY_SERVER_URL";

/// Random bytes in a generated tunnel ID (rendered as twice as many hex chars)
pub const TUNNEL_ID_BYTES: usize = 8;

/// Grace period for in-flight relays once the supervisor stops (5 seconds)
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 5;

/// Capacity of the channel handing accepted streams to the supervisor
pub const ACCEPT_BACKLOG: usize = 64;
