//! Tunny client
//!
//! Opens one multiplexed connection to the tunnel broker and relays every
//! inbound virtual stream as a single HTTP exchange against a local target.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod relay;
pub mod session;
pub mod supervisor;
pub mod transport;

pub use config::{ClientConfig, FileConfig};
pub use relay::{RelayOutcome, handle_stream, relay_stream};
pub use session::{TransportSession, TunnelSession};
pub use supervisor::{ShutdownReason, Supervisor, SupervisorState, spawn_signal_listener};
