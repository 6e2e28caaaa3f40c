//! Common utilities and types for the tunnel client
//!
//! This crate provides the stream framing protocol, HTTP request/response relay
//! types, listing models and validation helpers used by the `tunny` client.

pub mod constants;
pub mod error;
pub mod models;
pub mod protocol;
pub mod utils;
pub mod validation;

// Re-export commonly used types for convenience
pub use error::{Result, TunnelError};
pub use models::{TunnelInfo, TunnelListing};
pub use protocol::{
    BodyPolicy, FramedHead, RelayRequest, RelayResponse, ResponseBody, read_body, read_head,
    read_response_head, write_head,
};
pub use utils::{format_uptime, generate_stream_id, generate_tunnel_id, uptime_since};
