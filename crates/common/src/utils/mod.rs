pub mod headers;
mod id;
mod time;

pub use headers::{HeaderList, content_length, find_header, is_chunked};
pub use id::{generate_stream_id, generate_tunnel_id};
pub use time::{format_uptime, uptime_since};
