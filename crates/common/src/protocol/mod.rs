mod chunked;
pub mod framing;
mod request;
mod response;

pub use chunked::copy_chunked;
pub use framing::{FramedHead, read_head, write_head};
pub use request::{BodyPolicy, RelayRequest, read_body};
pub use response::{RelayResponse, ResponseBody, read_response_head};
