//! Broker transport: a WebSocket byte stream carrying a yamux session

pub mod mux;
pub mod websocket;

pub use self::mux::YamuxSession;
pub use self::websocket::{WsIo, dial};
