use thiserror::Error;

use crate::validation::ValidationError;

/// Error types for the tunnel client
///
/// Everything except [`TunnelError::Session`] is scoped to a single virtual
/// stream and never outlives the relay that produced it.
#[derive(Error, Debug)]
pub enum TunnelError {
    #[error("Frame too large: declared {declared} bytes (max: {max})")]
    FrameTooLarge { declared: u64, max: u64 },

    #[error("Frame truncated: expected {expected} bytes")]
    Truncated { expected: u64 },

    #[error("Malformed request head: {0}")]
    RequestParse(String),

    #[error("Request body exceeds {0} bytes")]
    BodyTooLarge(u64),

    #[error("Local target unavailable: {0}")]
    UpstreamDial(String),

    #[error("Upstream I/O error: {0}")]
    UpstreamIo(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Relay cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl TunnelError {
    /// Wrap an I/O failure on the local connection
    pub fn upstream(e: impl std::fmt::Display) -> Self {
        TunnelError::UpstreamIo(e.to_string())
    }

    /// Whether the error belongs to a bad or oversized frame
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            TunnelError::FrameTooLarge { .. } | TunnelError::Truncated { .. }
        )
    }
}

/// Type alias for Results using TunnelError
pub type Result<T> = std::result::Result<T, TunnelError>;
