//! Server-Sent Events parsing error definitions

use thiserror::Error;

/// Parse error types
#[derive(Debug, Error)]
pub enum ParseError {
    /// A line inside a frame is not valid UTF-8
    #[error("Invalid UTF-8 in event stream at byte {offset}")]
    InvalidUtf8 { offset: usize },
    /// Frame carries no `type` discriminator, neither in `event:` nor in the payload
    #[error("Event frame has no event type")]
    MissingEventType,
    /// Payload deserialization failed
    #[error("Payload deserialization failed: {0}")]
    PayloadDeserialize(#[from] serde_json::Error),
    /// Decoder was stopped by an earlier error
    #[error("Decoder stopped after error: {last_error}")]
    Stopped { last_error: String },
    /// Buffer overflow
    #[error("Buffer overflow: {size} bytes (max {max})")]
    BufferOverflow { size: usize, max: usize },
}

/// Parse result type
pub type ParseResult<T> = Result<T, ParseError>;
