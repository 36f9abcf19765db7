//! Error types for the mpg123 decoder element.

use crate::engine::EngineError;
use crate::negotiation::NegotiationError;
use thiserror::Error;

/// Result type alias using the crate's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for decoder operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Output format negotiation failed.
    #[error("negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),

    /// The decoding engine refused an operation.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// The engine failed while decoding compressed data.
    #[error("decoding error: {0}")]
    Decode(#[source] EngineError),

    /// Data arrived before an output format was negotiated.
    #[error("no output format negotiated")]
    NotNegotiated,

    /// The output sink refused a buffer or caps.
    #[error("output sink error: {0}")]
    Sink(String),
}
