//! Error types for stationwire.

use thiserror::Error;

/// Main error type for all stationwire operations.
///
/// The call engine never surfaces these to its callers; they are folded into
/// an [`Outcome`](crate::Outcome) and then a [`ResultEnvelope`](crate::ResultEnvelope).
#[derive(Debug, Error)]
pub enum StationError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error (plan frames).
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error (plan frames).
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Malformed multi-frame message (count mismatch, missing end, oversized frame).
    #[error("Frame invalid: {0}")]
    FrameInvalid(String),

    /// A pre/post call handler failed.
    #[error("Handler error: {0}")]
    Handler(String),

    /// Invalid client configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// The process-wide handler registry was installed twice.
    #[error("Handler registry already installed")]
    RegistryInstalled,

    /// Endpoint string the connector cannot dial.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Peer closed the connection.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using StationError.
pub type Result<T> = std::result::Result<T, StationError>;
