//! Error types for the flowbar pipeline.

use crate::types::TimestampNs;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the flowbar pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input record (missing field, negative size, bad timestamp).
    #[error("Data error: {0}")]
    Data(String),

    /// Trade timestamps went backwards.
    #[error("Trades not ordered at index {index}: {ts_ns} < previous {prev_ts_ns}")]
    Ordering {
        index: usize,
        prev_ts_ns: TimestampNs,
        ts_ns: TimestampNs,
    },

    /// Series handed to table assembly disagree in length.
    #[error("Series length mismatch: {series} has {actual} entries, expected {expected}")]
    LengthMismatch {
        series: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Trade feed failure.
    #[error("Feed error: {0}")]
    Feed(String),

    /// Bar sink failure.
    #[error("Sink error: {0}")]
    Sink(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a feed error.
    pub fn feed(msg: impl Into<String>) -> Self {
        Error::Feed(msg.into())
    }

    /// Create a sink error.
    pub fn sink(msg: impl Into<String>) -> Self {
        Error::Sink(msg.into())
    }
}
