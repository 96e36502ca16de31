//! Error types for the flowdash analytics engine.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the flowdash analytics engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error, raised before any tick is processed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single tick record failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Data error (invalid or missing data).
    #[error("Data error: {0}")]
    Data(String),

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
}

/// Why a raw tick record was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field was absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A numeric field was NaN or infinite.
    #[error("field `{0}` is not a finite number")]
    NonFinite(&'static str),

    /// Price at or below zero.
    #[error("price must be positive, got {0}")]
    NonPositivePrice(f64),

    /// Negative traded volume or quote size.
    #[error("field `{field}` must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    /// Bid above ask.
    #[error("crossed quote: bid {bid} > ask {ask}")]
    CrossedQuote { bid: f64, ask: f64 },

    /// Timestamp before epoch or past `MAX_TIMESTAMP_MS`.
    #[error("timestamp {ts_ms} is outside [0, {max_ts_ms}]")]
    TimestampOutOfRange { ts_ms: i64, max_ts_ms: i64 },

    /// Streaming tick older than the last accepted one.
    #[error("timestamp {ts_ms} is before last accepted timestamp {last_ts_ms}")]
    OutOfOrder { ts_ms: i64, last_ts_ms: i64 },
}
