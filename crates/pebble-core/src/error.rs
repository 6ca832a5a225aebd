//! Error types for `Pebble` core library.

use thiserror::Error;

/// Result type alias using `Pebble` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `Pebble` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
