//! Error types for vapor-common.

use thiserror::Error;

/// Common error type for Vapor operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of input: needed {needed} bytes but only {available} available")]
    Truncated { needed: usize, available: usize },

    /// A caller passed an argument that can never succeed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
