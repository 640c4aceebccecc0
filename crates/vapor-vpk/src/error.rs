//! Error types for the VPK crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when working with VPK archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The directory file is not a well-formed VPK.
    #[error("invalid VPK: {0}")]
    Format(String),

    /// Input ended before a complete value could be read.
    #[error("unexpected end of input: needed {needed} bytes but only {available} available")]
    Truncated { needed: usize, available: usize },

    /// Entry contents do not match the checksum stored in the directory.
    #[error("CRC32 checksum mismatch: got {actual:#010x}, expected {expected:#010x}")]
    Integrity { expected: u32, actual: u32 },

    /// Backing archive or chunk file is missing.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Invalid argument passed to a reader.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<vapor_common::Error> for Error {
    fn from(err: vapor_common::Error) -> Self {
        match err {
            vapor_common::Error::Truncated { needed, available } => {
                Error::Truncated { needed, available }
            }
            vapor_common::Error::InvalidArgument(msg) => Error::InvalidArgument(msg),
            vapor_common::Error::Io(e) => Error::Io(e),
        }
    }
}

/// Result type for VPK operations.
pub type Result<T> = std::result::Result<T, Error>;
