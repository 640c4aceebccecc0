//! Common utilities for Vapor.
//!
//! This crate provides foundational types and utilities used across all Vapor crates:
//!
//! - [`BinaryReader`] - Little-endian cursor over byte slices
//! - [`Charset`] - Lossy decoding of stored string bytes
//! - [`crc`] - CRC-32 hashing utilities

mod charset;
mod error;
mod reader;

pub mod crc;

pub use charset::Charset;
pub use error::{Error, Result};
pub use reader::BinaryReader;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
