//! Vapor - Valve VPK archive reading library.
//!
//! This crate provides a unified interface to the Vapor library crates.
//!
//! # Crates
//!
//! - [`vapor_common`] - Common utilities (binary reading, charsets, CRC-32)
//! - [`vapor_vpk`] - VPK directory parsing and entry access
//!
//! # Example
//!
//! ```no_run
//! use vapor::prelude::*;
//!
//! let archive = VpkArchive::open("pak01_dir.vpk")?;
//!
//! let mut failed = 0;
//! for entry in archive.iter() {
//!     if let Err(e) = entry.check_data() {
//!         eprintln!("{} failed: {}", entry.path(), e);
//!         failed += 1;
//!     }
//! }
//! println!("{} of {} entries failed", failed, archive.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use vapor_common as common;
pub use vapor_vpk as vpk;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use vapor_common::{crc, BinaryReader, Charset};
    pub use vapor_vpk::{
        AccessMode, EntryData, Error as VpkError, ParseOptions, Version, VpkArchive, VpkEntry,
    };
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
