//! VPK archive reader for Valve Source engine game files.
//!
//! A VPK stores many files grouped by extension, directory and name. Small
//! files (or the head of large ones) can be stored inline in the directory
//! as preload data; the rest lives either after the directory table in the
//! same file, or in numbered chunk files next to a `<base>_dir.vpk` index.
//!
//! Supported:
//! - Version 1 and version 2 directory headers
//! - Single-file and multi-chunk archives
//! - Lookup by full path, by directory and by file type
//! - Memory-mapped entry data with CRC-32 verification
//!
//! Version 2 single-file archives are read on a best-effort basis: their
//! entry offsets are used exactly as stored.
//!
//! # Example
//!
//! ```no_run
//! use vapor_vpk::VpkArchive;
//!
//! let archive = VpkArchive::open("pak01_dir.vpk")?;
//!
//! for entry in archive.iter() {
//!     println!("{}: {} bytes", entry.path(), entry.data_size());
//! }
//!
//! if let Some(entry) = archive.entry("materials/brick/wall01.vmt") {
//!     entry.check_data()?;
//!     let data = entry.data()?;
//!     println!("{}", String::from_utf8_lossy(&data));
//! }
//! # Ok::<(), vapor_vpk::Error>(())
//! ```

mod archive;
mod entry;
mod error;
pub mod header;
pub mod location;

#[cfg(test)]
mod testutil;

pub use archive::{normalize_directory, ParseOptions, VpkArchive};
pub use entry::{AccessMode, EntryData, VpkEntry};
pub use error::{Error, Result};
pub use header::Version;
