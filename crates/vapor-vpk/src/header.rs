//! On-disk structures of the VPK directory file.
//!
//! All integers are little-endian. The header is followed by the nested
//! type / directory / name string table, with one [`EntryRecord`] (plus
//! optional preload bytes) after every name.

use tracing::debug;
use vapor_common::BinaryReader;
use zerocopy::little_endian::{I32, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{Error, Result};

/// VPK signature as u32.
pub const SIGNATURE: u32 = 0x55AA_1234;

/// Value every entry record must end with.
pub const ENTRY_TERMINATOR: u16 = 0xFFFF;

/// Maximum length of a type, directory or name string in the table.
pub const STRING_LIMIT: usize = 1024;

/// Supported directory format versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Version {
    /// Original format: 12-byte header, offsets relative to the end of the table.
    V1 = 1,
    /// Extended format with a 28-byte header.
    V2 = 2,
}

impl Version {
    /// Size of the fixed header in bytes.
    #[inline]
    pub const fn header_size(self) -> usize {
        match self {
            Version::V1 => 12,
            Version::V2 => 28,
        }
    }
}

impl TryFrom<u32> for Version {
    type Error = u32;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(other),
        }
    }
}

impl From<Version> for u32 {
    fn from(version: Version) -> Self {
        version as u32
    }
}

/// Version 2 fields between the version number and the dictionary size.
///
/// Their meaning is not known well enough to act on; they are read and
/// kept for inspection only.
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct HeaderV2Extension {
    /// Offset of the footer
    pub footer_offset: U32,
    /// Always zero in known archives
    pub unused: U32,
    /// Size of the footer
    pub footer_size: U32,
    /// Always 48 in known archives
    pub constant: U32,
}

/// Fixed part of a directory entry, following its name string.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct EntryRecord {
    /// CRC-32 of the full entry contents
    pub crc32: U32,
    /// Number of preload bytes following the record
    pub preload_size: U16,
    /// Chunk file holding the external data
    pub chunk_index: U16,
    /// Offset of the external data
    pub offset: I32,
    /// Length of the external data
    pub size: I32,
    /// Must be [`ENTRY_TERMINATOR`]
    pub terminator: U16,
}

impl EntryRecord {
    /// Size of the record on disk.
    pub const SIZE: usize = 18;
}

/// Parsed directory file header.
#[derive(Debug, Clone, Copy)]
pub struct VpkHeader {
    /// Format version.
    pub version: Version,
    /// Declared byte count of the table following the header. Zero means
    /// the count is unknown and must not be checked.
    pub dictionary_size: u32,
    /// Extra version 2 fields.
    pub v2: Option<HeaderV2Extension>,
}

impl VpkHeader {
    /// Read the header from the start of a directory file.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let signature = reader.read_u32()?;
        if signature != SIGNATURE {
            return Err(Error::Format(format!(
                "unknown signature {signature:#010x} (expected {SIGNATURE:#010x})"
            )));
        }

        let raw_version = reader.read_u32()?;
        let version = Version::try_from(raw_version)
            .map_err(|v| Error::Format(format!("unsupported version {v}")))?;

        let v2 = match version {
            Version::V1 => None,
            Version::V2 => Some(reader.read_struct::<HeaderV2Extension>()?),
        };

        let dictionary_size = reader.read_u32()?;

        debug!(
            version = raw_version,
            dictionary_size,
            "read VPK header"
        );

        Ok(Self {
            version,
            dictionary_size,
            v2,
        })
    }

    /// Size of the fixed header in bytes.
    #[inline]
    pub const fn header_size(&self) -> usize {
        self.version.header_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(version: u32, extra: &[u32], dict: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&SIGNATURE.to_le_bytes());
        out.extend_from_slice(&version.to_le_bytes());
        for value in extra {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.extend_from_slice(&dict.to_le_bytes());
        out
    }

    #[test]
    fn test_record_size() {
        assert_eq!(std::mem::size_of::<EntryRecord>(), EntryRecord::SIZE);
        assert_eq!(std::mem::size_of::<HeaderV2Extension>(), 16);
    }

    #[test]
    fn test_read_v1() {
        let data = header_bytes(1, &[], 77);
        let mut reader = BinaryReader::new(&data);
        let header = VpkHeader::read(&mut reader).unwrap();

        assert_eq!(header.version, Version::V1);
        assert_eq!(header.dictionary_size, 77);
        assert_eq!(header.header_size(), 12);
        assert_eq!(reader.position(), header.header_size());
        assert!(header.v2.is_none());
    }

    #[test]
    fn test_read_v2() {
        let data = header_bytes(2, &[1000, 0, 296, 48], 5);
        let mut reader = BinaryReader::new(&data);
        let header = VpkHeader::read(&mut reader).unwrap();

        assert_eq!(header.version, Version::V2);
        assert_eq!(header.dictionary_size, 5);
        assert_eq!(reader.position(), 28);
        let v2 = header.v2.unwrap();
        assert_eq!(v2.footer_offset.get(), 1000);
        assert_eq!(v2.constant.get(), 48);
    }

    #[test]
    fn test_bad_signature() {
        let mut data = header_bytes(1, &[], 0);
        data[0] = 0x00;
        let err = VpkHeader::read(&mut BinaryReader::new(&data)).unwrap_err();
        assert!(matches!(err, Error::Format(msg) if msg.contains("signature")));
    }

    #[test]
    fn test_unsupported_version() {
        for version in [0, 3, 0xFFFF_FFFF] {
            let data = header_bytes(version, &[], 0);
            let err = VpkHeader::read(&mut BinaryReader::new(&data)).unwrap_err();
            assert!(matches!(err, Error::Format(msg) if msg.contains("unsupported version")));
        }
    }

    #[test]
    fn test_truncated_header() {
        let data = header_bytes(1, &[], 0);
        let err = VpkHeader::read(&mut BinaryReader::new(&data[..10])).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }
}
