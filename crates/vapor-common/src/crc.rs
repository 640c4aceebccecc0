//! CRC-32 checksum utilities.
//!
//! VPK directory entries carry the standard CRC-32 (IEEE 802.3, the same
//! polynomial zlib and ZIP use) of the full entry contents.

use crc::{Crc, Digest, CRC_32_ISO_HDLC};

static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Compute the CRC-32 of a byte slice in one pass.
#[inline]
pub fn hash_bytes(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Incremental CRC-32 accumulator.
///
/// Feed it data in any number of pieces; the result only depends on the
/// concatenated bytes.
pub struct Crc32Hasher {
    digest: Digest<'static, u32>,
}

impl Crc32Hasher {
    /// Create a fresh accumulator.
    pub fn new() -> Self {
        Self {
            digest: CRC32.digest(),
        }
    }

    /// Append bytes to the running checksum.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    /// Consume the accumulator and return the checksum.
    #[inline]
    pub fn finalize(self) -> u32 {
        self.digest.finalize()
    }
}

impl Default for Crc32Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Crc32Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crc32Hasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_hash() {
        assert_eq!(hash_bytes(&[]), 0);
    }

    #[test]
    fn test_check_value() {
        // Standard CRC-32 check value
        assert_eq!(hash_bytes(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i * 7) as u8).collect();

        let mut hasher = Crc32Hasher::new();
        for chunk in data.chunks(4096) {
            hasher.update(chunk);
        }

        assert_eq!(hasher.finalize(), hash_bytes(&data));
    }
}
