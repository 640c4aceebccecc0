//! Resolution of where an entry's external data lives.
//!
//! A VPK either keeps its data in the directory file itself or spreads it
//! over numbered chunk files next to a `<base>_dir.vpk` index. The choice is
//! made once per archive; every entry then maps to a concrete file and
//! offset.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::header::{Version, VpkHeader};
use crate::{Error, Result};

/// Suffix of the index file stem in multi-chunk archives.
pub const DIR_SUFFIX: &str = "_dir";

/// Where entry data is stored for a given archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Data follows the table inside the directory file.
    Inline {
        /// The directory file itself.
        archive: PathBuf,
        /// Added to every stored offset. `None` when the adjustment is
        /// unknown for the archive's version.
        rebase: Option<i64>,
    },
    /// Data lives in `<base>_NNN.vpk` files.
    Chunked {
        /// Directory containing the index and chunk files.
        dir: PathBuf,
        /// File stem with the `_dir` suffix removed.
        base_name: String,
    },
}

impl DataSource {
    /// Decide the data source for the directory file at `path`.
    pub fn for_archive(path: &Path, header: &VpkHeader) -> Self {
        let (base_name, multi_chunk) = split_base_name(path);

        if multi_chunk {
            return DataSource::Chunked {
                dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
                base_name,
            };
        }

        let rebase = match header.version {
            // Stored offsets count from the end of the table
            Version::V1 => Some(header.header_size() as i64 + header.dictionary_size as i64),
            Version::V2 => {
                warn!(
                    archive = %path.display(),
                    "version 2 single-file archive: entry offsets are used as stored"
                );
                None
            }
        };

        DataSource::Inline {
            archive: path.to_path_buf(),
            rebase,
        }
    }

    /// Whether entry data is split across chunk files.
    #[inline]
    pub fn is_multi_chunk(&self) -> bool {
        matches!(self, DataSource::Chunked { .. })
    }

    /// Map a stored chunk index and offset to a file and file offset.
    pub fn resolve(&self, chunk_index: u16, offset: i32) -> Result<(PathBuf, i32)> {
        match self {
            DataSource::Chunked { dir, base_name } => {
                Ok((dir.join(chunk_file_name(base_name, chunk_index)), offset))
            }
            DataSource::Inline { archive, rebase } => {
                let offset = match rebase {
                    Some(rebase) => i32::try_from(offset as i64 + rebase).map_err(|_| {
                        Error::Format(format!("entry offset {offset} out of range"))
                    })?,
                    None => offset,
                };
                Ok((archive.clone(), offset))
            }
        }
    }
}

/// File name of chunk `index` for an archive named `base_name`.
pub fn chunk_file_name(base_name: &str, index: u16) -> String {
    format!("{base_name}_{index:03}.vpk")
}

/// Split a directory file path into its base name and multi-chunk flag.
///
/// `pak01_dir.vpk` yields `("pak01", true)`, `pak01.vpk` yields
/// `("pak01", false)`.
pub fn split_base_name(path: &Path) -> (String, bool) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match stem.strip_suffix(DIR_SUFFIX) {
        Some(base) => (base.to_string(), true),
        None => (stem, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HeaderV2Extension;

    fn header(version: Version, dictionary_size: u32) -> VpkHeader {
        VpkHeader {
            version,
            dictionary_size,
            v2: (version == Version::V2).then(HeaderV2Extension::default),
        }
    }

    #[test]
    fn test_split_base_name() {
        assert_eq!(
            split_base_name(Path::new("/games/hl2/pak01_dir.vpk")),
            ("pak01".to_string(), true)
        );
        assert_eq!(
            split_base_name(Path::new("pak01.vpk")),
            ("pak01".to_string(), false)
        );
        assert_eq!(
            split_base_name(Path::new("dir_index.vpk")),
            ("dir_index".to_string(), false)
        );
    }

    #[test]
    fn test_chunk_resolution() {
        let source = DataSource::for_archive(
            Path::new("/games/hl2/pak01_dir.vpk"),
            &header(Version::V1, 100),
        );
        assert!(source.is_multi_chunk());

        let (file, offset) = source.resolve(5, 1234).unwrap();
        assert_eq!(file, PathBuf::from("/games/hl2/pak01_005.vpk"));
        assert_eq!(offset, 1234);

        let (file, _) = source.resolve(123, 0).unwrap();
        assert_eq!(file, PathBuf::from("/games/hl2/pak01_123.vpk"));
    }

    #[test]
    fn test_relative_chunk_path() {
        let source = DataSource::for_archive(Path::new("pak01_dir.vpk"), &header(Version::V1, 0));
        let (file, _) = source.resolve(7, 0).unwrap();
        assert_eq!(file, PathBuf::from("pak01_007.vpk"));
    }

    #[test]
    fn test_v1_inline_rebase() {
        let source = DataSource::for_archive(Path::new("/tmp/single.vpk"), &header(Version::V1, 50));
        assert!(!source.is_multi_chunk());

        let (file, offset) = source.resolve(0x7FFF, 10).unwrap();
        assert_eq!(file, PathBuf::from("/tmp/single.vpk"));
        assert_eq!(offset, 10 + 12 + 50);
    }

    #[test]
    fn test_v1_rebase_overflow() {
        let source = DataSource::for_archive(Path::new("single.vpk"), &header(Version::V1, 50));
        assert!(matches!(source.resolve(0, i32::MAX), Err(Error::Format(_))));
    }

    #[test]
    fn test_v2_inline_unadjusted() {
        let source = DataSource::for_archive(Path::new("single.vpk"), &header(Version::V2, 50));
        let (_, offset) = source.resolve(0, 10).unwrap();
        assert_eq!(offset, 10);
    }
}
