//! VPK archive entry.

use std::fs::{File, OpenOptions};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::{Mmap, MmapMut, MmapOptions};
use parking_lot::RwLock;
use vapor_common::crc::Crc32Hasher;

use crate::{Error, Result};

/// Bytes fed to the checksum accumulator per step.
const CRC_CHUNK_SIZE: usize = 4096;

/// How an entry may touch its backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Map existing files only; a missing file is an error.
    #[default]
    ReadOnly,
    /// Open files for writing, creating or extending them to cover the entry.
    ReadWrite,
}

/// The contents of an entry: preload bytes followed by the external region.
///
/// Cloning is cheap; all clones share the same buffer or mapping.
#[derive(Clone)]
pub struct EntryData {
    backing: Backing,
}

#[derive(Clone)]
enum Backing {
    Empty,
    Shared(Arc<[u8]>),
    Mapped(Arc<Mmap>),
    MappedMut(Arc<MmapMut>),
}

impl EntryData {
    fn empty() -> Self {
        Self {
            backing: Backing::Empty,
        }
    }

    /// Whether the bytes come straight from a memory-mapped file.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self.backing, Backing::Mapped(_) | Backing::MappedMut(_))
    }

    /// Whether the underlying mapping was opened for writing.
    #[inline]
    pub fn is_writable(&self) -> bool {
        matches!(self.backing, Backing::MappedMut(_))
    }
}

impl Deref for EntryData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match &self.backing {
            Backing::Empty => &[],
            Backing::Shared(bytes) => &bytes[..],
            Backing::Mapped(mmap) => &mmap[..],
            Backing::MappedMut(mmap) => &mmap[..],
        }
    }
}

impl AsRef<[u8]> for EntryData {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl std::fmt::Debug for EntryData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryData")
            .field("len", &self.len())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

/// An entry (file) within a VPK archive.
///
/// Holds the directory metadata; [`VpkEntry::data`] produces the contents
/// and caches them for later calls.
pub struct VpkEntry {
    /// File extension without the dot.
    ty: String,
    /// Normalized directory, empty or ending in `/`.
    directory: String,
    /// Base file name.
    name: String,
    /// Declared CRC-32 of the contents.
    crc32: u32,
    /// Chunk file index (multi-chunk archives only).
    chunk_index: u16,
    /// Offset of the external data in `source_file`.
    offset: i32,
    /// Length of the external data.
    size: i32,
    /// Inline bytes stored in the directory.
    preload: Arc<[u8]>,
    /// File holding the external data.
    source_file: PathBuf,
    mode: AccessMode,
    cache: RwLock<Option<EntryData>>,
}

impl VpkEntry {
    /// Create a new VPK entry.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        ty: String,
        directory: String,
        name: String,
        crc32: u32,
        chunk_index: u16,
        offset: i32,
        size: i32,
        preload: Vec<u8>,
        source_file: PathBuf,
        mode: AccessMode,
    ) -> Self {
        Self {
            ty,
            directory,
            name,
            crc32,
            chunk_index,
            offset,
            size,
            preload: preload.into(),
            source_file,
            mode,
            cache: RwLock::new(None),
        }
    }

    /// Get the file extension (without the dot).
    #[inline]
    pub fn ty(&self) -> &str {
        &self.ty
    }

    /// Get the directory, empty for the root or ending in `/`.
    #[inline]
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// Get the file name without extension.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the file name with extension.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.ty)
    }

    /// Get the full path within the archive.
    pub fn path(&self) -> String {
        format!("{}{}.{}", self.directory, self.name, self.ty)
    }

    /// Get the declared CRC32 checksum.
    #[inline]
    pub fn crc32(&self) -> u32 {
        self.crc32
    }

    /// Get the chunk file index.
    #[inline]
    pub fn chunk_index(&self) -> u16 {
        self.chunk_index
    }

    /// Get the offset of the external data in [`Self::source_file`].
    #[inline]
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Get the size of the external data.
    #[inline]
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Get the preloaded bytes.
    #[inline]
    pub fn preload(&self) -> &[u8] {
        &self.preload
    }

    /// Full content size: preload plus external data.
    #[inline]
    pub fn data_size(&self) -> usize {
        self.preload.len() + self.size.max(0) as usize
    }

    /// Get the file holding the external data.
    #[inline]
    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    /// Get the access mode.
    #[inline]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Get the entry contents.
    ///
    /// The first call reads or maps the backing file; later calls return the
    /// cached view as long as it still covers [`Self::data_size`] bytes.
    pub fn data(&self) -> Result<EntryData> {
        if self.size == 0 && self.preload.is_empty() {
            return Ok(EntryData::empty());
        }

        if let Some(cached) = self.cache.read().as_ref() {
            if cached.len() == self.data_size() {
                return Ok(cached.clone());
            }
        }

        let data = self.load()?;
        *self.cache.write() = Some(data.clone());
        Ok(data)
    }

    /// Compute the CRC32 of the actual contents.
    pub fn calc_crc32(&self) -> Result<u32> {
        let data = self.data()?;
        let mut hasher = Crc32Hasher::new();
        for chunk in data.chunks(CRC_CHUNK_SIZE) {
            hasher.update(chunk);
        }
        Ok(hasher.finalize())
    }

    /// Verify the contents against the declared checksum.
    pub fn check_data(&self) -> Result<()> {
        let actual = self.calc_crc32()?;
        if actual != self.crc32 {
            return Err(Error::Integrity {
                expected: self.crc32,
                actual,
            });
        }
        Ok(())
    }

    fn load(&self) -> Result<EntryData> {
        if self.size < 0 {
            return Err(Error::Format(format!(
                "negative size {} for {}",
                self.size,
                self.path()
            )));
        }

        if self.size == 0 {
            return Ok(EntryData {
                backing: Backing::Shared(self.preload.clone()),
            });
        }

        if self.offset < 0 {
            return Err(Error::Format(format!(
                "negative offset {} for {}",
                self.offset,
                self.path()
            )));
        }

        let offset = self.offset as u64;
        let len = self.size as usize;
        let end = offset + len as u64;
        let file = self.open_source(end)?;

        let file_len = file.metadata()?.len();
        if file_len < end {
            return Err(Error::Truncated {
                needed: end as usize,
                available: file_len as usize,
            });
        }

        let mut options = MmapOptions::new();
        options.offset(offset).len(len);

        let backing = match self.mode {
            // SAFETY: the archive is not modified by this crate while mapped.
            AccessMode::ReadOnly => Backing::Mapped(Arc::new(unsafe { options.map(&file)? })),
            AccessMode::ReadWrite => {
                Backing::MappedMut(Arc::new(unsafe { options.map_mut(&file)? }))
            }
        };
        let region = EntryData { backing };

        if self.preload.is_empty() {
            return Ok(region);
        }

        let mut combined = Vec::with_capacity(self.data_size());
        combined.extend_from_slice(&self.preload);
        combined.extend_from_slice(&region);

        Ok(EntryData {
            backing: Backing::Shared(combined.into()),
        })
    }

    fn open_source(&self, required_len: u64) -> Result<File> {
        match self.mode {
            AccessMode::ReadOnly => {
                if !self.source_file.exists() {
                    return Err(Error::NotFound(self.source_file.clone()));
                }
                Ok(File::open(&self.source_file)?)
            }
            AccessMode::ReadWrite => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(&self.source_file)?;
                if file.metadata()?.len() < required_len {
                    file.set_len(required_len)?;
                }
                Ok(file)
            }
        }
    }
}

impl std::fmt::Debug for VpkEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VpkEntry")
            .field("path", &self.path())
            .field("crc32", &format_args!("{:#010x}", self.crc32))
            .field("chunk_index", &self.chunk_index)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("preload", &self.preload.len())
            .field("source_file", &self.source_file)
            .finish()
    }
}
