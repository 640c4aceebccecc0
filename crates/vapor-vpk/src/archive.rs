//! VPK directory parser and index.
//!
//! The directory file is parsed in a single pass:
//! - header (signature, version, dictionary size)
//! - nested type / directory / name string table
//! - one fixed record plus preload bytes per name
//!
//! Every entry is registered in three lookup maps (by type, by directory and
//! by full path) as it is read. Any error discards the partially built index.

use std::collections::BTreeSet;
use std::fs::File;
use std::hash::BuildHasherDefault;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use memmap2::Mmap;
use rustc_hash::FxHasher;
use tracing::{debug, trace, warn};
use vapor_common::{BinaryReader, Charset};

use crate::entry::{AccessMode, VpkEntry};
use crate::header::{EntryRecord, Version, VpkHeader, ENTRY_TERMINATOR, STRING_LIMIT};
use crate::location::DataSource;
use crate::{Error, Result};

type FxHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Settings for reading a directory file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Encoding of type, directory and name strings.
    pub charset: Charset,
    /// Maximum length of a single table string.
    pub string_limit: usize,
    /// Access mode handed to every entry.
    pub mode: AccessMode,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            charset: Charset::default(),
            string_limit: STRING_LIMIT,
            mode: AccessMode::ReadOnly,
        }
    }
}

/// A parsed VPK directory.
pub struct VpkArchive {
    /// Path of the directory file
    path: PathBuf,
    /// Parsed header
    header: VpkHeader,
    /// Data lives in `_NNN` chunk files
    multi_chunk: bool,
    /// Entries in table order
    entries: Vec<Arc<VpkEntry>>,
    by_type: FxHashMap<String, Vec<Arc<VpkEntry>>>,
    by_dir: FxHashMap<String, Vec<Arc<VpkEntry>>>,
    by_path: FxHashMap<String, Arc<VpkEntry>>,
}

impl VpkArchive {
    /// Open and index a VPK directory file.
    ///
    /// For multi-chunk archives this must be the `_dir` index file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &ParseOptions::default())
    }

    /// Open and index a VPK directory file with custom options.
    pub fn open_with<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        if file.metadata()?.len() == 0 {
            return Self::parse(path, &[], options);
        }

        // SAFETY: the directory file is only read, and only during this call.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::parse(path, &mmap, options)
    }

    /// Index an in-memory directory image.
    ///
    /// `path` is where the directory file lives; it decides whether the
    /// archive is multi-chunk and where entry data is looked up.
    pub fn parse<P: AsRef<Path>>(path: P, data: &[u8], options: &ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = BinaryReader::new(data);

        let header = VpkHeader::read(&mut reader)?;
        let source = DataSource::for_archive(path, &header);

        let mut archive = Self {
            path: path.to_path_buf(),
            header,
            multi_chunk: source.is_multi_chunk(),
            entries: Vec::new(),
            by_type: FxHashMap::default(),
            by_dir: FxHashMap::default(),
            by_path: FxHashMap::default(),
        };

        let read_string = |reader: &mut BinaryReader<'_>| -> Result<String> {
            Ok(reader.read_null_terminated_string(options.string_limit, options.charset, false)?)
        };

        loop {
            let ty = read_string(&mut reader)?;
            if ty.is_empty() {
                break;
            }
            archive.by_type.entry_ref(ty.as_str()).or_default();

            loop {
                let raw_dir = read_string(&mut reader)?;
                if raw_dir.is_empty() {
                    break;
                }
                let dir = normalize_directory(&raw_dir);
                archive.by_dir.entry_ref(dir.as_str()).or_default();

                loop {
                    let name = read_string(&mut reader)?;
                    if name.is_empty() {
                        break;
                    }
                    let entry = read_entry(&mut reader, &source, &ty, &dir, name, options.mode)?;
                    archive.insert(entry);
                }
            }
        }

        if header.version == Version::V1 {
            let actual = reader.position() - header.header_size();
            let declared = header.dictionary_size as usize;
            if declared != 0 && actual != declared {
                return Err(Error::Format(format!(
                    "incorrect dictionary size {actual} (expected {declared})"
                )));
            }
        }

        debug!(
            archive = %path.display(),
            entries = archive.entries.len(),
            types = archive.by_type.len(),
            directories = archive.by_dir.len(),
            multi_chunk = archive.multi_chunk,
            "indexed VPK directory"
        );

        Ok(archive)
    }

    fn insert(&mut self, entry: VpkEntry) {
        let entry = Arc::new(entry);
        let path = entry.path();

        trace!(
            path = %path,
            size = entry.size(),
            preload = entry.preload().len(),
            chunk = entry.chunk_index(),
            "entry"
        );

        self.by_type
            .entry_ref(entry.ty())
            .or_default()
            .push(Arc::clone(&entry));
        self.by_dir
            .entry_ref(entry.directory())
            .or_default()
            .push(Arc::clone(&entry));
        match self.by_path.entry(path) {
            Entry::Occupied(mut slot) => {
                warn!(path = %slot.key(), "duplicate entry path, keeping the later one");
                slot.insert(Arc::clone(&entry));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&entry));
            }
        }
        self.entries.push(entry);
    }

    /// Get the path of the directory file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the archive file name.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
    }

    /// Get the format version.
    #[inline]
    pub fn version(&self) -> Version {
        self.header.version
    }

    /// Get the size of the fixed header in bytes.
    #[inline]
    pub fn header_size(&self) -> usize {
        self.header.header_size()
    }

    /// Get the declared dictionary size.
    #[inline]
    pub fn dictionary_size(&self) -> u32 {
        self.header.dictionary_size
    }

    /// Whether entry data lives in separate chunk files.
    #[inline]
    pub fn is_multi_chunk(&self) -> bool {
        self.multi_chunk
    }

    /// Get the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in table order.
    #[inline]
    pub fn entries(&self) -> &[Arc<VpkEntry>] {
        &self.entries
    }

    /// Iterate over entries in table order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &VpkEntry> + '_ {
        self.entries.iter().map(|e| e.as_ref())
    }

    /// Entries in a directory, `None` if the directory never appeared.
    ///
    /// `dir` uses the normalized form: empty for the root, otherwise ending
    /// in `/`.
    pub fn entries_by_dir(&self, dir: &str) -> Option<&[Arc<VpkEntry>]> {
        self.by_dir.get(dir).map(Vec::as_slice)
    }

    /// Entries with a file type, `None` if the type never appeared.
    pub fn entries_by_type(&self, ty: &str) -> Option<&[Arc<VpkEntry>]> {
        self.by_type.get(ty).map(Vec::as_slice)
    }

    /// Look up an entry by its full path.
    pub fn entry(&self, path: &str) -> Option<&Arc<VpkEntry>> {
        self.by_path.get(path)
    }

    /// All file types seen in the table.
    pub fn types(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_type.keys().map(String::as_str)
    }

    /// All normalized directories seen in the table.
    pub fn directories(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_dir.keys().map(String::as_str)
    }

    /// Distinct files holding entry data, sorted.
    pub fn source_files(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .map(|e| e.source_file().to_path_buf())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Drop every entry and index. Backing files are not touched.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_type.clear();
        self.by_dir.clear();
        self.by_path.clear();
    }

    /// Verify every entry's checksum in parallel.
    ///
    /// Results are in table order; one failing entry does not stop the rest.
    #[cfg(feature = "parallel")]
    pub fn check_all_parallel(&self) -> Vec<Result<()>> {
        use rayon::prelude::*;

        self.entries
            .par_iter()
            .map(|entry| entry.check_data())
            .collect()
    }
}

impl std::fmt::Debug for VpkArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VpkArchive")
            .field("path", &self.path)
            .field("version", &self.header.version)
            .field("multi_chunk", &self.multi_chunk)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Read the record following `name` and build its entry.
fn read_entry(
    reader: &mut BinaryReader<'_>,
    source: &DataSource,
    ty: &str,
    dir: &str,
    name: String,
    mode: AccessMode,
) -> Result<VpkEntry> {
    let record: EntryRecord = reader.read_struct()?;

    let terminator = record.terminator.get();
    if terminator != ENTRY_TERMINATOR {
        return Err(Error::Format(format!(
            "unexpected terminator {terminator:#06x} after {dir}{name}.{ty}"
        )));
    }

    let preload = reader
        .read_bytes(record.preload_size.get() as usize)?
        .to_vec();

    let (source_file, offset) = source.resolve(record.chunk_index.get(), record.offset.get())?;

    Ok(VpkEntry::new(
        ty.to_string(),
        dir.to_string(),
        name,
        record.crc32.get(),
        record.chunk_index.get(),
        offset,
        record.size.get(),
        preload,
        source_file,
        mode,
    ))
}

/// Bring a stored directory string into canonical form.
///
/// Backslashes become `/`, a lone space means the root (`""`), and any other
/// non-empty directory ends in `/`.
pub fn normalize_directory(raw: &str) -> String {
    let mut dir = raw.replace('\\', "/");

    if dir == " " {
        dir.clear();
    }

    if !dir.is_empty() && !dir.ends_with('/') {
        dir.push('/');
    }

    dir
}
