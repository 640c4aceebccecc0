//! Synthetic directory files for tests.

use zerocopy::little_endian::{I32, U16, U32};
use zerocopy::IntoBytes;

use crate::header::{EntryRecord, ENTRY_TERMINATOR, SIGNATURE};

/// One name in the table, with its record fields.
#[derive(Debug, Clone)]
pub(crate) struct FileSpec {
    pub name: String,
    pub crc32: u32,
    pub chunk_index: u16,
    pub offset: i32,
    pub size: i32,
    pub preload: Vec<u8>,
    pub terminator: u16,
}

impl FileSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            crc32: 0,
            chunk_index: 0x7FFF,
            offset: 0,
            size: 0,
            preload: Vec::new(),
            terminator: ENTRY_TERMINATOR,
        }
    }

    pub fn crc32(mut self, crc32: u32) -> Self {
        self.crc32 = crc32;
        self
    }

    pub fn chunk(mut self, chunk_index: u16) -> Self {
        self.chunk_index = chunk_index;
        self
    }

    pub fn region(mut self, offset: i32, size: i32) -> Self {
        self.offset = offset;
        self.size = size;
        self
    }

    pub fn preload(mut self, preload: &[u8]) -> Self {
        self.preload = preload.to_vec();
        self
    }

    pub fn terminator(mut self, terminator: u16) -> Self {
        self.terminator = terminator;
        self
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.name.as_bytes());
        out.push(0);

        let record = EntryRecord {
            crc32: U32::new(self.crc32),
            preload_size: U16::new(self.preload.len() as u16),
            chunk_index: U16::new(self.chunk_index),
            offset: I32::new(self.offset),
            size: I32::new(self.size),
            terminator: U16::new(self.terminator),
        };
        out.extend_from_slice(record.as_bytes());
        out.extend_from_slice(&self.preload);
    }
}

type DirGroup = (String, Vec<FileSpec>);

/// Builds the bytes of a directory file, grouping names the way the table
/// nests them.
#[derive(Debug, Clone)]
pub(crate) struct ArchiveBuilder {
    version: u32,
    dictionary_size: Option<u32>,
    types: Vec<(String, Vec<DirGroup>)>,
}

impl ArchiveBuilder {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            dictionary_size: None,
            types: Vec::new(),
        }
    }

    /// Override the declared dictionary size (computed by default).
    pub fn dictionary_size(mut self, size: u32) -> Self {
        self.dictionary_size = Some(size);
        self
    }

    /// Declare a directory without adding files to it.
    pub fn dir(mut self, ty: &str, dir: &str) -> Self {
        self.group(ty, dir);
        self
    }

    pub fn file(mut self, ty: &str, dir: &str, file: FileSpec) -> Self {
        self.group(ty, dir).push(file);
        self
    }

    fn group(&mut self, ty: &str, dir: &str) -> &mut Vec<FileSpec> {
        let type_idx = match self.types.iter().position(|(t, _)| t == ty) {
            Some(idx) => idx,
            None => {
                self.types.push((ty.to_string(), Vec::new()));
                self.types.len() - 1
            }
        };
        let dirs = &mut self.types[type_idx].1;
        let dir_idx = match dirs.iter().position(|(d, _)| d == dir) {
            Some(idx) => idx,
            None => {
                dirs.push((dir.to_string(), Vec::new()));
                dirs.len() - 1
            }
        };
        &mut dirs[dir_idx].1
    }

    /// The type/directory/name table with its records.
    pub fn table(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (ty, dirs) in &self.types {
            out.extend_from_slice(ty.as_bytes());
            out.push(0);
            for (dir, files) in dirs {
                out.extend_from_slice(dir.as_bytes());
                out.push(0);
                for file in files {
                    file.write(&mut out);
                }
                out.push(0);
            }
            out.push(0);
        }
        out.push(0);
        out
    }

    /// Header followed by the table.
    pub fn build(&self) -> Vec<u8> {
        let table = self.table();
        let mut out = Vec::new();
        out.extend_from_slice(&SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
        if self.version == 2 {
            for field in [0u32, 0, 0, 48] {
                out.extend_from_slice(&field.to_le_bytes());
            }
        }
        let dictionary_size = self.dictionary_size.unwrap_or(table.len() as u32);
        out.extend_from_slice(&dictionary_size.to_le_bytes());
        out.extend_from_slice(&table);
        out
    }
}
