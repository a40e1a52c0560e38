//! Metadata index accompanying a build archive
//!
//! The index is a gzip-compressed JSON document listing every regular file
//! in the archive with its uncompressed size and the byte offset of its
//! data within the uncompressed tar stream. The CI producer derives it
//! from the finished archive with [`MetadataIndex::from_archive`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use pagedock_common::{Error, Result};

/// Current metadata index format version
pub const METADATA_VERSION: u32 = 1;

/// One regular-file entry in the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Entry path relative to the archive's logical root
    pub path: String,
    /// Uncompressed size in bytes
    pub size: u64,
    /// Byte position of the entry's data in the uncompressed tar stream
    pub offset: u64,
}

/// Index over a build archive's entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataIndex {
    pub version: u32,
    pub entries: Vec<ArchiveEntry>,
}

impl MetadataIndex {
    /// Parse an index from its gzip-compressed JSON encoding
    pub fn read_from(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut decoder = GzDecoder::new(BufReader::new(file));
        let mut buf = String::new();
        decoder.read_to_string(&mut buf).map_err(|e| {
            Error::CorruptArchive(format!("metadata index is not valid gzip: {e}"))
        })?;

        let index: MetadataIndex = serde_json::from_str(&buf)
            .map_err(|e| Error::CorruptArchive(format!("metadata index is not valid JSON: {e}")))?;

        if index.version != METADATA_VERSION {
            return Err(Error::CorruptArchive(format!(
                "unsupported metadata index version {}",
                index.version
            )));
        }

        Ok(index)
    }

    /// Write the gzip-compressed JSON encoding of this index
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        let json = serde_json::to_vec(self)?;
        encoder.write_all(&json)?;
        encoder.finish()?.flush()?;
        Ok(())
    }

    /// Derive the index from a finished archive
    ///
    /// This is the producer side of the artifact-pair contract: CI builds
    /// the archive, then derives and ships the index alongside it.
    pub fn from_archive(archive_path: &Path) -> Result<Self> {
        let file = File::open(archive_path)?;
        let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

        let mut entries = Vec::new();
        for entry in archive
            .entries()
            .map_err(|e| Error::CorruptArchive(format!("archive is not a valid tar stream: {e}")))?
        {
            let entry = entry.map_err(|e| {
                Error::CorruptArchive(format!("archive entry header is invalid: {e}"))
            })?;

            if !entry.header().entry_type().is_file() {
                continue;
            }

            let path = entry
                .path()
                .map_err(|e| Error::CorruptArchive(format!("archive entry path is invalid: {e}")))?
                .to_str()
                .ok_or_else(|| {
                    Error::CorruptArchive("archive entry path is not UTF-8".to_string())
                })?
                .to_string();

            let size = entry.header().size().map_err(|e| {
                Error::CorruptArchive(format!("archive entry size is invalid: {e}"))
            })?;

            entries.push(ArchiveEntry {
                path,
                size,
                offset: entry.raw_file_position(),
            });
        }

        Ok(MetadataIndex {
            version: METADATA_VERSION,
            entries,
        })
    }

    /// Look up an entry by path
    pub fn get(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Whether an entry exists at the given path
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Total uncompressed size of all entries
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
