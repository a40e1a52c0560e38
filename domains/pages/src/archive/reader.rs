//! Lazy reader over a build archive and its metadata index
//!
//! Existence and size questions are answered from the index without
//! touching the archive. Entry bytes are only decompressed when a caller
//! explicitly reads them, and structural verification walks tar headers
//! without materializing any entry content.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use pagedock_common::{Error, Result};

use super::metadata::{ArchiveEntry, MetadataIndex};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Handle over an archive/metadata pair
#[derive(Debug)]
pub struct ArchiveReader {
    archive_path: PathBuf,
    index: MetadataIndex,
}

impl ArchiveReader {
    /// Open an artifact pair
    ///
    /// Parses the metadata index in full (it is small) and checks the
    /// archive's gzip framing. Fails with `CorruptArchive` when either
    /// cannot be parsed structurally.
    pub fn open(archive_path: &Path, metadata_path: &Path) -> Result<Self> {
        let index = MetadataIndex::read_from(metadata_path)?;

        let mut file = File::open(archive_path)?;
        let mut magic = [0u8; 2];
        file.read_exact(&mut magic)
            .map_err(|_| Error::CorruptArchive("archive is truncated".to_string()))?;
        if magic != GZIP_MAGIC {
            return Err(Error::CorruptArchive(
                "archive is not gzip-compressed".to_string(),
            ));
        }

        Ok(ArchiveReader {
            archive_path: archive_path.to_path_buf(),
            index,
        })
    }

    /// Whether an entry exists, answered from the index alone
    pub fn entry_exists(&self, path: &str) -> bool {
        self.index.contains(path)
    }

    /// Total uncompressed size of all entries, from the index
    pub fn total_size(&self) -> u64 {
        self.index.total_size()
    }

    /// Number of entries in the index
    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    /// Iterate over index entries (finite, restartable per call)
    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.index.entries.iter()
    }

    pub fn index(&self) -> &MetadataIndex {
        &self.index
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Stream one entry's bytes
    ///
    /// Lazy: decompresses the stream up to the entry's offset, discarding
    /// the skipped bytes, then yields exactly the entry's length. Nothing
    /// is buffered beyond the decompressor's window.
    pub fn read_entry(&self, path: &str) -> Result<impl Read> {
        let entry = self
            .index
            .get(path)
            .ok_or_else(|| Error::NotFound(format!("archive entry: {path}")))?;

        let file = File::open(&self.archive_path)?;
        let mut stream = GzDecoder::new(BufReader::new(file));

        let skipped = io::copy(&mut (&mut stream).take(entry.offset), &mut io::sink())?;
        if skipped != entry.offset {
            return Err(Error::CorruptArchive(format!(
                "archive ends before entry {path} at offset {}",
                entry.offset
            )));
        }

        Ok(stream.take(entry.size))
    }

    /// Walk every regular-file entry in archive order
    ///
    /// The callback receives the index entry and a bounded reader over the
    /// entry's bytes. Used by the publisher for single-pass extraction so
    /// the archive is decompressed exactly once.
    pub fn visit_entries<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&ArchiveEntry, &mut dyn Read) -> Result<()>,
    {
        let file = File::open(&self.archive_path)?;
        let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

        for entry in archive
            .entries()
            .map_err(|e| Error::CorruptArchive(format!("archive is not a valid tar stream: {e}")))?
        {
            let mut entry = entry.map_err(|e| {
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

            let indexed = self.index.get(&path).ok_or_else(|| {
                Error::CorruptArchive(format!("entry {path} is missing from the metadata index"))
            })?;

            visit(indexed, &mut entry)?;
        }

        Ok(())
    }

    /// Structural verification of the archive against its index
    ///
    /// Walks every tar header (entry bytes are never materialized) and
    /// cross-checks path and size agreement with the index in both
    /// directions. Any undecodable header or disagreement is corruption.
    pub fn verify_structure(&self) -> Result<()> {
        let file = File::open(&self.archive_path)?;
        let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

        let mut seen = 0usize;
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

            let indexed = self.index.get(&path).ok_or_else(|| {
                Error::CorruptArchive(format!("entry {path} is missing from the metadata index"))
            })?;

            let size = entry
                .header()
                .size()
                .map_err(|e| Error::CorruptArchive(format!("archive entry size is invalid: {e}")))?;
            if indexed.size != size {
                return Err(Error::CorruptArchive(format!(
                    "entry {path} size disagrees with the metadata index ({size} vs {})",
                    indexed.size
                )));
            }

            seen += 1;
        }

        if seen != self.index.len() {
            return Err(Error::CorruptArchive(
                "metadata index lists entries not present in the archive".to_string(),
            ));
        }

        Ok(())
    }
}
