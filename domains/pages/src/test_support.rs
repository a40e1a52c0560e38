//! Shared fixtures for unit tests

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::archive::MetadataIndex;

/// Build an artifact pair (tar.gz archive + derived metadata index) from
/// a list of (path, content) entries. Returns the two file paths.
pub fn build_artifact_pair(dir: &Path, files: &[(&str, &[u8])]) -> (PathBuf, PathBuf) {
    let archive_path = dir.join("pages.tar.gz");
    let file = File::create(&archive_path).unwrap();
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, *data).unwrap();
    }

    let encoder = builder.into_inner().unwrap();
    encoder.finish().unwrap().flush().unwrap();

    let metadata_path = dir.join("pages.tar.gz.meta");
    let index = MetadataIndex::from_archive(&archive_path).unwrap();
    index.write_to(&metadata_path).unwrap();

    (archive_path, metadata_path)
}
