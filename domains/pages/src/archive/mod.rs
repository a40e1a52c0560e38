//! Build artifact access: compressed archive plus metadata index
//!
//! A build artifact is a gzip-compressed tar archive accompanied by a
//! small metadata index describing entry names, sizes, and offsets. The
//! index makes existence and size questions answerable without touching
//! the archive, and lets entry bytes be streamed lazily on demand.

pub mod metadata;
pub mod reader;

pub use metadata::{ArchiveEntry, MetadataIndex, METADATA_VERSION};
pub use reader::ArchiveReader;
