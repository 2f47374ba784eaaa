//! Shrinks release binaries and packages them into release archives.

pub mod archiver;
pub mod checksum;
pub mod packager;
pub mod shrink;

pub use archiver::{ArchiveEntry, create_archive, list_entries};
pub use checksum::sha256_file;
pub use packager::ArtifactPackager;
pub use shrink::Shrinker;
