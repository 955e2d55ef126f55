pub mod archive;
pub mod filesystem;

pub use archive::{ArchiveBuilder, ArchiveEntryError, ArchiveOutcome, DEFAULT_COMPRESSION_LEVEL};
pub use filesystem::FileStorage;
