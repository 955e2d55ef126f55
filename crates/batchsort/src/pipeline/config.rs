use std::path::{Path, PathBuf};

use crate::config::{ArchiveFailurePolicy, Config};
use crate::rename::DEFAULT_TEMPLATE;
use crate::storage::DEFAULT_COMPRESSION_LEVEL;

pub struct OrganizerConfig {
    pub data_root: PathBuf,
    pub default_template: String,
    pub compression_level: i64,
    pub on_archive_failure: ArchiveFailurePolicy,
}

impl OrganizerConfig {
    /// Defaults for everything but the data root.
    pub fn new<P: AsRef<Path>>(data_root: P) -> Self {
        Self {
            data_root: data_root.as_ref().to_path_buf(),
            default_template: DEFAULT_TEMPLATE.to_string(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            on_archive_failure: ArchiveFailurePolicy::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            data_root: config.data_root(),
            default_template: config.default_template.clone(),
            compression_level: config.archive.compression_level,
            on_archive_failure: config.archive.on_failure,
        }
    }
}
