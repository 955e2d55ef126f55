use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::rename::DEFAULT_TEMPLATE;
use crate::storage::DEFAULT_COMPRESSION_LEVEL;

pub const CONFIG_VERSION: &str = "1.0";
pub const DATABASE_FILE: &str = "batchsort.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default = "default_template")]
    pub default_template: String,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            data_root: None,
            database: None,
            default_template: default_template(),
            archive: ArchiveConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// The configured data root, or `~/.batchsort/data`.
    pub fn data_root(&self) -> PathBuf {
        match &self.data_root {
            Some(root) => PathBuf::from(root),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".batchsort")
                .join("data"),
        }
    }

    /// The configured database file, or `<data_root>/batchsort.db`.
    pub fn database_path(&self) -> PathBuf {
        match &self.database {
            Some(path) => PathBuf::from(path),
            None => self.data_root().join(DATABASE_FILE),
        }
    }
}

/// What an organize run ends as when the archive cannot be built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFailurePolicy {
    /// The job completes without an archive location.
    #[default]
    Complete,
    /// The job fails.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveConfig {
    #[serde(default = "default_compression_level")]
    pub compression_level: i64,
    #[serde(default)]
    pub on_failure: ArchiveFailurePolicy,
}

fn default_compression_level() -> i64 {
    DEFAULT_COMPRESSION_LEVEL
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
            on_failure: ArchiveFailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "batchsort=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}
