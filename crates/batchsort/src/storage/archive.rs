//! Zip archive construction over a staging tree.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;

pub const DEFAULT_COMPRESSION_LEVEL: i64 = 6;

/// An entry that could not be added. The build carries on without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntryError {
    pub entry: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveOutcome {
    pub archive_path: PathBuf,
    /// Entry names in archive order.
    pub written_entries: Vec<String>,
    pub errors: Vec<ArchiveEntryError>,
    pub size_bytes: u64,
}

pub struct ArchiveBuilder {
    compression_level: i64,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl ArchiveBuilder {
    pub fn new(compression_level: i64) -> Self {
        Self { compression_level }
    }

    /// Zips every regular file under `staging_root` into `archive_path`,
    /// using the `/`-separated relative path as entry name.
    ///
    /// The archive is written to a sibling temporary file and renamed into
    /// place, so an existing archive survives a failed build.
    pub fn build(
        &self,
        staging_root: &Path,
        archive_path: &Path,
    ) -> Result<ArchiveOutcome, ArchiveError> {
        if !staging_root.is_dir() {
            return Err(ArchiveError::MissingStagingRoot(staging_root.to_path_buf()));
        }

        let mut errors = Vec::new();
        let entries = collect_entries(staging_root, &mut errors);

        if let Some(parent) = archive_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArchiveError::Create {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let partial = partial_path(archive_path);
        let file = File::create(&partial).map_err(|e| ArchiveError::Create {
            path: partial.clone(),
            source: e,
        })?;

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level));

        let mut zip = ZipWriter::new(file);
        let mut written_entries = Vec::with_capacity(entries.len());

        for (name, path) in entries {
            match write_entry(&mut zip, &name, &path, options) {
                Ok(()) => {
                    debug!(entry = %name, "Added archive entry");
                    written_entries.push(name);
                }
                Err(reason) => {
                    warn!(entry = %name, "Skipping archive entry: {}", reason);
                    errors.push(ArchiveEntryError {
                        entry: name,
                        reason,
                    });
                }
            }
        }

        let file = match zip.finish() {
            Ok(file) => file,
            Err(e) => {
                discard(&partial);
                return Err(ArchiveError::Finalize {
                    path: archive_path.to_path_buf(),
                    source: e,
                });
            }
        };

        let size_bytes = match file.sync_all().and_then(|_| file.metadata()) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                discard(&partial);
                return Err(ArchiveError::Persist {
                    path: archive_path.to_path_buf(),
                    source: e,
                });
            }
        };
        drop(file);

        if let Err(e) = std::fs::rename(&partial, archive_path) {
            discard(&partial);
            return Err(ArchiveError::Persist {
                path: archive_path.to_path_buf(),
                source: e,
            });
        }

        Ok(ArchiveOutcome {
            archive_path: archive_path.to_path_buf(),
            written_entries,
            errors,
            size_bytes,
        })
    }
}

/// Regular files under `root`, sorted by entry name.
fn collect_entries(root: &Path, errors: &mut Vec<ArchiveEntryError>) -> Vec<(String, PathBuf)> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let name = e
                    .path()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(entry_name)
                    .unwrap_or_default();
                errors.push(ArchiveEntryError {
                    entry: name,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            entries.push((entry_name(relative), entry.path().to_path_buf()));
        }
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn write_entry(
    zip: &mut ZipWriter<File>,
    name: &str,
    path: &Path,
    options: SimpleFileOptions,
) -> Result<(), String> {
    let mut source = File::open(path).map_err(|e| e.to_string())?;
    zip.start_file(name, options).map_err(|e| e.to_string())?;
    if let Err(e) = io::copy(&mut source, zip) {
        let _ = zip.abort_file();
        return Err(e.to_string());
    }
    Ok(())
}

fn partial_path(archive_path: &Path) -> PathBuf {
    let file_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive.zip".to_string());
    archive_path.with_file_name(format!("{}.{}.partial", file_name, uuid::Uuid::new_v4()))
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), "Failed to remove partial archive: {}", e);
        }
    }
}
