//! Archive hand-off for completed jobs.

use std::fs::File;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::DownloadError;
use crate::job::Job;

pub const ZIP_CONTENT_TYPE: &str = "application/zip";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveDownload {
    /// Suggested attachment name.
    pub filename: String,
    pub content_type: &'static str,
    pub length: u64,
    pub path: PathBuf,
}

impl ArchiveDownload {
    /// Resolves the archive of `job`. A job without an archive, or whose
    /// archive is no longer on disk, is `NotAvailable`.
    pub fn for_job(job: &Job) -> Result<Self, DownloadError> {
        let path = job
            .archive_path
            .as_ref()
            .ok_or_else(|| DownloadError::NotAvailable(job.id.clone()))?;

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(DownloadError::NotAvailable(job.id.clone())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DownloadError::NotAvailable(job.id.clone()));
            }
            Err(e) => {
                return Err(DownloadError::Io {
                    path: path.clone(),
                    source: e,
                });
            }
        };

        Ok(Self {
            filename: job.archive_filename(),
            content_type: ZIP_CONTENT_TYPE,
            length: metadata.len(),
            path: path.clone(),
        })
    }

    pub fn open(&self) -> std::io::Result<File> {
        File::open(&self.path)
    }
}
