use std::path::PathBuf;

use serde::Serialize;

use crate::batch::StagedBatch;
use crate::job::Job;
use crate::storage::ArchiveOutcome;

use super::error::PipelineWarning;

/// Per-file and archive results of one organize run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeOutcome {
    pub attempted: usize,
    pub staged: usize,
    pub missing: usize,
    pub failed: usize,
    /// `None` when the archive could not be built.
    pub archive: Option<ArchiveOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeReport {
    pub job: Job,
    pub outcome: OrganizeOutcome,
    pub warnings: Vec<PipelineWarning>,
}

/// Working state of a single organize run.
pub struct OrganizeContext {
    pub job: Job,
    pub batch: StagedBatch,

    // Resolved before staging starts
    pub upload_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub archive_path: PathBuf,

    pub outcome: OrganizeOutcome,
    pub warnings: Vec<PipelineWarning>,
}

impl OrganizeContext {
    pub fn new(
        job: Job,
        batch: StagedBatch,
        upload_dir: PathBuf,
        staging_dir: PathBuf,
        archive_path: PathBuf,
    ) -> Self {
        let attempted = batch.preview.len();
        Self {
            job,
            batch,
            upload_dir,
            staging_dir,
            archive_path,
            outcome: OrganizeOutcome {
                attempted,
                ..Default::default()
            },
            warnings: Vec::new(),
        }
    }

    pub fn into_report(self) -> OrganizeReport {
        OrganizeReport {
            job: self.job,
            outcome: self.outcome,
            warnings: self.warnings,
        }
    }
}
