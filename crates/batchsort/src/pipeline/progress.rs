use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizePhase {
    Ingesting,
    Staging,
    Archiving,
    Finalizing,
}

/// Events emitted by the organizer while a job runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProgressEvent {
    #[serde(rename_all = "camelCase")]
    Phase { job_id: String, phase: OrganizePhase },
    #[serde(rename_all = "camelCase")]
    FileStaged {
        job_id: String,
        index: usize,
        category: String,
        new_name: String,
    },
    #[serde(rename_all = "camelCase")]
    FileSkipped {
        job_id: String,
        index: usize,
        original_name: String,
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        job_id: String,
        processed: u64,
        archive_path: Option<PathBuf>,
    },
    #[serde(rename_all = "camelCase")]
    Failed { job_id: String, error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards events to tracing.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase { job_id, phase } => {
                info!(job_id = %job_id, phase = ?phase, "Phase started");
            }
            ProgressEvent::FileStaged {
                job_id,
                index,
                category,
                new_name,
            } => {
                info!(job_id = %job_id, index, category = %category, new_name = %new_name, "File staged");
            }
            ProgressEvent::FileSkipped {
                job_id,
                index,
                original_name,
                reason,
            } => {
                warn!(job_id = %job_id, index, original_name = %original_name, "File skipped: {}", reason);
            }
            ProgressEvent::Completed {
                job_id,
                processed,
                archive_path,
            } => {
                info!(
                    job_id = %job_id,
                    processed,
                    has_archive = archive_path.is_some(),
                    "Job completed"
                );
            }
            ProgressEvent::Failed { job_id, error } => {
                warn!(job_id = %job_id, "Job failed: {}", error);
            }
        }
    }
}
