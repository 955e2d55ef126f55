//! Per-actor cumulative counters and dashboard figures.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::db::job_repo::JobTotals;
use crate::error::StatsError;
use crate::job::{Job, JobStatus};
use crate::store::ProfileStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorProfile {
    pub actor_id: String,
    pub files_organized: u64,
    pub bytes_saved: u64,
    pub created_at: DateTime<Utc>,
}


pub struct StatsAggregator;

impl StatsAggregator {
    /// Adds a completed job's declared totals to its owner's profile.
    ///
    /// Declared, not processed: files skipped during staging still count.
    pub fn record_completion<S: ProfileStore + ?Sized>(
        store: &S,
        job: &Job,
    ) -> Result<ActorProfile, StatsError> {
        if job.status != JobStatus::Completed {
            return Err(StatsError::NotCompleted {
                job_id: job.id.clone(),
                status: job.status.to_string(),
            });
        }

        let profile = store.increment_profile(&job.owner_id, job.declared_files, job.declared_bytes)?;
        info!(
            job_id = %job.id,
            actor_id = %job.owner_id,
            files_organized = profile.files_organized,
            bytes_saved = profile.bytes_saved,
            "Recorded job completion"
        );
        Ok(profile)
    }
}

/// Aggregate view for an actor's dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    pub total_files: u64,
    pub total_bytes: u64,
    pub total_size: String,
    pub profile: ActorProfile,
    /// Up to ten most recent completed jobs, newest first.
    pub recent_jobs: Vec<Job>,
}

pub const DASHBOARD_RECENT_JOBS: u64 = 10;

impl Dashboard {
    pub fn new(totals: JobTotals, profile: ActorProfile, recent_jobs: Vec<Job>) -> Self {
        Self {
            total_jobs: totals.total_jobs,
            completed_jobs: totals.completed_jobs,
            failed_jobs: totals.failed_jobs,
            total_files: totals.declared_files,
            total_bytes: totals.declared_bytes,
            total_size: format_size(totals.declared_bytes),
            profile,
            recent_jobs,
        }
    }
}

/// Formats a byte count with binary units and one decimal, e.g. `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}
