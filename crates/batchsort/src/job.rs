use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Display name used when a submission has none.
pub const UNTITLED_JOB: &str = "Untitled Job";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = JobTransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(JobTransitionError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobTransitionError {
    #[error("Job {job_id} cannot move from {from} to {to}")]
    Illegal {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {job_id} processed {processed} files but only {declared} were declared")]
    ProcessedExceedsDeclared {
        job_id: String,
        processed: u64,
        declared: u64,
    },

    #[error("Unknown job status '{0}'")]
    UnknownStatus(String),
}

/// One organization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub status: JobStatus,
    pub declared_files: u64,
    pub processed_files: u64,
    pub declared_bytes: u64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_path: Option<PathBuf>,
}

impl Job {
    /// Creates a pending job for an accepted batch.
    pub fn new(owner_id: &str, name: &str, declared_files: u64, declared_bytes: u64) -> Self {
        let name = name.trim();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: if name.is_empty() {
                UNTITLED_JOB.to_string()
            } else {
                name.to_string()
            },
            status: JobStatus::Pending,
            declared_files,
            processed_files: 0,
            declared_bytes,
            created_at: Utc::now(),
            completed_at: None,
            archive_path: None,
        }
    }

    pub fn begin_processing(&mut self) -> Result<(), JobTransitionError> {
        self.ensure(JobStatus::Pending, JobStatus::Processing)?;
        self.status = JobStatus::Processing;
        Ok(())
    }

    /// Marks the job completed. `archive_path` is `None` when no archive
    /// could be built.
    pub fn complete(
        &mut self,
        processed_files: u64,
        archive_path: Option<PathBuf>,
        at: DateTime<Utc>,
    ) -> Result<(), JobTransitionError> {
        self.ensure(JobStatus::Processing, JobStatus::Completed)?;
        if processed_files > self.declared_files {
            return Err(JobTransitionError::ProcessedExceedsDeclared {
                job_id: self.id.clone(),
                processed: processed_files,
                declared: self.declared_files,
            });
        }
        self.status = JobStatus::Completed;
        self.processed_files = processed_files;
        self.archive_path = archive_path;
        self.completed_at = Some(at);
        Ok(())
    }

    pub fn fail(&mut self, processed_files: u64, at: DateTime<Utc>) -> Result<(), JobTransitionError> {
        self.ensure(JobStatus::Processing, JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.processed_files = processed_files.min(self.declared_files);
        self.archive_path = None;
        self.completed_at = Some(at);
        Ok(())
    }

    fn ensure(&self, from: JobStatus, to: JobStatus) -> Result<(), JobTransitionError> {
        if self.status != from {
            return Err(JobTransitionError::Illegal {
                job_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        Ok(())
    }

    /// Suggested download filename: whitespace becomes `_`, plus `.zip`.
    pub fn archive_filename(&self) -> String {
        let stem: String = self
            .name
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        format!("{}.zip", stem)
    }
}

/// One organized file of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub job_id: String,
    pub original_name: String,
    pub new_name: String,
    pub category: String,
    pub size: u64,
    pub source_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staged_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}
