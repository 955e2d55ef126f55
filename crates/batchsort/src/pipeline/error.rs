use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Submission contains no files")]
    EmptySubmission,

    #[error("No staged batch for actor {actor_id}")]
    MissingStagedBatch { actor_id: String },

    #[error("Pipeline setup failed for job {job_id}: {reason}")]
    PipelineSetupFailure { job_id: String, reason: String },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] crate::categorizer::RuleError),

    #[error("Illegal job transition: {0}")]
    Transition(#[from] crate::job::JobTransitionError),

    #[error("Store error: {0}")]
    Store(#[from] crate::db::DatabaseError),
}

/// Non-fatal problems collected during a run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PipelineWarning {
    #[error("Source file for '{original_name}' is missing: {}", .path.display())]
    #[serde(rename_all = "camelCase")]
    SourceFileMissing { original_name: String, path: PathBuf },

    #[error("Failed to stage '{original_name}': {error}")]
    #[serde(rename_all = "camelCase")]
    CopyFailed { original_name: String, error: String },

    #[error("Failed to record '{original_name}': {error}")]
    #[serde(rename_all = "camelCase")]
    RecordFailed { original_name: String, error: String },

    #[error("Template '{template}' is malformed, fallback naming used: {reason}")]
    MalformedTemplate { template: String, reason: String },

    #[error("Rule {rule_id} ('{name}') ignored: {reason}")]
    #[serde(rename_all = "camelCase")]
    MalformedRule {
        rule_id: i64,
        name: String,
        reason: String,
    },

    #[error("Archive entry '{entry}' skipped: {reason}")]
    ArchiveEntryFailed { entry: String, reason: String },

    #[error("Archive could not be built: {reason}")]
    ArchiveCreateFailure { reason: String },

    #[error("Profile counters not updated: {reason}")]
    StatsUpdateFailed { reason: String },
}
