use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchsortError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Stats error: {0}")]
    Stats(#[from] StatsError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid default template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy file from '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Invalid path component '{0}'")]
    InvalidComponent(String),

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to create archive container '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to finalize archive '{path}': {source}")]
    Finalize {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to move archive into place at '{path}': {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Staging directory does not exist: {0}")]
    MissingStagingRoot(PathBuf),
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Archive not available for job {0}")]
    NotAvailable(String),

    #[error("Failed to read archive '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Job {job_id} is {status}, only completed jobs are counted")]
    NotCompleted { job_id: String, status: String },

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

pub type Result<T> = std::result::Result<T, BatchsortError>;
