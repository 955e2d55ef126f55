pub mod batch;
pub mod categorizer;
pub mod config;
pub mod db;
pub mod download;
pub mod error;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod rename;
pub mod sanitize;
pub mod stats;
pub mod storage;
pub mod store;
pub mod workspace;

pub use batch::{IncomingFile, Preview, PreviewEntry, Submission};
pub use categorizer::{Categorizer, CustomRule, NewRule, RuleType};
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use download::ArchiveDownload;
pub use error::{
    ArchiveError, BatchsortError, ConfigError, DownloadError, LoggingError, Result, StatsError,
    StorageError,
};
pub use job::{FileRecord, Job, JobStatus};
pub use logging::init_logging;
pub use pipeline::{
    Organizer, OrganizerConfig, OrganizeReport, PipelineError, PipelineWarning, ProgressEvent,
    ProgressReporter,
};
pub use stats::{ActorProfile, Dashboard};
pub use store::{JobStore, ProfileStore, RuleStore};
