pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;

pub use config::OrganizerConfig;
pub use context::{OrganizeContext, OrganizeOutcome, OrganizeReport};
pub use error::{PipelineError, PipelineWarning};
pub use progress::{LogProgress, NoopProgress, OrganizePhase, ProgressEvent, ProgressReporter};
pub use runner::Organizer;
