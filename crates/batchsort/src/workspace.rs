//! Per-actor, per-job directory layout.
//!
//! ```text
//! <data_root>/users/<actor_id>/
//!     uploads/<job_id>/        raw uploaded files
//!     organized/<job_id>/      category-partitioned staging tree
//!     jobs/<job_id>.zip        built archive
//! ```

use std::path::{Path, PathBuf};

use crate::error::StorageError;

const UPLOADS_DIR: &str = "uploads";
const ORGANIZED_DIR: &str = "organized";
const ARCHIVES_DIR: &str = "jobs";

#[derive(Debug, Clone)]
pub struct Workspace {
    data_root: PathBuf,
}

impl Workspace {
    pub fn new<P: AsRef<Path>>(data_root: P) -> Self {
        Self {
            data_root: data_root.as_ref().to_path_buf(),
        }
    }

    /// Resolves the actor's three roots and creates them if missing.
    pub fn for_actor(&self, actor_id: &str) -> Result<ActorWorkspace, StorageError> {
        validate_component(actor_id)?;

        let base = self.data_root.join("users").join(actor_id);
        let layout = ActorWorkspace {
            uploads_root: base.join(UPLOADS_DIR),
            staging_root: base.join(ORGANIZED_DIR),
            archive_root: base.join(ARCHIVES_DIR),
        };

        ensure_directory(&layout.uploads_root)?;
        ensure_directory(&layout.staging_root)?;
        ensure_directory(&layout.archive_root)?;

        Ok(layout)
    }
}

/// The resolved directory roots for a single actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorWorkspace {
    pub uploads_root: PathBuf,
    pub staging_root: PathBuf,
    pub archive_root: PathBuf,
}

impl ActorWorkspace {
    pub fn upload_dir(&self, job_id: &str) -> Result<PathBuf, StorageError> {
        validate_component(job_id)?;
        Ok(self.uploads_root.join(job_id))
    }

    pub fn staging_dir(&self, job_id: &str) -> Result<PathBuf, StorageError> {
        validate_component(job_id)?;
        Ok(self.staging_root.join(job_id))
    }

    pub fn archive_path(&self, job_id: &str) -> Result<PathBuf, StorageError> {
        validate_component(job_id)?;
        Ok(self.archive_root.join(format!("{}.zip", job_id)))
    }
}

pub(crate) fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Ids become directory names, so they must be a single plain component.
fn validate_component(value: &str) -> Result<(), StorageError> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\')
        || value.contains('\0');
    if invalid {
        return Err(StorageError::InvalidComponent(value.to_string()));
    }
    Ok(())
}
