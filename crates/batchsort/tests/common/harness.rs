//! Test harness for isolated organizer runs.
//!
//! Each `TestHarness` owns a temporary data root and an in-memory
//! database, so tests never share workspace or store state.

#![allow(dead_code)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use batchsort::config::ArchiveFailurePolicy;
use batchsort::workspace::{ActorWorkspace, Workspace};
use batchsort::{Database, Organizer, OrganizerConfig};

pub struct TestHarness {
    /// Keeps the data root alive for the harness' lifetime.
    temp_dir: TempDir,
    pub data_root: PathBuf,
    pub organizer: Organizer<Database>,
}

impl TestHarness {
    /// Harness with the default configuration.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Harness whose archive failures fail the job.
    pub fn failing_on_archive_error() -> Self {
        Self::with_config(|config| config.on_archive_failure = ArchiveFailurePolicy::Fail)
    }

    pub fn with_config(customize: impl FnOnce(&mut OrganizerConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let data_root = temp_dir.path().join("data");

        let mut config = OrganizerConfig::new(&data_root);
        customize(&mut config);

        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let organizer = Organizer::new(Arc::new(config), db);

        Self {
            temp_dir,
            data_root,
            organizer,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn layout(&self, actor_id: &str) -> ActorWorkspace {
        Workspace::new(&self.data_root)
            .for_actor(actor_id)
            .expect("Failed to resolve actor workspace")
    }

    pub fn upload_dir(&self, actor_id: &str, job_id: &str) -> PathBuf {
        self.layout(actor_id)
            .upload_dir(job_id)
            .expect("Invalid job id")
    }

    pub fn staging_dir(&self, actor_id: &str, job_id: &str) -> PathBuf {
        self.layout(actor_id)
            .staging_dir(job_id)
            .expect("Invalid job id")
    }

    /// Deletes an uploaded file between ingest and organize.
    pub fn remove_upload(&self, actor_id: &str, job_id: &str, upload_name: &str) {
        let path = self.upload_dir(actor_id, job_id).join(upload_name);
        std::fs::remove_file(&path).expect("Failed to remove upload");
    }

    /// Occupies the archive location with a non-empty directory so the
    /// final rename of the archive fails.
    pub fn block_archive(&self, actor_id: &str, job_id: &str) {
        let archive_path = self
            .layout(actor_id)
            .archive_path(job_id)
            .expect("Invalid job id");
        std::fs::create_dir_all(archive_path.join("blocker")).expect("Failed to block archive");
    }

    /// Entry names of a zip archive, in stored order.
    pub fn archive_entries(&self, archive_path: &Path) -> Vec<String> {
        let file = std::fs::File::open(archive_path).expect("Failed to open archive");
        let mut archive = zip::ZipArchive::new(file).expect("Failed to read archive");
        (0..archive.len())
            .map(|i| {
                archive
                    .by_index(i)
                    .expect("Failed to read entry")
                    .name()
                    .to_string()
            })
            .collect()
    }

    /// Content of one archive entry.
    pub fn archive_entry(&self, archive_path: &Path, name: &str) -> Vec<u8> {
        let file = std::fs::File::open(archive_path).expect("Failed to open archive");
        let mut archive = zip::ZipArchive::new(file).expect("Failed to read archive");
        let mut entry = archive.by_name(name).expect("Entry not found");
        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .expect("Failed to read entry content");
        content
    }
}
