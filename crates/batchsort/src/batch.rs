//! The staged batch: ephemeral state between ingest and organize.
//!
//! A batch is created when a submission is ingested, superseded when the
//! same actor ingests again, and removed when organize takes it.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::categorizer::SkippedRule;
use crate::rename::{resolve_names, TemplateError};

/// One uploaded file as handed over by the presentation layer.
pub struct IncomingFile {
    pub original_name: String,
    /// Size reported by the client.
    pub size: u64,
    /// Modification time reported by the client, if any. Date rules fall
    /// back to the time the upload was written.
    pub modified: Option<DateTime<Utc>>,
    pub content: Box<dyn Read + Send>,
}

impl IncomingFile {
    pub fn new(original_name: impl Into<String>, size: u64, content: Box<dyn Read + Send>) -> Self {
        Self {
            original_name: original_name.into(),
            size,
            modified: None,
            content,
        }
    }

    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn from_bytes(original_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self::new(original_name, size, Box::new(std::io::Cursor::new(bytes)))
    }
}

/// A new organization request.
#[derive(Default)]
pub struct Submission {
    pub display_name: String,
    /// Naming template; blank means the configured default.
    pub template: String,
    pub files: Vec<IncomingFile>,
}

impl Submission {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn file(mut self, file: IncomingFile) -> Self {
        self.files.push(file);
        self
    }

    /// Sum of the client-declared sizes, saturating at `u64::MAX`.
    pub fn declared_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).fold(0, u64::saturating_add)
    }
}

/// One ingested file before naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedItem {
    pub original_name: String,
    /// Name of the file inside the job's upload directory.
    pub upload_name: String,
    pub category: String,
    pub size: u64,
}

/// One resolved row of the preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEntry {
    pub index: usize,
    pub original_name: String,
    #[serde(skip)]
    pub upload_name: String,
    pub category: String,
    pub size: u64,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub job_id: String,
    pub template: String,
    pub entries: Vec<PreviewEntry>,
    /// Why the template was replaced by the fallback, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StagedBatch {
    pub actor_id: String,
    pub job_id: String,
    pub template: String,
    pub items: Vec<StagedItem>,
    pub preview: Vec<PreviewEntry>,
    pub fallback: Option<TemplateError>,
    /// Rules that were ignored while classifying this batch.
    pub skipped_rules: Vec<SkippedRule>,
}

impl StagedBatch {
    /// Resolves the preview eagerly so it is fixed for the batch's lifetime.
    pub fn new(actor_id: &str, job_id: &str, template: &str, items: Vec<StagedItem>) -> Self {
        let resolution = resolve_names(&items, template);
        Self {
            actor_id: actor_id.to_string(),
            job_id: job_id.to_string(),
            template: template.to_string(),
            items,
            preview: resolution.entries,
            fallback: resolution.fallback,
            skipped_rules: Vec::new(),
        }
    }

    pub fn to_preview(&self) -> Preview {
        Preview {
            job_id: self.job_id.clone(),
            template: self.template.clone(),
            entries: self.preview.clone(),
            fallback: self.fallback.as_ref().map(|e| e.to_string()),
        }
    }
}

/// At most one batch per actor.
#[derive(Debug, Default)]
pub struct BatchRegistry {
    batches: Mutex<HashMap<String, StagedBatch>>,
}

impl BatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a batch, returning the one it supersedes.
    pub fn stage(&self, batch: StagedBatch) -> Option<StagedBatch> {
        let mut guard = self.lock();
        guard.insert(batch.actor_id.clone(), batch)
    }

    pub fn get(&self, actor_id: &str) -> Option<StagedBatch> {
        self.lock().get(actor_id).cloned()
    }

    /// Removes and returns the actor's batch.
    pub fn take(&self, actor_id: &str) -> Option<StagedBatch> {
        self.lock().remove(actor_id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StagedBatch>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
