use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, warn};

use crate::batch::{BatchRegistry, Preview, StagedBatch, StagedItem, Submission};
use crate::categorizer::{Categorizer, CustomRule, FileDescriptor, NewRule};
use crate::config::{ArchiveFailurePolicy, Config};
use crate::db::{Database, DatabaseError};
use crate::download::ArchiveDownload;
use crate::error::{DownloadError, StorageError};
use crate::job::{FileRecord, Job, JobStatus};
use crate::sanitize;
use crate::stats::{Dashboard, StatsAggregator, DASHBOARD_RECENT_JOBS};
use crate::storage::{ArchiveBuilder, FileStorage};
use crate::store::{JobStore, ProfileStore, RuleStore};
use crate::workspace::{ensure_directory, Workspace};

use super::config::OrganizerConfig;
use super::context::{OrganizeContext, OrganizeReport};
use super::error::{PipelineError, PipelineWarning};
use super::progress::{NoopProgress, OrganizePhase, ProgressEvent, ProgressReporter};

/// Drives a batch from submission to a terminal job.
///
/// Holds at most one staged batch per actor between `ingest` and
/// `organize`.
pub struct Organizer<S> {
    config: Arc<OrganizerConfig>,
    workspace: Workspace,
    store: S,
    batches: BatchRegistry,
    archiver: ArchiveBuilder,
    progress: Arc<dyn ProgressReporter>,
}

impl Organizer<Database> {
    /// Production constructor: opens the configured database.
    pub fn open(config: &Config) -> Result<Self, DatabaseError> {
        let db = Database::open(&config.database_path())?;
        Ok(Self::new(Arc::new(OrganizerConfig::from_config(config)), db))
    }
}

impl<S: JobStore + RuleStore + ProfileStore> Organizer<S> {
    pub fn new(config: Arc<OrganizerConfig>, store: S) -> Self {
        let workspace = Workspace::new(&config.data_root);
        let archiver = ArchiveBuilder::new(config.compression_level);
        Self {
            config,
            workspace,
            store,
            batches: BatchRegistry::new(),
            archiver,
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn batches(&self) -> &BatchRegistry {
        &self.batches
    }

    /// Accepts a submission: creates a pending job, writes the uploads,
    /// classifies them and stages the batch for `organize`.
    ///
    /// A batch staged earlier by the same actor is superseded.
    pub fn ingest(&self, actor_id: &str, submission: Submission) -> Result<Preview, PipelineError> {
        if submission.files.is_empty() {
            return Err(PipelineError::EmptySubmission);
        }

        let template = match submission.template.trim() {
            "" => self.config.default_template.clone(),
            template => template.to_string(),
        };
        let job = Job::new(
            actor_id,
            &submission.display_name,
            submission.files.len() as u64,
            submission.declared_bytes(),
        );

        let _span = info_span!("ingest",
            job_id = %job.id,
            actor_id = %actor_id,
            files = submission.files.len(),
        )
        .entered();
        self.progress.report(ProgressEvent::Phase {
            job_id: job.id.clone(),
            phase: OrganizePhase::Ingesting,
        });

        let upload_dir = self
            .workspace
            .for_actor(actor_id)
            .and_then(|ws| ws.upload_dir(&job.id))
            .map_err(|e| setup_failure(&job.id, e))?;
        let rules = self.store.rules(actor_id)?;
        let categorizer = Categorizer::new(&rules);

        self.store.insert_job(&job)?;

        let items = match self.step_store_uploads(&upload_dir, &categorizer, submission) {
            Ok(items) => items,
            Err(e) => {
                warn!("Discarding job after upload failure: {}", e);
                self.discard_ingest(&job.id, &upload_dir);
                return Err(setup_failure(&job.id, e));
            }
        };

        let mut batch = StagedBatch::new(actor_id, &job.id, &template, items);
        batch.skipped_rules = categorizer.skipped().to_vec();
        if let Some(reason) = &batch.fallback {
            warn!(template = %template, "Using fallback naming: {}", reason);
        }

        let preview = batch.to_preview();
        if let Some(previous) = self.batches.stage(batch) {
            debug!(previous_job_id = %previous.job_id, "Superseded staged batch");
        }

        info!(entries = preview.entries.len(), "Batch staged");
        Ok(preview)
    }

    /// The preview of the actor's staged batch.
    pub fn preview(&self, actor_id: &str) -> Result<Preview, PipelineError> {
        self.batches
            .get(actor_id)
            .map(|batch| batch.to_preview())
            .ok_or_else(|| PipelineError::MissingStagedBatch {
                actor_id: actor_id.to_string(),
            })
    }

    /// Stages the actor's batch, builds the archive and finalizes the job.
    ///
    /// Individual files that cannot be staged are skipped and reported; a
    /// missing archive is handled per `ArchiveFailurePolicy`. The staged
    /// batch is consumed on every path.
    pub fn organize(&self, actor_id: &str) -> Result<OrganizeReport, PipelineError> {
        let batch = self
            .batches
            .take(actor_id)
            .filter(|batch| !batch.preview.is_empty())
            .ok_or_else(|| PipelineError::MissingStagedBatch {
                actor_id: actor_id.to_string(),
            })?;

        let _span = info_span!("organize",
            job_id = %batch.job_id,
            actor_id = %actor_id,
        )
        .entered();

        let mut job = match self.store.find_job(&batch.job_id)? {
            Some(job) if job.owner_id == actor_id => job,
            _ => {
                return Err(PipelineError::PipelineSetupFailure {
                    job_id: batch.job_id.clone(),
                    reason: "job does not exist for this actor".to_string(),
                });
            }
        };

        job.begin_processing()
            .map_err(|e| setup_failure(&job.id, e))?;
        match self.store.mark_processing(&job.id) {
            Ok(()) => {}
            Err(e @ DatabaseError::StaleJob { .. }) => return Err(setup_failure(&job.id, e)),
            Err(e) => return Err(e.into()),
        }

        let dirs = match self.resolve_job_dirs(actor_id, &job.id) {
            Ok(dirs) => dirs,
            Err(e) => {
                warn!("Workspace unavailable: {}", e);
                job.fail(0, Utc::now())?;
                self.store.finalize_job(&job)?;
                self.progress.report(ProgressEvent::Failed {
                    job_id: job.id.clone(),
                    error: e.to_string(),
                });
                return Err(setup_failure(&job.id, e));
            }
        };
        let (upload_dir, staging_dir, archive_path) = dirs;

        let mut ctx = OrganizeContext::new(job, batch, upload_dir, staging_dir, archive_path);
        self.collect_batch_warnings(&mut ctx);

        // Step 1: Copy each upload into the category tree
        {
            let _step = info_span!("stage_files").entered();
            self.progress.report(ProgressEvent::Phase {
                job_id: ctx.job.id.clone(),
                phase: OrganizePhase::Staging,
            });
            self.step_stage_files(&mut ctx);
        }

        // Step 2: Archive whatever was staged
        {
            let _step = info_span!("build_archive").entered();
            self.progress.report(ProgressEvent::Phase {
                job_id: ctx.job.id.clone(),
                phase: OrganizePhase::Archiving,
            });
            self.step_build_archive(&mut ctx);
        }

        // Step 3: Terminal state, persisted once
        {
            let _step = info_span!("finalize").entered();
            self.progress.report(ProgressEvent::Phase {
                job_id: ctx.job.id.clone(),
                phase: OrganizePhase::Finalizing,
            });
            self.step_finalize(&mut ctx, Utc::now())?;
        }

        Ok(ctx.into_report())
    }

    /// A job of the actor together with its file records.
    pub fn job_detail(
        &self,
        actor_id: &str,
        job_id: &str,
    ) -> Result<(Job, Vec<FileRecord>), PipelineError> {
        let job = self
            .owned_job(actor_id, job_id)?
            .ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))?;
        let records = self.store.file_records(&job.id)?;
        Ok((job, records))
    }

    pub fn dashboard(&self, actor_id: &str) -> Result<Dashboard, PipelineError> {
        let totals = self.store.job_totals(actor_id)?;
        // Zero increment: creates the profile on first access, changes nothing after.
        let profile = self.store.increment_profile(actor_id, 0, 0)?;
        let recent =
            self.store
                .recent_jobs(actor_id, Some(JobStatus::Completed), DASHBOARD_RECENT_JOBS)?;
        Ok(Dashboard::new(totals, profile, recent))
    }

    pub fn download(&self, actor_id: &str, job_id: &str) -> Result<ArchiveDownload, DownloadError> {
        let job = self
            .owned_job(actor_id, job_id)?
            .ok_or_else(|| DownloadError::JobNotFound(job_id.to_string()))?;
        if job.status != JobStatus::Completed {
            return Err(DownloadError::NotAvailable(job.id));
        }
        ArchiveDownload::for_job(&job)
    }

    /// Validates and stores a rule. Malformed rules are rejected here, so
    /// only rules written directly to the store can be skipped later.
    pub fn add_rule(&self, actor_id: &str, rule: NewRule) -> Result<CustomRule, PipelineError> {
        rule.validate()?;
        let stored = self.store.add_rule(actor_id, &rule)?;
        info!(actor_id = %actor_id, rule_id = stored.id, rule_type = %rule.rule_type, "Rule added");
        Ok(stored)
    }

    pub fn rules(&self, actor_id: &str) -> Result<Vec<CustomRule>, PipelineError> {
        Ok(self.store.rules(actor_id)?)
    }

    pub fn set_rule_enabled(
        &self,
        actor_id: &str,
        rule_id: i64,
        enabled: bool,
    ) -> Result<bool, PipelineError> {
        Ok(self.store.set_rule_enabled(actor_id, rule_id, enabled)?)
    }

    pub fn delete_rule(&self, actor_id: &str, rule_id: i64) -> Result<bool, PipelineError> {
        Ok(self.store.delete_rule(actor_id, rule_id)?)
    }

    fn owned_job(&self, actor_id: &str, job_id: &str) -> Result<Option<Job>, DatabaseError> {
        Ok(self
            .store
            .find_job(job_id)?
            .filter(|job| job.owner_id == actor_id))
    }

    fn step_store_uploads(
        &self,
        upload_dir: &Path,
        categorizer: &Categorizer,
        submission: Submission,
    ) -> Result<Vec<StagedItem>, StorageError> {
        let storage = FileStorage::new(upload_dir);
        let mut items = Vec::with_capacity(submission.files.len());

        for mut file in submission.files {
            let original_name = sanitize::upload_file_name(&file.original_name);
            let (path, written) = storage.store_upload(&original_name, file.content.as_mut())?;
            if written != file.size {
                debug!(
                    file = %original_name,
                    declared = file.size,
                    written,
                    "Upload size differs from declared size"
                );
            }

            let mut descriptor = FileDescriptor::new(original_name.as_str(), written);
            if let Some(modified) = file.modified.or_else(|| modified_time(&path)) {
                descriptor = descriptor.with_modified(modified);
            }
            let classification = categorizer.classify(&descriptor);

            items.push(StagedItem {
                upload_name: sanitize::redact_path(&path),
                original_name,
                category: classification.category,
                size: written,
            });
        }

        Ok(items)
    }

    fn discard_ingest(&self, job_id: &str, upload_dir: &Path) {
        if let Err(e) = self.store.delete_job(job_id) {
            warn!(job_id = %job_id, "Failed to delete job record: {}", e);
        }
        if let Err(e) = std::fs::remove_dir_all(upload_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(job_id = %job_id, "Failed to remove upload directory: {}", e);
            }
        }
    }

    fn resolve_job_dirs(
        &self,
        actor_id: &str,
        job_id: &str,
    ) -> Result<(PathBuf, PathBuf, PathBuf), StorageError> {
        let ws = self.workspace.for_actor(actor_id)?;
        let upload_dir = ws.upload_dir(job_id)?;
        let staging_dir = ws.staging_dir(job_id)?;
        let archive_path = ws.archive_path(job_id)?;
        ensure_directory(&staging_dir)?;
        Ok((upload_dir, staging_dir, archive_path))
    }

    fn collect_batch_warnings(&self, ctx: &mut OrganizeContext) {
        if let Some(reason) = &ctx.batch.fallback {
            ctx.warnings.push(PipelineWarning::MalformedTemplate {
                template: ctx.batch.template.clone(),
                reason: reason.to_string(),
            });
        }
        for skipped in &ctx.batch.skipped_rules {
            ctx.warnings.push(PipelineWarning::MalformedRule {
                rule_id: skipped.rule_id,
                name: skipped.name.clone(),
                reason: skipped.reason.clone(),
            });
        }
    }

    fn step_stage_files(&self, ctx: &mut OrganizeContext) {
        let storage = FileStorage::new(&ctx.staging_dir);

        for entry in &ctx.batch.preview {
            let source = ctx.upload_dir.join(&entry.upload_name);

            let staged_path = match storage.stage(&source, &entry.category, &entry.new_name) {
                Ok(path) => path,
                Err(StorageError::SourceMissing(path)) => {
                    warn!(file = %entry.original_name, "Source file missing, skipping");
                    ctx.outcome.missing += 1;
                    ctx.warnings.push(PipelineWarning::SourceFileMissing {
                        original_name: entry.original_name.clone(),
                        path,
                    });
                    self.report_skipped(&ctx.job.id, entry.index, &entry.original_name, "source missing");
                    continue;
                }
                Err(e) => {
                    warn!(file = %entry.original_name, "Failed to stage file: {}", e);
                    ctx.outcome.failed += 1;
                    ctx.warnings.push(PipelineWarning::CopyFailed {
                        original_name: entry.original_name.clone(),
                        error: e.to_string(),
                    });
                    self.report_skipped(&ctx.job.id, entry.index, &entry.original_name, &e.to_string());
                    continue;
                }
            };

            let record = FileRecord {
                job_id: ctx.job.id.clone(),
                original_name: entry.original_name.clone(),
                new_name: entry.new_name.clone(),
                category: entry.category.clone(),
                size: entry.size,
                source_path: source,
                staged_path: Some(staged_path.clone()),
                created_at: Utc::now(),
            };

            if let Err(e) = self.store.insert_file_record(&record) {
                warn!(file = %entry.original_name, "Failed to record staged file: {}", e);
                // An unrecorded file must not end up in the archive either.
                if let Err(remove_err) = std::fs::remove_file(&staged_path) {
                    warn!(
                        file = %sanitize::redact_path(&staged_path),
                        "Failed to remove unrecorded staged file: {}", remove_err
                    );
                }
                ctx.outcome.failed += 1;
                ctx.warnings.push(PipelineWarning::RecordFailed {
                    original_name: entry.original_name.clone(),
                    error: e.to_string(),
                });
                self.report_skipped(&ctx.job.id, entry.index, &entry.original_name, &e.to_string());
                continue;
            }

            debug!(
                "Staged {} -> {}/{}",
                entry.original_name, entry.category, entry.new_name
            );
            ctx.outcome.staged += 1;
            self.progress.report(ProgressEvent::FileStaged {
                job_id: ctx.job.id.clone(),
                index: entry.index,
                category: entry.category.clone(),
                new_name: entry.new_name.clone(),
            });
        }
    }

    fn step_build_archive(&self, ctx: &mut OrganizeContext) {
        match self.archiver.build(&ctx.staging_dir, &ctx.archive_path) {
            Ok(outcome) => {
                for failure in &outcome.errors {
                    ctx.warnings.push(PipelineWarning::ArchiveEntryFailed {
                        entry: failure.entry.clone(),
                        reason: failure.reason.clone(),
                    });
                }
                debug!(
                    entries = outcome.written_entries.len(),
                    size_bytes = outcome.size_bytes,
                    "Archive built"
                );
                ctx.outcome.archive = Some(outcome);
            }
            Err(e) => {
                warn!("Archive build failed: {}", e);
                ctx.warnings.push(PipelineWarning::ArchiveCreateFailure {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn step_finalize(
        &self,
        ctx: &mut OrganizeContext,
        now: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        let processed = ctx.outcome.staged as u64;
        let archive_path = ctx
            .outcome
            .archive
            .as_ref()
            .map(|archive| archive.archive_path.clone());

        match (archive_path, self.config.on_archive_failure) {
            (Some(path), _) => ctx.job.complete(processed, Some(path), now)?,
            (None, ArchiveFailurePolicy::Complete) => ctx.job.complete(processed, None, now)?,
            (None, ArchiveFailurePolicy::Fail) => ctx.job.fail(processed, now)?,
        }

        self.store.finalize_job(&ctx.job)?;

        if ctx.job.status == JobStatus::Completed {
            if let Err(e) = StatsAggregator::record_completion(&self.store, &ctx.job) {
                warn!("Failed to update profile counters: {}", e);
                ctx.warnings.push(PipelineWarning::StatsUpdateFailed {
                    reason: e.to_string(),
                });
            }
            self.progress.report(ProgressEvent::Completed {
                job_id: ctx.job.id.clone(),
                processed,
                archive_path: ctx.job.archive_path.clone(),
            });
        } else {
            self.progress.report(ProgressEvent::Failed {
                job_id: ctx.job.id.clone(),
                error: "archive could not be built".to_string(),
            });
        }

        info!(
            status = %ctx.job.status,
            processed,
            declared = ctx.job.declared_files,
            warnings = ctx.warnings.len(),
            "Job finalized"
        );
        Ok(())
    }

    fn report_skipped(&self, job_id: &str, index: usize, original_name: &str, reason: &str) {
        self.progress.report(ProgressEvent::FileSkipped {
            job_id: job_id.to_string(),
            index,
            original_name: original_name.to_string(),
            reason: reason.to_string(),
        });
    }
}

fn setup_failure(job_id: &str, reason: impl std::fmt::Display) -> PipelineError {
    PipelineError::PipelineSetupFailure {
        job_id: job_id.to_string(),
        reason: reason.to_string(),
    }
}

fn modified_time(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}
