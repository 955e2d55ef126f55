//! Persistence seams used by the organizer.
//!
//! `Database` implements all three traits; tests may substitute their own.

use crate::categorizer::{CustomRule, NewRule};
use crate::db::job_repo::{self, JobFilter, JobTotals};
use crate::db::{file_repo, profile_repo, rule_repo, Database, DatabaseError};
use crate::job::{FileRecord, Job, JobStatus};
use crate::stats::ActorProfile;

pub trait JobStore: Send + Sync {
    fn insert_job(&self, job: &Job) -> Result<(), DatabaseError>;
    fn find_job(&self, job_id: &str) -> Result<Option<Job>, DatabaseError>;
    /// pending -> processing; `StaleJob` if the stored job is not pending.
    fn mark_processing(&self, job_id: &str) -> Result<(), DatabaseError>;
    /// Persists terminal fields; `StaleJob` if the stored job is not processing.
    fn finalize_job(&self, job: &Job) -> Result<(), DatabaseError>;
    fn delete_job(&self, job_id: &str) -> Result<bool, DatabaseError>;
    fn insert_file_record(&self, record: &FileRecord) -> Result<(), DatabaseError>;
    fn file_records(&self, job_id: &str) -> Result<Vec<FileRecord>, DatabaseError>;
    /// Newest first.
    fn recent_jobs(
        &self,
        owner_id: &str,
        status: Option<JobStatus>,
        limit: u64,
    ) -> Result<Vec<Job>, DatabaseError>;
    fn job_totals(&self, owner_id: &str) -> Result<JobTotals, DatabaseError>;
}

pub trait RuleStore: Send + Sync {
    fn add_rule(&self, owner_id: &str, rule: &NewRule) -> Result<CustomRule, DatabaseError>;
    /// All of the owner's rules, enabled or not, oldest first.
    fn rules(&self, owner_id: &str) -> Result<Vec<CustomRule>, DatabaseError>;
    fn set_rule_enabled(
        &self,
        owner_id: &str,
        rule_id: i64,
        enabled: bool,
    ) -> Result<bool, DatabaseError>;
    fn delete_rule(&self, owner_id: &str, rule_id: i64) -> Result<bool, DatabaseError>;
}

pub trait ProfileStore: Send + Sync {
    fn profile(&self, actor_id: &str) -> Result<Option<ActorProfile>, DatabaseError>;
    /// Atomically adds to the actor's counters and returns the new values.
    fn increment_profile(
        &self,
        actor_id: &str,
        files: u64,
        bytes: u64,
    ) -> Result<ActorProfile, DatabaseError>;
}

impl JobStore for Database {
    fn insert_job(&self, job: &Job) -> Result<(), DatabaseError> {
        job_repo::insert(self, job)
    }

    fn find_job(&self, job_id: &str) -> Result<Option<Job>, DatabaseError> {
        job_repo::find_by_id(self, job_id)
    }

    fn mark_processing(&self, job_id: &str) -> Result<(), DatabaseError> {
        job_repo::mark_processing(self, job_id)
    }

    fn finalize_job(&self, job: &Job) -> Result<(), DatabaseError> {
        job_repo::finalize(self, job)
    }

    fn delete_job(&self, job_id: &str) -> Result<bool, DatabaseError> {
        job_repo::delete(self, job_id)
    }

    fn insert_file_record(&self, record: &FileRecord) -> Result<(), DatabaseError> {
        file_repo::insert(self, record)
    }

    fn file_records(&self, job_id: &str) -> Result<Vec<FileRecord>, DatabaseError> {
        file_repo::list_for_job(self, job_id)
    }

    fn recent_jobs(
        &self,
        owner_id: &str,
        status: Option<JobStatus>,
        limit: u64,
    ) -> Result<Vec<Job>, DatabaseError> {
        let filter = JobFilter {
            owner_id: Some(owner_id.to_string()),
            status,
            limit: Some(limit),
            offset: None,
        };
        job_repo::query(self, &filter).map(|(jobs, _)| jobs)
    }

    fn job_totals(&self, owner_id: &str) -> Result<JobTotals, DatabaseError> {
        job_repo::totals_for_owner(self, owner_id)
    }
}

impl RuleStore for Database {
    fn add_rule(&self, owner_id: &str, rule: &NewRule) -> Result<CustomRule, DatabaseError> {
        rule_repo::insert(self, owner_id, rule)
    }

    fn rules(&self, owner_id: &str) -> Result<Vec<CustomRule>, DatabaseError> {
        rule_repo::list_for_owner(self, owner_id)
    }

    fn set_rule_enabled(
        &self,
        owner_id: &str,
        rule_id: i64,
        enabled: bool,
    ) -> Result<bool, DatabaseError> {
        rule_repo::set_enabled(self, owner_id, rule_id, enabled)
    }

    fn delete_rule(&self, owner_id: &str, rule_id: i64) -> Result<bool, DatabaseError> {
        rule_repo::delete(self, owner_id, rule_id)
    }
}

impl ProfileStore for Database {
    fn profile(&self, actor_id: &str) -> Result<Option<ActorProfile>, DatabaseError> {
        profile_repo::find(self, actor_id)
    }

    fn increment_profile(
        &self,
        actor_id: &str,
        files: u64,
        bytes: u64,
    ) -> Result<ActorProfile, DatabaseError> {
        profile_repo::increment(self, actor_id, files, bytes)
    }
}
