//! Job repository: CRUD and guarded state updates for the `jobs` table.

use std::path::PathBuf;

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{format_timestamp, from_sql_count, parse_timestamp, to_sql_count};
use super::{Database, DatabaseError};
use crate::job::{Job, JobStatus};

const COLUMNS: &str = "id, owner_id, name, status, declared_files, processed_files, \
                       declared_bytes, created_at, completed_at, archive_path";

fn job_from_row(row: &Row<'_>) -> Result<Job, rusqlite::Error> {
    let status: String = row.get(3)?;
    let status = status.parse::<JobStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at: String = row.get(7)?;
    let completed_at: Option<String> = row.get(8)?;
    let archive_path: Option<String> = row.get(9)?;

    Ok(Job {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        status,
        declared_files: from_sql_count(4, row.get(4)?)?,
        processed_files: from_sql_count(5, row.get(5)?)?,
        declared_bytes: from_sql_count(6, row.get(6)?)?,
        created_at: parse_timestamp(7, &created_at)?,
        completed_at: completed_at
            .map(|raw| parse_timestamp(8, &raw))
            .transpose()?,
        archive_path: archive_path.map(PathBuf::from),
    })
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &Job) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, owner_id, name, status, declared_files, processed_files,
             declared_bytes, created_at, completed_at, archive_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job.id,
                job.owner_id,
                job.name,
                job.status.as_str(),
                to_sql_count(job.declared_files),
                to_sql_count(job.processed_files),
                to_sql_count(job.declared_bytes),
                format_timestamp(&job.created_at),
                job.completed_at.as_ref().map(format_timestamp),
                job.archive_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            ],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Job>, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!("SELECT {} FROM jobs WHERE id = ?1", COLUMNS);
        let job = conn
            .query_row(&sql, params![id], job_from_row)
            .optional()?;
        Ok(job)
    })
}

/// Query filter parameters for job listing.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub owner_id: Option<String>,
    pub status: Option<JobStatus>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Queries jobs newest first, returning (rows, total_count).
pub fn query(db: &Database, filter: &JobFilter) -> Result<(Vec<Job>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref owner_id) = filter.owner_id {
            conditions.push(format!("owner_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(owner_id.clone()));
        }
        if let Some(status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.as_str()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM jobs {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: i64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        let limit = to_sql_count(filter.limit.unwrap_or(100));
        let offset = to_sql_count(filter.offset.unwrap_or(0));
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT {} FROM jobs {} ORDER BY created_at DESC, id DESC LIMIT ?{} OFFSET ?{}",
            COLUMNS,
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<Job> = stmt
            .query_map(params_ref.as_slice(), job_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, from_sql_count(0, total)?))
    })
}

/// Moves a pending job to processing. Fails with `StaleJob` if the stored
/// row is not pending.
pub fn mark_processing(db: &Database, job_id: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET status = 'processing' WHERE id = ?1 AND status = 'pending'",
            params![job_id],
        )?;
        if changed == 0 {
            return Err(DatabaseError::StaleJob {
                job_id: job_id.to_string(),
                expected: JobStatus::Pending.to_string(),
            });
        }
        Ok(())
    })
}

/// Writes the terminal fields of a job in one statement. Only a job that
/// is still processing can be finalized.
pub fn finalize(db: &Database, job: &Job) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET status = ?2, processed_files = ?3, completed_at = ?4, archive_path = ?5
             WHERE id = ?1 AND status = 'processing'",
            params![
                job.id,
                job.status.as_str(),
                to_sql_count(job.processed_files),
                job.completed_at.as_ref().map(format_timestamp),
                job.archive_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::StaleJob {
                job_id: job.id.clone(),
                expected: JobStatus::Processing.to_string(),
            });
        }
        Ok(())
    })
}

/// Deletes a job; its file records go with it.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    })
}

/// Per-owner job totals for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTotals {
    pub total_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    /// Sum of declared files over all jobs, whatever their status.
    pub declared_files: u64,
    pub declared_bytes: u64,
}

pub fn totals_for_owner(db: &Database, owner_id: &str) -> Result<JobTotals, DatabaseError> {
    db.with_conn(|conn| {
        let totals = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(declared_files), 0),
                    CAST(MIN(TOTAL(declared_bytes), 9223372036854775807) AS INTEGER)
             FROM jobs WHERE owner_id = ?1",
            params![owner_id],
            |row| {
                Ok(JobTotals {
                    total_jobs: from_sql_count(0, row.get(0)?)?,
                    completed_jobs: from_sql_count(1, row.get(1)?)?,
                    failed_jobs: from_sql_count(2, row.get(2)?)?,
                    declared_files: from_sql_count(3, row.get(3)?)?,
                    declared_bytes: from_sql_count(4, row.get(4)?)?,
                })
            },
        )?;
        Ok(totals)
    })
}
