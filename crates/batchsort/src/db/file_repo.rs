//! File record repository.

use std::path::PathBuf;

use rusqlite::{params, Row};

use super::{format_timestamp, from_sql_count, parse_timestamp, to_sql_count};
use super::{Database, DatabaseError};
use crate::job::FileRecord;

fn record_from_row(row: &Row<'_>) -> Result<FileRecord, rusqlite::Error> {
    let source_path: String = row.get(5)?;
    let staged_path: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(FileRecord {
        job_id: row.get(0)?,
        original_name: row.get(1)?,
        new_name: row.get(2)?,
        category: row.get(3)?,
        size: from_sql_count(4, row.get(4)?)?,
        source_path: PathBuf::from(source_path),
        staged_path: staged_path.map(PathBuf::from),
        created_at: parse_timestamp(7, &created_at)?,
    })
}

/// Inserts one record. Fails if the job already has a record with the
/// same category and name.
pub fn insert(db: &Database, record: &FileRecord) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO file_records (job_id, original_name, new_name, category, size,
             source_path, staged_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.job_id,
                record.original_name,
                record.new_name,
                record.category,
                to_sql_count(record.size),
                record.source_path.to_string_lossy().into_owned(),
                record
                    .staged_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
                format_timestamp(&record.created_at),
            ],
        )?;
        Ok(())
    })
}

/// Records of a job in insertion order.
pub fn list_for_job(db: &Database, job_id: &str) -> Result<Vec<FileRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT job_id, original_name, new_name, category, size, source_path, staged_path, created_at
             FROM file_records WHERE job_id = ?1 ORDER BY id ASC",
        )?;
        let records = stmt
            .query_map(params![job_id], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    })
}
