//! Actor profile repository: cumulative organize counters.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{format_timestamp, from_sql_count, parse_timestamp, to_sql_count};
use super::{Database, DatabaseError};
use crate::stats::ActorProfile;

fn profile_from_row(row: &Row<'_>) -> Result<ActorProfile, rusqlite::Error> {
    let created_at: String = row.get(3)?;
    Ok(ActorProfile {
        actor_id: row.get(0)?,
        files_organized: from_sql_count(1, row.get(1)?)?,
        bytes_saved: from_sql_count(2, row.get(2)?)?,
        created_at: parse_timestamp(3, &created_at)?,
    })
}

pub fn find(db: &Database, actor_id: &str) -> Result<Option<ActorProfile>, DatabaseError> {
    db.with_conn(|conn| {
        let profile = conn
            .query_row(
                "SELECT actor_id, files_organized, bytes_saved, created_at
                 FROM actor_profiles WHERE actor_id = ?1",
                params![actor_id],
                profile_from_row,
            )
            .optional()?;
        Ok(profile)
    })
}

/// Adds to an actor's counters, creating the profile on first use.
///
/// A single UPSERT, so concurrent completions for the same actor cannot
/// lose an update.
pub fn increment(
    db: &Database,
    actor_id: &str,
    files: u64,
    bytes: u64,
) -> Result<ActorProfile, DatabaseError> {
    db.with_conn(|conn| {
        let profile = conn.query_row(
            "INSERT INTO actor_profiles (actor_id, files_organized, bytes_saved, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(actor_id) DO UPDATE SET
               files_organized = CASE
                 WHEN files_organized > 9223372036854775807 - excluded.files_organized
                 THEN 9223372036854775807
                 ELSE files_organized + excluded.files_organized END,
               bytes_saved = CASE
                 WHEN bytes_saved > 9223372036854775807 - excluded.bytes_saved
                 THEN 9223372036854775807
                 ELSE bytes_saved + excluded.bytes_saved END
             RETURNING actor_id, files_organized, bytes_saved, created_at",
            params![
                actor_id,
                to_sql_count(files),
                to_sql_count(bytes),
                format_timestamp(&Utc::now()),
            ],
            profile_from_row,
        )?;
        Ok(profile)
    })
}
