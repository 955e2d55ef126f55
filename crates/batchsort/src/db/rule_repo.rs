//! Custom rule repository.

use chrono::Utc;
use rusqlite::{params, Row};

use super::{format_timestamp, parse_timestamp, Database, DatabaseError};
use crate::categorizer::{CustomRule, NewRule};

const COLUMNS: &str = "id, owner_id, name, rule_type, match_value, target_folder, enabled, created_at";

fn rule_from_row(row: &Row<'_>) -> Result<CustomRule, rusqlite::Error> {
    let created_at: String = row.get(7)?;
    Ok(CustomRule {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        rule_type: row.get(3)?,
        match_value: row.get(4)?,
        target_folder: row.get(5)?,
        enabled: row.get(6)?,
        created_at: parse_timestamp(7, &created_at)?,
    })
}

/// Inserts a rule for `owner_id` and returns the stored row.
pub fn insert(db: &Database, owner_id: &str, rule: &NewRule) -> Result<CustomRule, DatabaseError> {
    let created_at = Utc::now();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO custom_rules (owner_id, name, rule_type, match_value, target_folder, enabled, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                owner_id,
                rule.name,
                rule.rule_type.as_str(),
                rule.match_value,
                rule.target_folder.trim(),
                rule.enabled,
                format_timestamp(&created_at),
            ],
        )?;
        Ok(CustomRule {
            id: conn.last_insert_rowid(),
            owner_id: owner_id.to_string(),
            name: rule.name.clone(),
            rule_type: rule.rule_type.as_str().to_string(),
            match_value: rule.match_value.clone(),
            target_folder: rule.target_folder.trim().to_string(),
            enabled: rule.enabled,
            created_at,
        })
    })
}

/// All rules of an owner in evaluation order (oldest first, then id).
pub fn list_for_owner(db: &Database, owner_id: &str) -> Result<Vec<CustomRule>, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!(
            "SELECT {} FROM custom_rules WHERE owner_id = ?1 ORDER BY created_at ASC, id ASC",
            COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rules = stmt
            .query_map(params![owner_id], rule_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules)
    })
}

/// Toggles a rule. Returns `false` when the owner has no such rule.
pub fn set_enabled(
    db: &Database,
    owner_id: &str,
    rule_id: i64,
    enabled: bool,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE custom_rules SET enabled = ?3 WHERE id = ?1 AND owner_id = ?2",
            params![rule_id, owner_id, enabled],
        )?;
        Ok(changed > 0)
    })
}

pub fn delete(db: &Database, owner_id: &str, rule_id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute(
            "DELETE FROM custom_rules WHERE id = ?1 AND owner_id = ?2",
            params![rule_id, owner_id],
        )?;
        Ok(deleted > 0)
    })
}
