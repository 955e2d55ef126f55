//! Actor-defined classification rules and their compiled matchers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::matcher::FileDescriptor;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Unknown rule type '{0}'")]
    UnknownType(String),

    #[error("Extension list is empty")]
    EmptyExtensions,

    #[error("Invalid size range '{value}': {reason}")]
    InvalidSize { value: String, reason: String },

    #[error("Invalid name pattern '{value}': {reason}")]
    InvalidPattern { value: String, reason: String },

    #[error("Invalid date predicate '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("Invalid target folder '{0}'")]
    InvalidTarget(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleType {
    Extension,
    Size,
    NamePattern,
    ModifiedDate,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Extension => "extension",
            RuleType::Size => "size",
            RuleType::NamePattern => "name-pattern",
            RuleType::ModifiedDate => "modified-date",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extension" => Ok(RuleType::Extension),
            "size" => Ok(RuleType::Size),
            // "name" and "date" are the older spellings
            "name-pattern" | "name" => Ok(RuleType::NamePattern),
            "modified-date" | "date" => Ok(RuleType::ModifiedDate),
            other => Err(RuleError::UnknownType(other.to_string())),
        }
    }
}

/// A stored custom rule. `rule_type` stays a raw string so a row with an
/// unknown type can still be loaded and then skipped at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRule {
    pub id: i64,
    pub owner_id: String,
    pub name: String,
    pub rule_type: String,
    pub match_value: String,
    pub target_folder: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRule {
    pub name: String,
    pub rule_type: RuleType,
    pub match_value: String,
    pub target_folder: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl NewRule {
    /// Checks that the rule would compile and that its target is usable.
    pub fn validate(&self) -> Result<(), RuleError> {
        validate_target(&self.target_folder)?;
        RuleMatcher::compile(self.rule_type.as_str(), &self.match_value, Utc::now())?;
        Ok(())
    }
}

/// One compiled predicate per rule type.
#[derive(Debug, Clone)]
pub enum RuleMatcher {
    /// Lowercased suffixes, each starting with a dot.
    Extension(Vec<String>),
    /// Inclusive byte range; `None` means unbounded on that side.
    Size { min: Option<u64>, max: Option<u64> },
    NamePattern(Regex),
    /// Half-open window `[start, end)` on the modification time.
    ModifiedDate {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

impl RuleMatcher {
    /// Compiles a rule's match value. `now` anchors relative date predicates.
    pub fn compile(
        rule_type: &str,
        match_value: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, RuleError> {
        match rule_type.parse::<RuleType>()? {
            RuleType::Extension => parse_extensions(match_value),
            RuleType::Size => parse_size_range(match_value),
            RuleType::NamePattern => Regex::new(match_value)
                .map(RuleMatcher::NamePattern)
                .map_err(|e| RuleError::InvalidPattern {
                    value: match_value.to_string(),
                    reason: e.to_string(),
                }),
            RuleType::ModifiedDate => parse_date_predicate(match_value, now),
        }
    }

    pub fn matches(&self, file: &FileDescriptor) -> bool {
        match self {
            RuleMatcher::Extension(suffixes) => {
                let name = file.name.to_lowercase();
                suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
            }
            RuleMatcher::Size { min, max } => {
                min.map_or(true, |min| file.size >= min) && max.map_or(true, |max| file.size <= max)
            }
            RuleMatcher::NamePattern(regex) => regex.is_match(&file.name),
            RuleMatcher::ModifiedDate { start, end } => match file.modified {
                Some(modified) => {
                    start.map_or(true, |start| modified >= start)
                        && end.map_or(true, |end| modified < end)
                }
                None => false,
            },
        }
    }
}

fn parse_extensions(value: &str) -> Result<RuleMatcher, RuleError> {
    let suffixes: Vec<String> = value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|part| part.trim().trim_start_matches('.'))
        .filter(|part| !part.is_empty())
        .map(|part| format!(".{}", part.to_lowercase()))
        .collect();

    if suffixes.is_empty() {
        return Err(RuleError::EmptyExtensions);
    }
    Ok(RuleMatcher::Extension(suffixes))
}

fn parse_size_range(value: &str) -> Result<RuleMatcher, RuleError> {
    let invalid = |reason: &str| RuleError::InvalidSize {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    let (min, max) = match trimmed.split_once('-') {
        Some((lo, hi)) => (parse_bound(lo, value)?, parse_bound(hi, value)?),
        None => {
            let exact = parse_bound(trimmed, value)?;
            (exact, exact)
        }
    };

    match (min, max) {
        (None, None) => Err(invalid("at least one bound is required")),
        (Some(lo), Some(hi)) if lo > hi => Err(invalid("minimum exceeds maximum")),
        _ => Ok(RuleMatcher::Size { min, max }),
    }
}

/// Parses `500`, `10KB`, `2 mb`, ... Empty input is an open bound.
fn parse_bound(raw: &str, original: &str) -> Result<Option<u64>, RuleError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let invalid = |reason: String| RuleError::InvalidSize {
        value: original.to_string(),
        reason,
    };

    let number: u64 = digits
        .parse()
        .map_err(|_| invalid(format!("'{}' is not a byte count", raw)))?;
    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1024,
        "MB" | "M" => 1024 * 1024,
        "GB" | "G" => 1024 * 1024 * 1024,
        other => return Err(invalid(format!("unknown unit '{}'", other))),
    };

    number
        .checked_mul(multiplier)
        .map(Some)
        .ok_or_else(|| invalid("size overflows".to_string()))
}

fn parse_date_predicate(value: &str, now: DateTime<Utc>) -> Result<RuleMatcher, RuleError> {
    let invalid = |reason: &str| RuleError::InvalidDate {
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let trimmed = value.trim();

    if let Some((from, to)) = trimmed.split_once("..") {
        let start = day_start(parse_day(from, value)?, value)?;
        let end = day_start(next_day(parse_day(to, value)?, value)?, value)?;
        if start >= end {
            return Err(invalid("range start is after its end"));
        }
        return Ok(RuleMatcher::ModifiedDate {
            start: Some(start),
            end: Some(end),
        });
    }

    let (op, operand) = if let Some(rest) = trimmed.strip_prefix(">=") {
        (">=", rest)
    } else if let Some(rest) = trimmed.strip_prefix("<=") {
        ("<=", rest)
    } else if let Some(rest) = trimmed.strip_prefix('>') {
        (">", rest)
    } else if let Some(rest) = trimmed.strip_prefix('<') {
        ("<", rest)
    } else {
        ("=", trimmed)
    };
    let operand = operand.trim();

    if let Some(age) = parse_relative(operand) {
        let cutoff = now
            .checked_sub_signed(age)
            .ok_or_else(|| invalid("relative age is out of range"))?;
        return match op {
            // modified within the last N units
            "<" | "<=" => Ok(RuleMatcher::ModifiedDate {
                start: Some(cutoff),
                end: None,
            }),
            // modified more than N units ago
            ">" | ">=" => Ok(RuleMatcher::ModifiedDate {
                start: None,
                end: Some(cutoff),
            }),
            _ => Err(invalid("relative ages need a '<' or '>' operator")),
        };
    }

    let day = parse_day(operand, value)?;
    let (start, end) = match op {
        ">=" => (Some(day_start(day, value)?), None),
        ">" => (Some(day_start(next_day(day, value)?, value)?), None),
        "<=" => (None, Some(day_start(next_day(day, value)?, value)?)),
        "<" => (None, Some(day_start(day, value)?)),
        _ => (
            Some(day_start(day, value)?),
            Some(day_start(next_day(day, value)?, value)?),
        ),
    };
    Ok(RuleMatcher::ModifiedDate { start, end })
}

/// `7d`, `2w`, `12h`.
fn parse_relative(operand: &str) -> Option<TimeDelta> {
    let unit = operand.chars().last()?;
    let amount: i64 = operand[..operand.len() - unit.len_utf8()].parse().ok()?;
    match unit.to_ascii_lowercase() {
        'h' => TimeDelta::try_hours(amount),
        'd' => TimeDelta::try_days(amount),
        'w' => TimeDelta::try_weeks(amount),
        _ => None,
    }
}

fn parse_day(raw: &str, original: &str) -> Result<NaiveDate, RuleError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| RuleError::InvalidDate {
        value: original.to_string(),
        reason: e.to_string(),
    })
}

fn next_day(day: NaiveDate, original: &str) -> Result<NaiveDate, RuleError> {
    day.succ_opt().ok_or_else(|| RuleError::InvalidDate {
        value: original.to_string(),
        reason: "date is out of range".to_string(),
    })
}

fn day_start(day: NaiveDate, original: &str) -> Result<DateTime<Utc>, RuleError> {
    day.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| RuleError::InvalidDate {
            value: original.to_string(),
            reason: "date is out of range".to_string(),
        })
}

/// Target folders become directory names under the staging tree.
pub(crate) fn validate_target(target: &str) -> Result<(), RuleError> {
    let target = target.trim();
    if target.is_empty()
        || target == "."
        || target == ".."
        || target.contains('/')
        || target.contains('\\')
    {
        return Err(RuleError::InvalidTarget(target.to_string()));
    }
    Ok(())
}
