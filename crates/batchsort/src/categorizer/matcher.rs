use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::extensions::default_category;
use super::rule::{validate_target, CustomRule, RuleMatcher};

/// What the classifier knows about a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            modified: None,
        }
    }

    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub category: String,
    /// The rule that decided the category, `None` for the extension table.
    pub rule_id: Option<i64>,
}

/// A rule that could not be compiled and is ignored for classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRule {
    pub rule_id: i64,
    pub name: String,
    pub reason: String,
}

struct CompiledRule {
    id: i64,
    target: String,
    matcher: RuleMatcher,
}

pub struct Categorizer {
    /// Enabled rules in evaluation order: oldest first, then by id.
    rules: Vec<CompiledRule>,
    skipped: Vec<SkippedRule>,
}

impl Categorizer {
    pub fn new(rules: &[CustomRule]) -> Self {
        Self::at(rules, Utc::now())
    }

    /// Builds a categorizer whose relative date rules are anchored at `now`.
    pub fn at(rules: &[CustomRule], now: DateTime<Utc>) -> Self {
        let mut enabled: Vec<&CustomRule> = rules.iter().filter(|r| r.enabled).collect();
        enabled.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut compiled = Vec::with_capacity(enabled.len());
        let mut skipped = Vec::new();

        for rule in enabled {
            let result = validate_target(&rule.target_folder)
                .and_then(|_| RuleMatcher::compile(&rule.rule_type, &rule.match_value, now));

            match result {
                Ok(matcher) => compiled.push(CompiledRule {
                    id: rule.id,
                    target: rule.target_folder.trim().to_string(),
                    matcher,
                }),
                Err(e) => {
                    warn!(rule_id = rule.id, rule = %rule.name, "Skipping malformed rule: {}", e);
                    skipped.push(SkippedRule {
                        rule_id: rule.id,
                        name: rule.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Self {
            rules: compiled,
            skipped,
        }
    }

    pub fn classify(&self, file: &FileDescriptor) -> Classification {
        // First matching rule wins
        for rule in &self.rules {
            if rule.matcher.matches(file) {
                return Classification {
                    category: rule.target.clone(),
                    rule_id: Some(rule.id),
                };
            }
        }

        Classification {
            category: default_category(&file.name).to_string(),
            rule_id: None,
        }
    }

    pub fn skipped(&self) -> &[SkippedRule] {
        &self.skipped
    }

    /// Number of rules that take part in classification.
    pub fn active_rules(&self) -> usize {
        self.rules.len()
    }
}
