//! Builders for rules and submissions used across the integration tests.

#![allow(dead_code)]

use batchsort::categorizer::{NewRule, RuleType};
use batchsort::{IncomingFile, Submission};

/// Builder for `NewRule` values.
pub struct RuleBuilder {
    name: String,
    rule_type: RuleType,
    match_value: String,
    target_folder: String,
    enabled: bool,
}

impl RuleBuilder {
    /// A rule with the given name that sends matches to `target_folder`.
    /// Defaults to an extension rule; call one of the matcher setters.
    pub fn new(name: &str, target_folder: &str) -> Self {
        Self {
            name: name.to_string(),
            rule_type: RuleType::Extension,
            match_value: String::new(),
            target_folder: target_folder.to_string(),
            enabled: true,
        }
    }

    pub fn extension(mut self, value: &str) -> Self {
        self.rule_type = RuleType::Extension;
        self.match_value = value.to_string();
        self
    }

    pub fn size(mut self, value: &str) -> Self {
        self.rule_type = RuleType::Size;
        self.match_value = value.to_string();
        self
    }

    pub fn name_pattern(mut self, value: &str) -> Self {
        self.rule_type = RuleType::NamePattern;
        self.match_value = value.to_string();
        self
    }

    pub fn modified(mut self, value: &str) -> Self {
        self.rule_type = RuleType::ModifiedDate;
        self.match_value = value.to_string();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn build(self) -> NewRule {
        NewRule {
            name: self.name,
            rule_type: self.rule_type,
            match_value: self.match_value,
            target_folder: self.target_folder,
            enabled: self.enabled,
        }
    }
}

/// Builder for `Submission` values with in-memory file content.
pub struct SubmissionBuilder {
    display_name: String,
    template: String,
    files: Vec<(String, Vec<u8>)>,
}

impl SubmissionBuilder {
    pub fn new(display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            template: String::new(),
            files: Vec::new(),
        }
    }

    pub fn template(mut self, template: &str) -> Self {
        self.template = template.to_string();
        self
    }

    /// Adds a file whose content is derived from its name.
    pub fn file(self, name: &str) -> Self {
        let content = format!("content of {}", name).into_bytes();
        self.file_with(name, content)
    }

    /// Adds a file of exactly `size` bytes.
    pub fn file_of_size(self, name: &str, size: usize) -> Self {
        self.file_with(name, vec![b'x'; size])
    }

    pub fn file_with(mut self, name: &str, content: Vec<u8>) -> Self {
        self.files.push((name.to_string(), content));
        self
    }

    pub fn build(self) -> Submission {
        self.files.into_iter().fold(
            Submission::new(self.display_name).template(self.template),
            |submission, (name, content)| submission.file(IncomingFile::from_bytes(name, content)),
        )
    }
}
