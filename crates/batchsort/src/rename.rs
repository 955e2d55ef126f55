//! Naming templates: `{index}` and `{name}` expansion with per-category
//! collision avoidance.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use thiserror::Error;

use crate::batch::{PreviewEntry, StagedItem};

/// The template used when none is supplied.
pub const DEFAULT_TEMPLATE: &str = "{index}_{name}";

/// Widest padding accepted for `{index:N}`.
pub const MAX_INDEX_WIDTH: usize = 32;

/// Longest rendered name, in bytes; the usual filesystem component limit.
pub const MAX_NAME_BYTES: usize = 255;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown placeholder '{{{0}}}'")]
    UnknownPlaceholder(String),

    #[error("Unbalanced brace at position {0}")]
    UnbalancedBrace(usize),

    #[error("Invalid format spec '{spec}' for '{field}'")]
    InvalidFormatSpec { field: String, spec: String },

    #[error("Template expands to an unusable filename '{0}'")]
    UnsafeName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Index { width: usize, zero_pad: bool },
    Name,
}

/// A parsed naming template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplate {
    segments: Vec<Segment>,
}

impl FromStr for NameTemplate {
    type Err = TemplateError;

    fn from_str(template: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        literal.push('{');
                        continue;
                    }

                    let mut field = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        match inner {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(TemplateError::UnbalancedBrace(pos)),
                            other => field.push(other),
                        }
                    }
                    if !closed {
                        return Err(TemplateError::UnbalancedBrace(pos));
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_placeholder(&field)?);
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        literal.push('}');
                    } else {
                        return Err(TemplateError::UnbalancedBrace(pos));
                    }
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }
}

fn parse_placeholder(field: &str) -> Result<Segment, TemplateError> {
    let (name, spec) = match field.split_once(':') {
        Some((name, spec)) => (name.trim(), Some(spec)),
        None => (field.trim(), None),
    };

    match (name, spec) {
        ("name", None) => Ok(Segment::Name),
        ("index", None) => Ok(Segment::Index {
            width: 0,
            zero_pad: false,
        }),
        ("index", Some(spec)) => {
            let invalid = || TemplateError::InvalidFormatSpec {
                field: name.to_string(),
                spec: spec.to_string(),
            };
            let zero_pad = spec.starts_with('0') && spec.len() > 1;
            let digits = if zero_pad { &spec[1..] } else { spec };
            let width: usize = digits.parse().map_err(|_| invalid())?;
            if width > MAX_INDEX_WIDTH {
                return Err(invalid());
            }
            Ok(Segment::Index { width, zero_pad })
        }
        ("name", Some(spec)) => Err(TemplateError::InvalidFormatSpec {
            field: name.to_string(),
            spec: spec.to_string(),
        }),
        (other, _) => Err(TemplateError::UnknownPlaceholder(other.to_string())),
    }
}

impl NameTemplate {
    /// Expands the template for one item. Fails if the result cannot be
    /// used as a single filename.
    pub fn render(&self, index: usize, original_name: &str) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Name => out.push_str(original_name),
                Segment::Index { width, zero_pad } => {
                    if *zero_pad {
                        out.push_str(&format!("{:0width$}", index, width = *width));
                    } else {
                        out.push_str(&format!("{:width$}", index, width = *width));
                    }
                }
            }
        }

        if out.trim().is_empty()
            || out.len() > MAX_NAME_BYTES
            || out == "."
            || out == ".."
            || out.contains('/')
            || out.contains('\\')
            || out.contains('\0')
        {
            return Err(TemplateError::UnsafeName(out));
        }
        Ok(out)
    }
}

/// The fallback name used for every item when a template is malformed.
pub fn fallback_name(index: usize, original_name: &str) -> String {
    format!("{}_{}", index, original_name)
}

/// The result of resolving a batch's names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub entries: Vec<PreviewEntry>,
    /// Set when the template was rejected and the fallback was applied.
    pub fallback: Option<TemplateError>,
}

/// Expands `template` for each item (1-based index, submission order) and
/// de-duplicates names within each category.
pub fn resolve_names(items: &[StagedItem], template: &str) -> Resolution {
    let (names, fallback) = match render_all(items, template) {
        Ok(names) => (names, None),
        Err(e) => {
            let names = items
                .iter()
                .enumerate()
                .map(|(i, item)| fallback_name(i + 1, &item.original_name))
                .collect();
            (names, Some(e))
        }
    };

    let mut taken: HashMap<&str, HashSet<String>> = HashMap::new();
    let mut occurrences: HashMap<(&str, String), usize> = HashMap::new();
    let mut entries = Vec::with_capacity(items.len());

    for (i, (item, candidate)) in items.iter().zip(names).enumerate() {
        let used = taken.entry(item.category.as_str()).or_default();
        let key = candidate.to_lowercase();
        let seen = occurrences
            .entry((item.category.as_str(), key.clone()))
            .or_insert(0);
        *seen += 1;

        let new_name = if *seen == 1 && !used.contains(&key) {
            candidate
        } else {
            let mut ordinal = (*seen).max(2);
            loop {
                let attempt = with_suffix(&candidate, ordinal);
                if !used.contains(&attempt.to_lowercase()) {
                    break attempt;
                }
                ordinal += 1;
            }
        };
        used.insert(new_name.to_lowercase());

        entries.push(PreviewEntry {
            index: i + 1,
            original_name: item.original_name.clone(),
            upload_name: item.upload_name.clone(),
            category: item.category.clone(),
            size: item.size,
            new_name,
        });
    }

    Resolution { entries, fallback }
}

fn render_all(items: &[StagedItem], template: &str) -> Result<Vec<String>, TemplateError> {
    let template: NameTemplate = template.parse()?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| template.render(i + 1, &item.original_name))
        .collect()
}

/// Splits at the last dot; a leading dot belongs to the stem.
pub(crate) fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    }
}

/// `photo.png` + 2 -> `photo_2.png`
pub(crate) fn with_suffix(filename: &str, ordinal: usize) -> String {
    let (stem, ext) = split_extension(filename);
    format!("{}_{}{}", stem, ordinal, ext)
}
