//! Field paths: dotted keys with collection indices.
//!
//! `costs[0].resourceId` parses to `Key("costs") Index(0) Key("resourceId")`.
//! The wildcard form collapses indices to `[]` so paths addressing different
//! elements of the same list compare equal, which is how the rename engine
//! matches scanned fields against a type's reference allow-list.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldPathError {
    #[error("empty field path")]
    Empty,
    #[error("invalid path segment in `{0}`")]
    InvalidSegment(String),
    #[error("invalid collection index in `{0}`")]
    InvalidIndex(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PathStep {
    Key(String),
    Index(usize),
    /// `[]`: any element of a collection. Legal in schema rule paths, not
    /// in paths addressing one concrete value.
    AnyIndex,
}

/// A parsed field path. Ordered and hashable so paths can key maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldPath {
    steps: Vec<PathStep>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, FieldPathError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(FieldPathError::Empty);
        }
        let mut steps = Vec::new();
        for segment in trimmed.split('.') {
            let (name, suffix) = match segment.find('[') {
                Some(at) => segment.split_at(at),
                None => (segment, ""),
            };
            if name.is_empty() || name.contains(']') {
                return Err(FieldPathError::InvalidSegment(raw.to_string()));
            }
            steps.push(PathStep::Key(name.to_string()));
            let mut rest = suffix;
            while !rest.is_empty() {
                let inner = rest
                    .strip_prefix('[')
                    .ok_or_else(|| FieldPathError::InvalidIndex(raw.to_string()))?;
                let close = inner
                    .find(']')
                    .ok_or_else(|| FieldPathError::InvalidIndex(raw.to_string()))?;
                if close == 0 {
                    steps.push(PathStep::AnyIndex);
                } else {
                    let index: usize = inner[..close]
                        .parse()
                        .map_err(|_| FieldPathError::InvalidIndex(raw.to_string()))?;
                    steps.push(PathStep::Index(index));
                }
                rest = &inner[close + 1..];
            }
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// True when every step addresses one value (no `[]` wildcards).
    pub fn is_concrete(&self) -> bool {
        !self
            .steps
            .iter()
            .any(|step| matches!(step, PathStep::AnyIndex))
    }

    /// The path with every collection index collapsed to `[]`.
    pub fn wildcard(&self) -> String {
        let mut out = String::new();
        for (position, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Key(name) => {
                    if position > 0 {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                PathStep::Index(_) | PathStep::AnyIndex => out.push_str("[]"),
            }
        }
        out
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Key(name) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathStep::Index(index) => write!(f, "[{index}]")?,
                PathStep::AnyIndex => f.write_str("[]")?,
            }
        }
        Ok(())
    }
}

/// Fold a schema or hand-authored reference path into allow-list form:
/// collection indices collapse to `[]` and every key segment gets its
/// first character lowercased, tolerating PascalCase in overrides.
/// `Costs[0].ResourceId` becomes `costs[].resourceId`.
pub fn normalize_reference_path(raw: &str) -> String {
    let mut out = String::new();
    for (position, segment) in raw.trim().split('.').enumerate() {
        if position > 0 {
            out.push('.');
        }
        let (name, suffix) = match segment.find('[') {
            Some(at) => segment.split_at(at),
            None => (segment, ""),
        };
        let mut chars = name.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_lowercase());
            out.push_str(chars.as_str());
        }
        for _ in suffix.matches('[') {
            out.push_str("[]");
        }
    }
    out
}
