//! Validation report: ordered issue collection with stable machine codes.
//!
//! Findings are data, not errors. Every issue carries a dotted machine
//! class for programmatic filtering plus a human sentence, and optionally
//! the record path, id, field, and a suggested fix.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const CLASS_ID_EMPTY: &str = "identity.id.empty";
pub const CLASS_ID_FORMAT: &str = "identity.id.format";
pub const CLASS_ID_NORMALIZABLE: &str = "identity.id.normalizable";
pub const CLASS_ID_COLLISION: &str = "identity.id.collision";
pub const CLASS_ID_DUPLICATE: &str = "identity.id.duplicate";
pub const CLASS_ALIAS_LEGACY: &str = "identity.alias.legacy";
pub const CLASS_REFERENCE_MISSING: &str = "reference.target.missing";
pub const CLASS_REFERENCE_AMBIGUOUS: &str = "reference.target.ambiguous";
pub const CLASS_FIELD_REQUIRED_MISSING: &str = "schema.field.required_missing";
pub const CLASS_REFERENCE_REQUIRED_MISSING: &str = "schema.reference.required_missing";
pub const CLASS_CONSTRAINT_VIOLATION: &str = "schema.constraint.violation";
pub const CLASS_GRAPH_DANGLING: &str = "graph.reference.dangling";
pub const CLASS_GRAPH_ORPHANED: &str = "graph.definition.orphaned";
pub const CLASS_CATALOG_STALE: &str = "catalog.digest.stale";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub code: String,
    pub severity: Severity,
    /// Record kind, or a registry name such as `catalog` for corpus-level
    /// findings.
    pub source: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl Issue {
    pub fn new(code: &str, severity: Severity, source: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            severity,
            source: source.to_string(),
            message: message.into(),
            path: None,
            id: None,
            field: None,
            suggested_fix: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn info_count(&self) -> usize {
        self.count(Severity::Info)
    }

    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == Severity::Error)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    /// Issues grouped by source, sources in sorted order, issues within a
    /// source in insertion order.
    pub fn by_source(&self) -> BTreeMap<&str, Vec<&Issue>> {
        let mut groups: BTreeMap<&str, Vec<&Issue>> = BTreeMap::new();
        for issue in &self.issues {
            groups.entry(issue.source.as_str()).or_default().push(issue);
        }
        groups
    }

    /// Distinct issue codes, sorted.
    pub fn classes(&self) -> Vec<String> {
        self.issues
            .iter()
            .map(|issue| issue.code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} issues ({} errors, {} warnings, {} infos)",
            self.len(),
            self.error_count(),
            self.warning_count(),
            self.info_count()
        )
    }

    /// Deterministic human rendering, grouped by source.
    pub fn render_text(&self) -> String {
        if self.is_empty() {
            return "no issues found\n".to_string();
        }
        let mut out = String::new();
        for (source, issues) in self.by_source() {
            out.push_str(source);
            out.push_str(":\n");
            for issue in issues {
                out.push_str(&format!(
                    "  [{}] {}: {}",
                    issue.severity, issue.code, issue.message
                ));
                if let Some(fix) = &issue.suggested_fix {
                    out.push_str(&format!(" (suggested: {fix})"));
                }
                out.push('\n');
            }
        }
        out.push_str(&self.summary());
        out.push('\n');
        out
    }
}
