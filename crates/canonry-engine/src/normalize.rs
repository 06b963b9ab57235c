//! Bulk normalization: partition every record by normalization outcome,
//! quarantine anything unsafe, and optionally apply the clean remainder.
//!
//! Safety rule: a normalization is planned only when exactly one record
//! converges on the normalized form and that form is canonical. Groups
//! that converge together are collisions and stay untouched, as do
//! records whose normalized form still fails validation.

use crate::apply::{ApplyOutcome, PlannedChange, apply_changes};
use canonry_corpus::Corpus;
use canonry_corpus::Definition;
use canonry_kernel::report::{
    CLASS_ID_COLLISION, CLASS_ID_EMPTY, CLASS_ID_FORMAT, CLASS_ID_NORMALIZABLE,
};
use canonry_kernel::{Issue, Severity, ValidationReport, is_valid_format, normalize};
use std::collections::BTreeMap;
use std::path::Path;

pub const REASON_NORMALIZATION: &str = "id normalization";

/// One record whose id cleanly normalizes to a new canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanNormalization {
    pub path: String,
    pub old_id: String,
    pub old_finalized_id: String,
    pub normalized: String,
}

/// Records converging on one normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionGroup {
    pub normalized: String,
    /// Member record paths, in corpus order.
    pub paths: Vec<String>,
}

/// Every record, bucketed by what normalization would do to it. Buckets
/// are disjoint; paths within each are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationPartition {
    pub already_canonical: Vec<String>,
    pub clean: Vec<CleanNormalization>,
    pub collisions: Vec<CollisionGroup>,
    /// Records whose normalized form still fails validation.
    pub invalid: Vec<String>,
    pub blank: Vec<String>,
}

/// Partition the corpus by normalization outcome. Grouping runs over
/// every non-blank id, so an already-canonical record whose form another
/// id converges on is quarantined with the rest of its group.
pub fn partition_normalizations(corpus: &Corpus) -> NormalizationPartition {
    let mut partition = NormalizationPartition::default();
    let mut groups: BTreeMap<String, Vec<&Definition>> = BTreeMap::new();
    for definition in corpus.definitions() {
        if definition.id.is_empty() {
            partition.blank.push(definition.path.clone());
            continue;
        }
        let normalized = normalize(&definition.id);
        if normalized.is_empty() {
            partition.invalid.push(definition.path.clone());
            continue;
        }
        groups.entry(normalized).or_default().push(definition);
    }

    for (normalized, members) in groups {
        if members.len() > 1 {
            partition.collisions.push(CollisionGroup {
                normalized,
                paths: members
                    .iter()
                    .map(|definition| definition.path.clone())
                    .collect(),
            });
            continue;
        }
        let definition = members[0];
        if normalized == definition.id && is_valid_format(&definition.id) {
            partition.already_canonical.push(definition.path.clone());
        } else if is_valid_format(&normalized) {
            partition.clean.push(CleanNormalization {
                path: definition.path.clone(),
                old_id: definition.id.clone(),
                old_finalized_id: definition.finalized_id.clone(),
                normalized,
            });
        } else {
            partition.invalid.push(definition.path.clone());
        }
    }

    partition.already_canonical.sort();
    partition.clean.sort_by(|a, b| a.path.cmp(&b.path));
    partition.invalid.sort();
    partition
}

/// Report every bucket and turn the clean one into planned header
/// changes. Shared by bulk normalization and the auto-repair pipeline's
/// first step.
pub fn plan_partition(
    corpus: &Corpus,
    partition: &NormalizationPartition,
) -> (ValidationReport, Vec<PlannedChange>) {
    let mut report = ValidationReport::new();
    for path in &partition.blank {
        if let Some(definition) = corpus.get(path) {
            let mut issue = Issue::new(
                CLASS_ID_EMPTY,
                Severity::Error,
                &definition.kind,
                "record has no identifier",
            );
            issue.path = Some(path.clone());
            report.push(issue);
        }
    }
    for group in &partition.collisions {
        for path in &group.paths {
            if let Some(definition) = corpus.get(path) {
                let mut issue = Issue::new(
                    CLASS_ID_COLLISION,
                    Severity::Error,
                    &definition.kind,
                    format!(
                        "id `{}` normalizes to `{}`, shared with {} other record(s)",
                        definition.id,
                        group.normalized,
                        group.paths.len() - 1
                    ),
                );
                issue.path = Some(path.clone());
                issue.id = Some(definition.id.clone());
                report.push(issue);
            }
        }
    }
    for path in &partition.invalid {
        if let Some(definition) = corpus.get(path) {
            let mut issue = Issue::new(
                CLASS_ID_FORMAT,
                Severity::Warning,
                &definition.kind,
                format!(
                    "id `{}` does not normalize to a canonical form (got `{}`)",
                    definition.id,
                    normalize(&definition.id)
                ),
            );
            issue.path = Some(path.clone());
            issue.id = Some(definition.id.clone());
            report.push(issue);
        }
    }

    let mut planned = Vec::new();
    for clean in &partition.clean {
        if let Some(definition) = corpus.get(&clean.path) {
            let mut issue = Issue::new(
                CLASS_ID_NORMALIZABLE,
                Severity::Warning,
                &definition.kind,
                format!(
                    "id `{}` normalizes to `{}`",
                    clean.old_id, clean.normalized
                ),
            );
            issue.path = Some(clean.path.clone());
            issue.id = Some(clean.old_id.clone());
            issue.suggested_fix = Some(clean.normalized.clone());
            report.push(issue);
        }
        planned.push(PlannedChange::new(
            &clean.path,
            "id",
            &clean.old_id,
            &clean.normalized,
            REASON_NORMALIZATION,
        ));
        planned.push(PlannedChange::new(
            &clean.path,
            "finalizedId",
            &clean.old_finalized_id,
            &clean.normalized,
            REASON_NORMALIZATION,
        ));
    }
    (report, planned)
}

#[derive(Debug, Clone, Default)]
pub struct BulkNormalizeOutcome {
    pub report: ValidationReport,
    pub partition: NormalizationPartition,
    pub planned: Vec<PlannedChange>,
    /// Present only when the pass ran in apply mode.
    pub applied: Option<ApplyOutcome>,
}

/// One full normalization pass. Dry runs report and plan without touching
/// the corpus; apply persists the clean bucket and nothing else.
pub fn bulk_normalize(corpus: &mut Corpus, root: &Path, apply: bool) -> BulkNormalizeOutcome {
    let partition = partition_normalizations(corpus);
    let (report, planned) = plan_partition(corpus, &partition);
    let applied = if apply {
        Some(apply_changes(corpus, root, &planned))
    } else {
        None
    };
    BulkNormalizeOutcome {
        report,
        partition,
        planned,
        applied,
    }
}
