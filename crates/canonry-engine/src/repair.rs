//! Auto-repair pipeline.
//!
//! Four steps in fixed order regardless of run mode: normalization
//! planning, duplicate detection, missing-reference scan, orphan report.
//! The report always reflects the pre-repair corpus; what differs by
//! mode is whether the plan is also applied or rendered as a script.
//!
//! A change is planned only when it needs no human judgment: a
//! non-colliding normalization, a reference that reconciles
//! deterministically against the live id set, or clearing a missing
//! reference under the `clear-field` policy. Levenshtein suggestions are
//! informational and never planned.

use crate::apply::{ApplyOutcome, PlannedChange, apply_changes};
use crate::heuristic::{HeuristicOptions, id_bearing_fields};
use crate::normalize::{partition_normalizations, plan_partition};
use canonry_corpus::{Corpus, Definition, SchemaSet};
use canonry_graph::{ExtractorSet, build_reference_graph};
use canonry_kernel::report::{CLASS_GRAPH_ORPHANED, CLASS_ID_DUPLICATE, CLASS_REFERENCE_MISSING};
use canonry_kernel::suggest::SUGGEST_MAX_DISTANCE;
use canonry_kernel::{
    CompatCatalog, Issue, Severity, ValidationReport, duplicate_alternates, nearest_id, normalize,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const REASON_RECONCILIATION: &str = "reference reconciliation";
pub const REASON_CLEAR_MISSING: &str = "clear missing reference";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RepairMode {
    /// Report and plan, touch nothing.
    #[default]
    ValidateOnly,
    /// Persist every planned change.
    ApplySafeFixes,
    /// Render the plan as a sorted migration script, touch nothing.
    PreviewScript,
}

/// What to do about references that resolve to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MissingReferencePolicy {
    /// Suggest the nearest known id, leave the field alone.
    #[default]
    SuggestNearest,
    /// Plan clearing the field so the gap is explicit.
    ClearField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOptions {
    pub mode: RepairMode,
    pub missing_reference_policy: MissingReferencePolicy,
    /// Cap on reported missing references per pass.
    pub max_missing_references: usize,
    pub heuristic: HeuristicOptions,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            mode: RepairMode::ValidateOnly,
            missing_reference_policy: MissingReferencePolicy::SuggestNearest,
            max_missing_references: 100,
            heuristic: HeuristicOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RepairOutcome {
    pub report: ValidationReport,
    pub planned: Vec<PlannedChange>,
    /// Present only in apply mode.
    pub applied: Option<ApplyOutcome>,
    /// Present only in preview mode.
    pub preview: Option<String>,
}

/// Steps 1-4 of the pipeline: everything except mutation.
pub fn plan_repair(
    corpus: &Corpus,
    schemas: &SchemaSet,
    catalog: &CompatCatalog,
    extractors: &ExtractorSet,
    options: &RepairOptions,
) -> (ValidationReport, Vec<PlannedChange>) {
    let partition = partition_normalizations(corpus);
    let (mut report, mut planned) = plan_partition(corpus, &partition);
    let id_set = corpus.id_set();

    // Step 2: duplicate raw ids.
    let mut by_raw: BTreeMap<&str, Vec<&Definition>> = BTreeMap::new();
    for definition in corpus.definitions() {
        if !definition.id.is_empty() {
            by_raw
                .entry(definition.id.as_str())
                .or_default()
                .push(definition);
        }
    }
    for (id, members) in &by_raw {
        if members.len() < 2 {
            continue;
        }
        let alternates = duplicate_alternates(&normalize(id), &id_set);
        for definition in members {
            let mut issue = Issue::new(
                CLASS_ID_DUPLICATE,
                Severity::Error,
                &definition.kind,
                format!("id `{id}` is shared by {} records", members.len()),
            );
            issue.path = Some(definition.path.clone());
            issue.id = Some((*id).to_string());
            issue.suggested_fix = Some(alternates.join(", "));
            report.push(issue);
        }
    }

    // Step 3: heuristic missing-reference scan.
    let mut missing_seen = 0usize;
    'scan: for definition in corpus.definitions() {
        for field in id_bearing_fields(definition, &options.heuristic) {
            if field.value.trim().is_empty() || id_set.contains(&field.value) {
                continue;
            }
            if missing_seen >= options.max_missing_references {
                break 'scan;
            }
            missing_seen += 1;

            let reconciled = catalog.resolve_among(&field.value, &id_set);
            let suggested = reconciled.clone().or_else(|| {
                nearest_id(
                    id_set.iter().map(String::as_str),
                    &field.value,
                    SUGGEST_MAX_DISTANCE,
                )
                .map(str::to_string)
            });

            let mut issue = Issue::new(
                CLASS_REFERENCE_MISSING,
                Severity::Error,
                &definition.kind,
                format!(
                    "field `{}` references unknown id `{}`",
                    field.path, field.value
                ),
            );
            issue.path = Some(definition.path.clone());
            if !definition.id.is_empty() {
                issue.id = Some(definition.id.clone());
            }
            issue.field = Some(field.path.clone());
            issue.suggested_fix = suggested;
            report.push(issue);

            if let Some(target) = reconciled {
                planned.push(PlannedChange::new(
                    &definition.path,
                    &field.path,
                    &field.value,
                    &target,
                    REASON_RECONCILIATION,
                ));
            } else if options.missing_reference_policy == MissingReferencePolicy::ClearField {
                planned.push(PlannedChange::new(
                    &definition.path,
                    &field.path,
                    &field.value,
                    "",
                    REASON_CLEAR_MISSING,
                ));
            }
        }
    }

    // Step 4: orphan report.
    let graph = build_reference_graph(corpus, schemas, extractors);
    for node in graph.orphans() {
        let mut issue = Issue::new(
            CLASS_GRAPH_ORPHANED,
            Severity::Info,
            &node.kind,
            format!("`{node}` has no inbound references"),
        );
        issue.id = Some(node.id.clone());
        report.push(issue);
    }

    (report, planned)
}

/// One full pass in the configured mode.
pub fn run_repair(
    corpus: &mut Corpus,
    root: &Path,
    schemas: &SchemaSet,
    catalog: &CompatCatalog,
    extractors: &ExtractorSet,
    options: &RepairOptions,
) -> RepairOutcome {
    let (report, planned) = plan_repair(corpus, schemas, catalog, extractors, options);
    let mut outcome = RepairOutcome {
        report,
        planned,
        applied: None,
        preview: None,
    };
    match options.mode {
        RepairMode::ValidateOnly => {}
        RepairMode::ApplySafeFixes => {
            outcome.applied = Some(apply_changes(corpus, root, &outcome.planned));
        }
        RepairMode::PreviewScript => {
            outcome.preview = Some(render_preview(&outcome.planned));
        }
    }
    outcome
}

/// Migration-script rendering of a plan: one line per change, sorted.
pub fn render_preview(planned: &[PlannedChange]) -> String {
    let mut lines: Vec<String> = planned
        .iter()
        .map(|change| {
            format!(
                "SET {} :: {} = {} // from {} [{}]",
                change.path, change.field, change.new, change.previous, change.reason
            )
        })
        .collect();
    lines.sort();
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
