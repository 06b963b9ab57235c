//! Shared apply machinery for planned field changes.
//!
//! Both the auto-repair and rename engines produce [`PlannedChange`]
//! batches; this module turns a batch into grouped, stale-checked,
//! per-record atomic writes. A record's changes land together or not at
//! all, and one record's failure never halts the rest of the batch.

use canonry_corpus::{Corpus, Definition, save_definition};
use canonry_kernel::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// One planned mutation: set `field` on the record at `path` to `new`.
///
/// `field` is either an identity header name (`id`, `finalizedId`) or a
/// concrete field path into the record's field tree. `previous` captures
/// the value observed at planning time; apply re-checks it and drops the
/// change when the live value has moved on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedChange {
    pub path: String,
    pub field: String,
    pub previous: String,
    pub new: String,
    /// Human label for why the change was planned.
    pub reason: String,
}

impl PlannedChange {
    pub fn new(path: &str, field: &str, previous: &str, new: &str, reason: &str) -> Self {
        Self {
            path: path.to_string(),
            field: field.to_string(),
            previous: previous.to_string(),
            new: new.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Accounting for one apply pass. `applied_paths`, `skipped_paths`, and
/// the paths in `write_failures` are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    /// Records rewritten on disk and refreshed in memory.
    pub applied_paths: Vec<String>,
    /// Records left untouched: unknown path or zero surviving changes.
    pub skipped_paths: Vec<String>,
    /// `(path, field)` pairs dropped by the stale re-check.
    pub dropped_fields: Vec<(String, String)>,
    /// `(path, error)` persistence failures; the batch continues.
    pub write_failures: Vec<(String, String)>,
}

enum FieldApply {
    Applied { header_id: bool },
    Stale,
}

/// Apply a change batch: group by record path, re-check every change
/// against the live value, persist each touched record atomically, and
/// refresh the in-memory corpus only for records that reached disk.
///
/// A record whose `id` header changed is re-finalized, locking the new
/// identifier.
pub fn apply_changes(corpus: &mut Corpus, root: &Path, planned: &[PlannedChange]) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();
    let mut by_path: BTreeMap<&str, Vec<&PlannedChange>> = BTreeMap::new();
    for change in planned {
        by_path.entry(change.path.as_str()).or_default().push(change);
    }

    for (path, changes) in by_path {
        let Some(current) = corpus.get(path) else {
            outcome.skipped_paths.push(path.to_string());
            continue;
        };
        let mut updated = current.clone();
        let mut applied = 0usize;
        let mut id_changed = false;
        for change in changes {
            match apply_one(&mut updated, change) {
                FieldApply::Applied { header_id } => {
                    applied += 1;
                    id_changed |= header_id;
                }
                FieldApply::Stale => outcome
                    .dropped_fields
                    .push((path.to_string(), change.field.clone())),
            }
        }
        if applied == 0 {
            outcome.skipped_paths.push(path.to_string());
            continue;
        }
        if id_changed {
            updated.finalize_id();
        } else {
            updated.touch_updated_at();
        }
        match save_definition(root, path, &updated) {
            Ok(()) => {
                corpus.insert(path, updated);
                outcome.applied_paths.push(path.to_string());
            }
            Err(error) => {
                outcome
                    .write_failures
                    .push((path.to_string(), error.to_string()));
            }
        }
    }
    outcome
}

fn apply_one(definition: &mut Definition, change: &PlannedChange) -> FieldApply {
    match change.field.as_str() {
        "id" => {
            if definition.id != change.previous {
                return FieldApply::Stale;
            }
            definition.id = change.new.clone();
            FieldApply::Applied { header_id: true }
        }
        "finalizedId" => {
            if definition.finalized_id != change.previous {
                return FieldApply::Stale;
            }
            definition.finalized_id = change.new.clone();
            FieldApply::Applied { header_id: false }
        }
        field => {
            let Ok(path) = FieldPath::parse(field) else {
                return FieldApply::Stale;
            };
            if definition.string_field(&path) != Some(change.previous.as_str()) {
                return FieldApply::Stale;
            }
            if definition
                .set_field(&path, Value::String(change.new.clone()))
                .is_err()
            {
                return FieldApply::Stale;
            }
            FieldApply::Applied { header_id: false }
        }
    }
}
