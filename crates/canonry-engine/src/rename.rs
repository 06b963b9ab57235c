//! Single-id rename/migration engine.
//!
//! A rename touches the target's identity header plus every field across
//! the corpus that (a) holds exactly the old id and (b) sits on a path
//! the owning kind's reference allow-list covers. The allow-list is
//! derived from schema reference rules, extended by hand-authored
//! overrides for id-bearing substructures schemas do not cover. Free
//! text mentioning the old id is out of scope by construction.

use crate::apply::{ApplyOutcome, PlannedChange, apply_changes};
use crate::heuristic::string_fields;
use canonry_corpus::{Corpus, SchemaSet};
use canonry_kernel::{is_valid_format, normalize, normalize_reference_path};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

pub const REASON_RENAME: &str = "id rename";

/// Per-kind additions to the reference allow-list. Paths fold to
/// allow-list form on the way in, so overrides tolerate PascalCase and
/// concrete indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameOverrides {
    by_kind: BTreeMap<String, BTreeSet<String>>,
}

impl RenameOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: &str, path: &str) {
        self.by_kind
            .entry(kind.to_string())
            .or_default()
            .insert(normalize_reference_path(path));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.by_kind
            .iter()
            .map(|(kind, paths)| (kind.as_str(), paths))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenameError {
    #[error("no record at `{0}`")]
    UnknownPath(String),

    #[error("record at `{0}` has no identifier to rename")]
    BlankCurrentId(String),

    #[error("proposed id is blank")]
    BlankProposal,

    #[error("proposed id `{raw}` does not normalize to a canonical form (got `{normalized}`)")]
    InvalidProposal { raw: String, normalized: String },

    #[error("proposed id `{0}` matches the current id")]
    NoOp(String),

    #[error("id `{id}` already belongs to the record at `{path}`")]
    IdTaken { id: String, path: String },
}

/// A planned single-id migration. Nothing is mutated until the plan is
/// handed to [`apply_rename`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamePlan {
    pub target_path: String,
    pub old_id: String,
    pub new_id: String,
    /// The raw proposal, present when normalization altered it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_from: Option<String>,
    pub operations: Vec<PlannedChange>,
}

/// Validate a rename proposal and enumerate every operation it implies.
pub fn plan_rename(
    corpus: &Corpus,
    schemas: &SchemaSet,
    overrides: &RenameOverrides,
    target_path: &str,
    proposed_id: &str,
) -> Result<RenamePlan, RenameError> {
    let target = corpus
        .get(target_path)
        .ok_or_else(|| RenameError::UnknownPath(target_path.to_string()))?;
    if target.id.is_empty() {
        return Err(RenameError::BlankCurrentId(target_path.to_string()));
    }
    if proposed_id.trim().is_empty() {
        return Err(RenameError::BlankProposal);
    }
    let new_id = normalize(proposed_id);
    if !is_valid_format(&new_id) {
        return Err(RenameError::InvalidProposal {
            raw: proposed_id.to_string(),
            normalized: new_id,
        });
    }
    if new_id == target.id {
        return Err(RenameError::NoOp(new_id));
    }
    if let Some(existing) = corpus.find_by_id(&new_id) {
        return Err(RenameError::IdTaken {
            id: new_id,
            path: existing.path.clone(),
        });
    }

    let allow_lists = allow_lists(schemas, overrides);
    let mut operations = vec![
        PlannedChange::new(target_path, "id", &target.id, &new_id, REASON_RENAME),
        PlannedChange::new(
            target_path,
            "finalizedId",
            &target.finalized_id,
            &new_id,
            REASON_RENAME,
        ),
    ];
    let empty = BTreeSet::new();
    for definition in corpus.definitions() {
        let allowed = allow_lists.get(&definition.kind).unwrap_or(&empty);
        if allowed.is_empty() {
            continue;
        }
        for field in string_fields(definition) {
            if field.value == target.id && is_allowed(allowed, &field.wildcard) {
                operations.push(PlannedChange::new(
                    &definition.path,
                    &field.path,
                    &target.id,
                    &new_id,
                    REASON_RENAME,
                ));
            }
        }
    }

    let normalized_from = (new_id != proposed_id).then(|| proposed_id.to_string());
    Ok(RenamePlan {
        target_path: target_path.to_string(),
        old_id: target.id.clone(),
        new_id,
        normalized_from,
        operations,
    })
}

/// Apply a plan through the shared change machinery: grouped by record,
/// stale fields dropped one at a time, per-record atomic writes.
pub fn apply_rename(corpus: &mut Corpus, root: &Path, plan: &RenamePlan) -> ApplyOutcome {
    apply_changes(corpus, root, &plan.operations)
}

fn allow_lists(
    schemas: &SchemaSet,
    overrides: &RenameOverrides,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut lists: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for schema in schemas.schemas() {
        let list = lists.entry(schema.kind().to_string()).or_default();
        for rule in schema.reference_rules() {
            list.insert(normalize_reference_path(&rule.field.to_string()));
        }
    }
    for (kind, paths) in overrides.iter() {
        lists
            .entry(kind.to_string())
            .or_default()
            .extend(paths.iter().cloned());
    }
    lists
}

fn is_allowed(allowed: &BTreeSet<String>, wildcard: &str) -> bool {
    if allowed.contains(wildcard) {
        return true;
    }
    // An array of id strings scans as `field[]` while the rule names
    // `field`; both address the same reference slot.
    wildcard
        .strip_suffix("[]")
        .is_some_and(|base| allowed.contains(base))
}
