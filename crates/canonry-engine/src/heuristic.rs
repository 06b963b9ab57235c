//! Heuristic discovery of id-bearing string fields.
//!
//! The corpus convention is that reference-holding fields end in `id`
//! (`maxHealthStatId`, `resourceId`). The suffix rule is approximate on
//! purpose: config can force extra field names in and exempt known
//! false positives out. The `meta` namespace and `raw` containers hold
//! editor bookkeeping and imported blobs, never identifiers, so the
//! walker skips them entirely.

use canonry_corpus::Definition;
use serde_json::Value;
use std::collections::BTreeSet;

/// One string leaf in a definition's field tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringField {
    /// Concrete path reaching the value, e.g. `costs[0].resourceId`.
    pub path: String,
    /// The same path with indices collapsed, e.g. `costs[].resourceId`.
    pub wildcard: String,
    /// Final key name, e.g. `resourceId`.
    pub key: String,
    pub value: String,
}

/// Tuning for id-bearing detection, fed from config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeuristicOptions {
    /// Field names treated as id-bearing regardless of suffix.
    pub include_fields: BTreeSet<String>,
    /// Wildcard paths exempt from the suffix rule.
    pub opt_out_paths: BTreeSet<String>,
}

/// Every string leaf under the definition's field tree, in deterministic
/// key-then-index order.
pub fn string_fields(definition: &Definition) -> Vec<StringField> {
    let mut out = Vec::new();
    for (key, value) in &definition.fields {
        if key == "meta" || is_excluded_container(key) {
            continue;
        }
        collect(value, key.clone(), key.clone(), key, &mut out);
    }
    out
}

/// String fields that look like identifier references: key ends in `id`
/// (case-insensitive) or is force-included, minus opted-out paths. The
/// identity header is not part of the field tree and never appears here.
pub fn id_bearing_fields(definition: &Definition, options: &HeuristicOptions) -> Vec<StringField> {
    string_fields(definition)
        .into_iter()
        .filter(|field| {
            if options.opt_out_paths.contains(&field.wildcard) {
                return false;
            }
            has_id_suffix(&field.key) || options.include_fields.contains(&field.key)
        })
        .collect()
}

fn has_id_suffix(key: &str) -> bool {
    key.to_ascii_lowercase().ends_with("id")
}

fn is_excluded_container(key: &str) -> bool {
    key == "raw"
}

fn collect(value: &Value, path: String, wildcard: String, key: &str, out: &mut Vec<StringField>) {
    match value {
        Value::String(text) => out.push(StringField {
            path,
            wildcard,
            key: key.to_string(),
            value: text.clone(),
        }),
        Value::Object(map) => {
            for (name, child) in map {
                if is_excluded_container(name) {
                    continue;
                }
                collect(
                    child,
                    format!("{path}.{name}"),
                    format!("{wildcard}.{name}"),
                    name,
                    out,
                );
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect(
                    child,
                    format!("{path}[{index}]"),
                    format!("{wildcard}[]"),
                    key,
                    out,
                );
            }
        }
        _ => {}
    }
}
