//! Canonical identifier grammar: format validation and normalization.
//!
//! A canonical id is a dot-separated key like `combat.baseDamage`: the first
//! segment is fully lowercase, later segments are alphanumeric and may carry
//! interior camelCase. `normalize` folds author input (spaces, underscores,
//! hyphens, stray case) into this shape; `simplify` produces the loose
//! all-lowercase comparison key used for alias matching.

use regex::Regex;
use std::sync::OnceLock;

fn canonical_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9]*(\.[a-zA-Z0-9]+)*$").expect("canonical id regex must compile")
    })
}

fn segments(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| c == '.' || c == '_' || c == '-' || c.is_whitespace())
        .filter(|segment| !segment.is_empty())
}

/// True iff `id` already has canonical shape: lowercase first segment,
/// dot-separated alphanumeric segments, no leading/trailing/double dots.
pub fn is_valid_format(id: &str) -> bool {
    canonical_id_re().is_match(id)
}

/// Collapse separator runs (`.` `_` `-` whitespace) into single dots,
/// lowercase the first segment entirely, and lowercase only the first
/// character of every later segment so interior camelCase survives.
///
/// Pure and idempotent; empty or all-separator input yields the empty
/// string. Characters outside the separator set pass through untouched, so
/// exotic input can normalize to a value that still fails
/// [`is_valid_format`]; callers must re-check.
pub fn normalize(raw: &str) -> String {
    let mut parts = segments(raw);
    let Some(head) = parts.next() else {
        return String::new();
    };
    let mut out = head.to_lowercase();
    for part in parts {
        out.push('.');
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_lowercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Loose comparison key: every segment fully lowercased, joined with dots.
/// `Max-Health`, `max_health`, and `max.Health` all simplify to
/// `max.health`.
pub fn simplify(raw: &str) -> String {
    segments(raw)
        .map(|segment| segment.to_lowercase())
        .collect::<Vec<_>>()
        .join(".")
}
