//! Corpus validation: identity, catalog, and schema checks in one pass.
//!
//! Findings are report issues, never errors. Strict mode additionally
//! rejects identifiers that still resolve through the compatibility
//! catalog's alias table; a stale catalog digest pre-empts those alias
//! checks, since the table itself can no longer be trusted.

use crate::heuristic::{HeuristicOptions, id_bearing_fields};
use canonry_corpus::{Corpus, Definition, RecordSchema, SchemaSet};
use canonry_kernel::report::{
    CLASS_ALIAS_LEGACY, CLASS_CATALOG_STALE, CLASS_CONSTRAINT_VIOLATION,
    CLASS_FIELD_REQUIRED_MISSING, CLASS_ID_EMPTY, CLASS_ID_FORMAT, CLASS_REFERENCE_AMBIGUOUS,
    CLASS_REFERENCE_MISSING, CLASS_REFERENCE_REQUIRED_MISSING,
};
use canonry_kernel::suggest::SUGGEST_MAX_DISTANCE;
use canonry_kernel::{
    CompatCatalog, Issue, Severity, ValidationReport, is_valid_format, nearest_id,
};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Treat identifiers that resolve through the alias table as errors.
    pub strict: bool,
    pub heuristic: HeuristicOptions,
}

/// Full validation pass over the corpus.
pub fn validate_corpus(
    corpus: &Corpus,
    schemas: &SchemaSet,
    catalog: &CompatCatalog,
    options: &ValidateOptions,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    let catalog_fresh = match catalog.recorded_digest() {
        Some(recorded) if recorded != catalog.digest() => {
            report.push(Issue::new(
                CLASS_CATALOG_STALE,
                Severity::Error,
                "catalog",
                "compatibility catalog digest does not match its entries; regenerate it before trusting alias checks",
            ));
            false
        }
        _ => true,
    };

    for definition in corpus.definitions() {
        if definition.id.is_empty() {
            let mut issue = Issue::new(
                CLASS_ID_EMPTY,
                Severity::Error,
                &definition.kind,
                "record has no identifier",
            );
            issue.path = Some(definition.path.clone());
            report.push(issue);
        } else if !is_valid_format(&definition.id) {
            let mut issue = Issue::new(
                CLASS_ID_FORMAT,
                Severity::Warning,
                &definition.kind,
                format!("id `{}` is not in canonical form", definition.id),
            );
            issue.path = Some(definition.path.clone());
            issue.id = Some(definition.id.clone());
            report.push(issue);
        }

        if catalog_fresh && options.strict {
            check_legacy_identifiers(definition, catalog, &options.heuristic, &mut |issue| {
                report.push(issue)
            });
        }

        if let Some(schema) = schemas.schema(&definition.kind) {
            validate_definition(definition, schema, corpus, &mut |issue| report.push(issue));
        }
    }
    report
}

/// Schema checks for one definition, emitted through `sink` so callers
/// control collection.
pub fn validate_definition(
    definition: &Definition,
    schema: &RecordSchema,
    corpus: &Corpus,
    sink: &mut dyn FnMut(Issue),
) {
    let base = |code: &str, message: String| {
        let mut issue = Issue::new(code, Severity::Error, &definition.kind, message);
        issue.path = Some(definition.path.clone());
        if !definition.id.is_empty() {
            issue.id = Some(definition.id.clone());
        }
        issue
    };

    for rule in schema.field_rules() {
        if !rule.is_satisfied_by(definition) {
            let mut issue = base(
                CLASS_FIELD_REQUIRED_MISSING,
                format!("required field `{}` is absent or empty", rule.field),
            );
            issue.field = Some(rule.field.to_string());
            sink(issue);
        }
    }

    for rule in schema.reference_rules() {
        let referenced = rule.referenced_ids(definition);
        if rule.required && referenced.is_empty() {
            let mut issue = base(
                CLASS_REFERENCE_REQUIRED_MISSING,
                format!("required reference `{}` holds no id", rule.field),
            );
            issue.field = Some(rule.field.to_string());
            sink(issue);
        }

        let pool: BTreeSet<String> = rule
            .targets
            .iter()
            .flat_map(|kind| corpus.of_kind(kind))
            .filter(|target| !target.id.is_empty())
            .map(|target| target.id.clone())
            .collect();

        for (path, id) in referenced {
            let kinds: Vec<&str> = rule
                .targets
                .iter()
                .filter(|kind| corpus.contains(kind, &id))
                .map(String::as_str)
                .collect();
            if kinds.is_empty() {
                let mut issue = base(
                    CLASS_REFERENCE_MISSING,
                    format!(
                        "field `{path}` references unknown id `{id}` (allowed kinds: {})",
                        rule.targets.join(", ")
                    ),
                );
                issue.field = Some(path);
                issue.suggested_fix =
                    nearest_id(pool.iter().map(String::as_str), &id, SUGGEST_MAX_DISTANCE)
                        .map(str::to_string);
                sink(issue);
            } else if rule.single_target && kinds.len() > 1 {
                let mut issue = base(
                    CLASS_REFERENCE_AMBIGUOUS,
                    format!(
                        "field `{path}` id `{id}` resolves under multiple kinds: {}",
                        kinds.join(", ")
                    ),
                );
                issue.field = Some(path);
                sink(issue);
            }
        }
    }

    for rule in schema.constraint_rules() {
        for message in (rule.check)(definition) {
            sink(base(
                CLASS_CONSTRAINT_VIOLATION,
                format!("constraint `{}`: {message}", rule.name),
            ));
        }
    }
}

fn check_legacy_identifiers(
    definition: &Definition,
    catalog: &CompatCatalog,
    heuristic: &HeuristicOptions,
    sink: &mut dyn FnMut(Issue),
) {
    if catalog.is_legacy(&definition.id) {
        let mut issue = Issue::new(
            CLASS_ALIAS_LEGACY,
            Severity::Error,
            &definition.kind,
            format!("id `{}` is a legacy alias", definition.id),
        );
        issue.path = Some(definition.path.clone());
        issue.id = Some(definition.id.clone());
        issue.suggested_fix = catalog.resolve(&definition.id);
        sink(issue);
    }
    for field in id_bearing_fields(definition, heuristic) {
        if catalog.is_legacy(&field.value) {
            let mut issue = Issue::new(
                CLASS_ALIAS_LEGACY,
                Severity::Error,
                &definition.kind,
                format!(
                    "field `{}` holds legacy alias `{}`",
                    field.path, field.value
                ),
            );
            issue.path = Some(definition.path.clone());
            if !definition.id.is_empty() {
                issue.id = Some(definition.id.clone());
            }
            issue.field = Some(field.path.clone());
            issue.suggested_fix = catalog.resolve(&field.value);
            sink(issue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonry_corpus::SchemaBuilder;
    use serde_json::json;

    fn definition(kind: &str, id: &str, fields: serde_json::Value) -> Definition {
        let mut definition = Definition::new(kind, "");
        definition.id = id.to_string();
        if let serde_json::Value::Object(map) = fields {
            definition.fields = map;
        }
        definition
    }

    fn count_class(report: &ValidationReport, class: &str) -> usize {
        report
            .issues
            .iter()
            .filter(|issue| issue.code == class)
            .count()
    }

    fn unit_schema() -> SchemaSet {
        let mut set = SchemaSet::new();
        set.insert(
            SchemaBuilder::new("Unit")
                .require_field("displayName")
                .reference("maxHealthStatId", &["Stat"], true, false)
                .constraint("supply-nonzero", |definition| {
                    match definition.fields.get("supply").and_then(|v| v.as_i64()) {
                        Some(0) => vec!["supply must not be zero".to_string()],
                        _ => Vec::new(),
                    }
                })
                .build()
                .unwrap(),
        );
        set
    }

    #[test]
    fn schema_rules_surface_missing_fields_and_references() {
        let corpus = Corpus::from_definitions(vec![
            (
                "stat/max-health.json".to_string(),
                definition("Stat", "core.maxHealth", json!({})),
            ),
            (
                "unit/broken.json".to_string(),
                definition(
                    "Unit",
                    "unit.broken",
                    json!({ "maxHealthStatId": "core.maxhealth", "supply": 0 }),
                ),
            ),
        ]);
        let report = validate_corpus(
            &corpus,
            &unit_schema(),
            &CompatCatalog::builtin(),
            &ValidateOptions::default(),
        );
        assert_eq!(count_class(&report, CLASS_FIELD_REQUIRED_MISSING), 1);
        assert_eq!(count_class(&report, CLASS_REFERENCE_MISSING), 1);
        assert_eq!(count_class(&report, CLASS_CONSTRAINT_VIOLATION), 1);
        assert!(report.has_errors());

        let missing = report
            .issues
            .iter()
            .find(|issue| issue.code == CLASS_REFERENCE_MISSING)
            .unwrap();
        assert_eq!(missing.suggested_fix.as_deref(), Some("core.maxHealth"));
    }

    #[test]
    fn required_reference_with_no_populated_id_is_reported() {
        let corpus = Corpus::from_definitions(vec![(
            "unit/empty.json".to_string(),
            definition("Unit", "unit.empty", json!({ "displayName": "Empty" })),
        )]);
        let report = validate_corpus(
            &corpus,
            &unit_schema(),
            &CompatCatalog::builtin(),
            &ValidateOptions::default(),
        );
        assert_eq!(count_class(&report, CLASS_REFERENCE_REQUIRED_MISSING), 1);
    }

    #[test]
    fn single_target_rules_reject_multi_kind_resolution() {
        let mut set = SchemaSet::new();
        set.insert(
            SchemaBuilder::new("Building")
                .reference("productId", &["Unit", "Upgrade"], false, true)
                .build()
                .unwrap(),
        );
        let corpus = Corpus::from_definitions(vec![
            (
                "unit/thing.json".to_string(),
                definition("Unit", "shared.thing", json!({})),
            ),
            (
                "upgrade/thing.json".to_string(),
                definition("Upgrade", "shared.thing", json!({})),
            ),
            (
                "building/factory.json".to_string(),
                definition(
                    "Building",
                    "building.factory",
                    json!({ "productId": "shared.thing" }),
                ),
            ),
        ]);
        let report = validate_corpus(
            &corpus,
            &set,
            &CompatCatalog::builtin(),
            &ValidateOptions::default(),
        );
        assert_eq!(count_class(&report, CLASS_REFERENCE_AMBIGUOUS), 1);
    }

    #[test]
    fn identity_basics_are_checked_without_schemas() {
        let corpus = Corpus::from_definitions(vec![
            (
                "unit/blank.json".to_string(),
                definition("Unit", "", json!({})),
            ),
            (
                "unit/ugly.json".to_string(),
                definition("Unit", "Unit_Soldier", json!({})),
            ),
        ]);
        let report = validate_corpus(
            &corpus,
            &SchemaSet::new(),
            &CompatCatalog::builtin(),
            &ValidateOptions::default(),
        );
        assert_eq!(count_class(&report, CLASS_ID_EMPTY), 1);
        assert_eq!(count_class(&report, CLASS_ID_FORMAT), 1);
    }

    #[test]
    fn strict_mode_flags_legacy_aliases_with_resolution() {
        let corpus = Corpus::from_definitions(vec![(
            "stat/hp.json".to_string(),
            definition("Stat", "hp", json!({ "pairedStatId": "max-health" })),
        )]);
        let relaxed = validate_corpus(
            &corpus,
            &SchemaSet::new(),
            &CompatCatalog::builtin(),
            &ValidateOptions::default(),
        );
        assert_eq!(count_class(&relaxed, CLASS_ALIAS_LEGACY), 0);

        let strict = validate_corpus(
            &corpus,
            &SchemaSet::new(),
            &CompatCatalog::builtin(),
            &ValidateOptions {
                strict: true,
                ..ValidateOptions::default()
            },
        );
        assert_eq!(count_class(&strict, CLASS_ALIAS_LEGACY), 2);
        let id_issue = strict
            .issues
            .iter()
            .find(|issue| issue.field.is_none() && issue.code == CLASS_ALIAS_LEGACY)
            .unwrap();
        assert_eq!(id_issue.suggested_fix.as_deref(), Some("core.maxHealth"));
    }

    #[test]
    fn stale_digest_preempts_alias_checks_only() {
        let mut catalog = CompatCatalog::builtin();
        catalog.set_recorded_digest(Some("not-the-real-digest".to_string()));
        let corpus = Corpus::from_definitions(vec![(
            "stat/hp.json".to_string(),
            definition("Stat", "hp", json!({})),
        )]);
        let report = validate_corpus(
            &corpus,
            &SchemaSet::new(),
            &catalog,
            &ValidateOptions {
                strict: true,
                ..ValidateOptions::default()
            },
        );
        assert_eq!(count_class(&report, CLASS_CATALOG_STALE), 1);
        assert_eq!(count_class(&report, CLASS_ALIAS_LEGACY), 0);
        // Identity checks still run.
        assert_eq!(count_class(&report, CLASS_ID_FORMAT), 0);
        assert!(report.has_errors());
    }

    #[test]
    fn matching_recorded_digest_keeps_alias_checks_active() {
        let mut catalog = CompatCatalog::builtin();
        let digest = catalog.digest();
        catalog.set_recorded_digest(Some(digest));
        let corpus = Corpus::from_definitions(vec![(
            "stat/hp.json".to_string(),
            definition("Stat", "hp", json!({})),
        )]);
        let report = validate_corpus(
            &corpus,
            &SchemaSet::new(),
            &catalog,
            &ValidateOptions {
                strict: true,
                ..ValidateOptions::default()
            },
        );
        assert_eq!(count_class(&report, CLASS_CATALOG_STALE), 0);
        assert_eq!(count_class(&report, CLASS_ALIAS_LEGACY), 1);
    }
}
