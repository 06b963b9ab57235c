//! `canonry.toml`: deployment configuration for every engine pass.
//!
//! Every section is optional and unknown keys are rejected, so a typo'd
//! knob fails the run instead of silently doing nothing.

use crate::heuristic::HeuristicOptions;
use crate::rename::RenameOverrides;
use crate::repair::{MissingReferencePolicy, RepairMode, RepairOptions};
use crate::validate::ValidateOptions;
use canonry_corpus::{SchemaBuilder, SchemaError, SchemaSet};
use canonry_kernel::CompatCatalog;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config `{path}`: {message}")]
    Read { path: String, message: String },

    #[error("cannot parse config `{path}`: {message}")]
    Parse { path: String, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    pub repair: RepairSection,
    pub heuristic: HeuristicSection,
    pub catalog: CatalogSection,
    pub rename: RenameSection,
    /// Declarative per-kind schemas, keyed by record kind.
    pub schemas: BTreeMap<String, SchemaSection>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct RepairSection {
    pub missing_reference_policy: MissingReferencePolicy,
    pub max_missing_references: usize,
}

impl Default for RepairSection {
    fn default() -> Self {
        Self {
            missing_reference_policy: MissingReferencePolicy::SuggestNearest,
            max_missing_references: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct HeuristicSection {
    /// Field names force-treated as id-bearing.
    pub include_fields: BTreeSet<String>,
    /// Wildcard paths exempt from the id-suffix rule.
    pub opt_out_fields: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct CatalogSection {
    /// Expected digest over the extended catalog; a mismatch is reported
    /// as stale.
    pub digest: Option<String>,
    /// Extra canonical ids beyond the builtin table.
    pub canonical: Vec<String>,
    /// Extra legacy-to-canonical pairs.
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct RenameSection {
    /// Per-kind extra allow-list paths for the rename engine.
    pub overrides: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct SchemaSection {
    pub required_fields: Vec<String>,
    pub optional_fields: Vec<String>,
    pub references: Vec<ReferenceSection>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ReferenceSection {
    pub path: String,
    pub targets: Vec<String>,
    pub required: bool,
    pub single_target: bool,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;
        toml::from_str(&text).map_err(|error| ConfigError::Parse {
            path: path.display().to_string(),
            message: error.to_string(),
        })
    }

    /// A missing file falls back to defaults; a present-but-broken file
    /// is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// The builtin catalog extended with configured entries, carrying the
    /// recorded digest when one is configured.
    pub fn catalog(&self) -> CompatCatalog {
        let mut catalog = CompatCatalog::builtin();
        catalog.merge(
            self.catalog.canonical.iter().cloned(),
            self.catalog
                .aliases
                .iter()
                .map(|(legacy, canonical)| (legacy.clone(), canonical.clone())),
        );
        catalog.set_recorded_digest(self.catalog.digest.clone());
        catalog
    }

    /// Build the declared schema set. Constraint rules are code, not
    /// config; callers register them on the returned set's schemas via
    /// their own builders when needed.
    pub fn schemas(&self) -> Result<SchemaSet, ConfigError> {
        let mut set = SchemaSet::new();
        for (kind, section) in &self.schemas {
            let mut builder = SchemaBuilder::new(kind);
            for path in &section.required_fields {
                builder = builder.require_field(path);
            }
            for path in &section.optional_fields {
                builder = builder.optional_field(path);
            }
            for reference in &section.references {
                let targets: Vec<&str> = reference.targets.iter().map(String::as_str).collect();
                builder = builder.reference(
                    &reference.path,
                    &targets,
                    reference.required,
                    reference.single_target,
                );
            }
            set.insert(builder.build()?);
        }
        Ok(set)
    }

    pub fn rename_overrides(&self) -> RenameOverrides {
        let mut overrides = RenameOverrides::new();
        for (kind, paths) in &self.rename.overrides {
            for path in paths {
                overrides.add(kind, path);
            }
        }
        overrides
    }

    pub fn heuristic_options(&self) -> HeuristicOptions {
        HeuristicOptions {
            include_fields: self.heuristic.include_fields.clone(),
            opt_out_paths: self.heuristic.opt_out_fields.clone(),
        }
    }

    pub fn repair_options(&self, mode: RepairMode) -> RepairOptions {
        RepairOptions {
            mode,
            missing_reference_policy: self.repair.missing_reference_policy,
            max_missing_references: self.repair.max_missing_references,
            heuristic: self.heuristic_options(),
        }
    }

    pub fn validate_options(&self, strict: bool) -> ValidateOptions {
        ValidateOptions {
            strict,
            heuristic: self.heuristic_options(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[repair]
missing-reference-policy = "clear-field"
max-missing-references = 25

[heuristic]
include-fields = ["target"]
opt-out-fields = ["grid"]

[catalog]
digest = "0000"
canonical = ["core.shieldStrength"]

[catalog.aliases]
shield = "core.shieldStrength"

[rename.overrides]
Building = ["GarrisonUnitId"]

[schemas.Unit]
required-fields = ["displayName"]
optional-fields = ["notes"]

[[schemas.Unit.references]]
path = "maxHealthStatId"
targets = ["Stat"]
required = true
single-target = true
"#;

    #[test]
    fn full_config_parses_every_section() {
        let config: Config = toml::from_str(FULL).unwrap();
        assert_eq!(
            config.repair.missing_reference_policy,
            MissingReferencePolicy::ClearField
        );
        assert_eq!(config.repair.max_missing_references, 25);
        assert!(config.heuristic.include_fields.contains("target"));
        assert!(config.heuristic.opt_out_fields.contains("grid"));
        assert_eq!(config.catalog.digest.as_deref(), Some("0000"));
        assert_eq!(config.rename.overrides["Building"], vec!["GarrisonUnitId"]);
        assert_eq!(config.schemas["Unit"].references.len(), 1);
        assert!(config.schemas["Unit"].references[0].single_target);
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.repair.max_missing_references, 100);
        assert_eq!(
            config.repair.missing_reference_policy,
            MissingReferencePolicy::SuggestNearest
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = toml::from_str::<Config>("[repair]\nmispeled-knob = 3\n").unwrap_err();
        assert!(err.to_string().contains("mispeled-knob"));
    }

    #[test]
    fn catalog_extension_carries_entries_and_digest() {
        let config: Config = toml::from_str(FULL).unwrap();
        let catalog = config.catalog();
        assert!(catalog.contains("core.shieldStrength"));
        assert_eq!(catalog.resolve("shield").as_deref(), Some("core.shieldStrength"));
        // Builtin entries survive the merge.
        assert_eq!(catalog.resolve("hp").as_deref(), Some("core.maxHealth"));
        assert_eq!(catalog.recorded_digest(), Some("0000"));
    }

    #[test]
    fn schema_section_builds_rules() {
        let config: Config = toml::from_str(FULL).unwrap();
        let schemas = config.schemas().unwrap();
        let unit = schemas.schema("Unit").unwrap();
        assert_eq!(unit.field_rules().len(), 2);
        assert_eq!(unit.reference_rules().len(), 1);
        assert!(unit.reference_rules()[0].required);
        assert!(unit.reference_rules()[0].single_target);
    }

    #[test]
    fn bad_schema_paths_surface_as_config_errors() {
        let config: Config = toml::from_str(
            "[schemas.Unit]\nrequired-fields = [\"a..b\"]\n",
        )
        .unwrap();
        assert!(matches!(
            config.schemas().unwrap_err(),
            ConfigError::Schema(_)
        ));
    }

    #[test]
    fn load_or_default_tolerates_missing_files() {
        let config = Config::load_or_default(Path::new("/nonexistent/canonry.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
