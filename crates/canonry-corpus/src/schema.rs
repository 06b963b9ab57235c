//! Declarative per-kind schemas: field rules, reference rules, constraints.
//!
//! Schemas are built once at startup and never mutated afterwards. They
//! carry no runtime behavior of their own; the validator and the graph
//! builder walk them.

use crate::definition::Definition;
use crate::value_path::{resolve, resolve_all};
use canonry_kernel::{FieldPath, FieldPathError};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema {kind}: bad rule path `{path}`: {source}")]
    BadPath {
        kind: String,
        path: String,
        source: FieldPathError,
    },

    #[error("schema {kind}: reference rule `{path}` lists no allowed targets")]
    NoTargets { kind: String, path: String },
}

/// Required rules fail when the selected value is absent, null, an empty
/// string, or an empty array.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: FieldPath,
    pub required: bool,
}

impl FieldRule {
    pub fn is_satisfied_by(&self, definition: &Definition) -> bool {
        if !self.required {
            return true;
        }
        match resolve(&definition.fields, &self.field) {
            None | Some(Value::Null) => false,
            Some(Value::String(text)) => !text.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }
}

/// A reference-bearing field. The path may contain `[]` wildcards; the
/// targets list names the record kinds the referenced id may belong to.
#[derive(Debug, Clone)]
pub struct ReferenceRule {
    pub field: FieldPath,
    pub targets: Vec<String>,
    /// At least one id must be populated.
    pub required: bool,
    /// The id must resolve under exactly one of the allowed kinds.
    pub single_target: bool,
}

impl ReferenceRule {
    /// Every id currently populated on `definition` through this rule's
    /// path, paired with the concrete path holding it. A scalar string
    /// yields one entry, an array of strings yields one per element,
    /// wildcard paths fan out. Blank values are dropped.
    pub fn referenced_ids(&self, definition: &Definition) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (path, value) in resolve_all(&definition.fields, &self.field) {
            match value {
                Value::String(id) => {
                    if !id.trim().is_empty() {
                        out.push((path, id.clone()));
                    }
                }
                Value::Array(items) => {
                    for (index, item) in items.iter().enumerate() {
                        if let Some(id) = item.as_str()
                            && !id.trim().is_empty()
                        {
                            out.push((format!("{path}[{index}]"), id.to_string()));
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }
}

/// Free-form cross-field check. Returns one message per violation.
#[derive(Debug, Clone)]
pub struct ConstraintRule {
    pub name: String,
    pub check: fn(&Definition) -> Vec<String>,
}

/// Immutable rule set for one record kind.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    kind: String,
    fields: Vec<FieldRule>,
    references: Vec<ReferenceRule>,
    constraints: Vec<ConstraintRule>,
}

impl RecordSchema {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn field_rules(&self) -> &[FieldRule] {
        &self.fields
    }

    pub fn reference_rules(&self) -> &[ReferenceRule] {
        &self.references
    }

    pub fn constraint_rules(&self) -> &[ConstraintRule] {
        &self.constraints
    }
}

/// Builder-style schema accumulation. Rule paths are parsed at `build`,
/// so a malformed declaration fails loudly instead of silently matching
/// nothing.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    kind: String,
    fields: Vec<(String, bool)>,
    references: Vec<RawReference>,
    constraints: Vec<ConstraintRule>,
}

#[derive(Debug)]
struct RawReference {
    path: String,
    targets: Vec<String>,
    required: bool,
    single_target: bool,
}

impl SchemaBuilder {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Self::default()
        }
    }

    pub fn require_field(mut self, path: &str) -> Self {
        self.fields.push((path.to_string(), true));
        self
    }

    pub fn optional_field(mut self, path: &str) -> Self {
        self.fields.push((path.to_string(), false));
        self
    }

    /// `required`: at least one id must be populated. `single_target`: the
    /// id must resolve under exactly one allowed kind.
    pub fn reference(
        mut self,
        path: &str,
        targets: &[&str],
        required: bool,
        single_target: bool,
    ) -> Self {
        self.references.push(RawReference {
            path: path.to_string(),
            targets: targets.iter().map(|t| t.to_string()).collect(),
            required,
            single_target,
        });
        self
    }

    pub fn constraint(mut self, name: &str, check: fn(&Definition) -> Vec<String>) -> Self {
        self.constraints.push(ConstraintRule {
            name: name.to_string(),
            check,
        });
        self
    }

    pub fn build(self) -> Result<RecordSchema, SchemaError> {
        let mut fields = Vec::new();
        for (raw, required) in self.fields {
            let field = FieldPath::parse(&raw).map_err(|source| SchemaError::BadPath {
                kind: self.kind.clone(),
                path: raw.clone(),
                source,
            })?;
            fields.push(FieldRule { field, required });
        }
        let mut references = Vec::new();
        for raw in self.references {
            if raw.targets.is_empty() {
                return Err(SchemaError::NoTargets {
                    kind: self.kind.clone(),
                    path: raw.path,
                });
            }
            let field = FieldPath::parse(&raw.path).map_err(|source| SchemaError::BadPath {
                kind: self.kind.clone(),
                path: raw.path.clone(),
                source,
            })?;
            references.push(ReferenceRule {
                field,
                targets: raw.targets,
                required: raw.required,
                single_target: raw.single_target,
            });
        }
        Ok(RecordSchema {
            kind: self.kind,
            fields,
            references,
            constraints: self.constraints,
        })
    }
}

/// Schemas for every covered kind.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    schemas: BTreeMap<String, RecordSchema>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, schema: RecordSchema) {
        self.schemas.insert(schema.kind.clone(), schema);
    }

    pub fn schema(&self, kind: &str) -> Option<&RecordSchema> {
        self.schemas.get(kind)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &RecordSchema> {
        self.schemas.values()
    }
}
