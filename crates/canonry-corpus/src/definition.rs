//! Definition record: one content entity in the corpus.

use canonry_kernel::FieldPath;
use canonry_kernel::canon::normalize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::value_path::{self, ValuePathError};

/// A single content record: a kind, an identity header, and an arbitrary
/// typed field tree.
///
/// Identity lifecycle: `id` starts as a normalization of the display name,
/// gets locked by [`Definition::finalize_id`] on first valid non-colliding
/// normalization, and thereafter changes only through the migration engine
/// or corrective re-normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    /// Record kind, e.g. `Unit`.
    pub kind: String,
    /// Current working identifier.
    pub id: String,
    /// Last successfully locked canonical identifier, or empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub finalized_id: String,
    #[serde(default)]
    pub is_id_finalized: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
    /// Arbitrary typed content, addressed by field path.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,

    /// Relative file path within the corpus root. Attached on load, never
    /// serialized into the record itself.
    #[serde(skip)]
    pub path: String,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl Definition {
    /// A fresh record. A blank display name leaves the id blank for the
    /// author to fill in; otherwise the id is seeded from the name.
    pub fn new(kind: &str, display_name: &str) -> Self {
        let now = Utc::now();
        Self {
            kind: kind.to_string(),
            id: normalize(display_name),
            finalized_id: String::new(),
            is_id_finalized: false,
            display_name: display_name.to_string(),
            created_at: now,
            updated_at: now,
            fields: Map::new(),
            path: String::new(),
        }
    }

    /// Lock the current id as authoritative.
    pub fn finalize_id(&mut self) {
        self.finalized_id = self.id.clone();
        self.is_id_finalized = true;
        self.touch_updated_at();
    }

    pub fn touch_updated_at(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Value at a concrete field path, if present.
    pub fn field(&self, path: &FieldPath) -> Option<&Value> {
        value_path::resolve(&self.fields, path)
    }

    pub fn string_field(&self, path: &FieldPath) -> Option<&str> {
        self.field(path).and_then(Value::as_str)
    }

    /// Write a value at a concrete field path and touch `updated_at`.
    pub fn set_field(&mut self, path: &FieldPath, value: Value) -> Result<(), ValuePathError> {
        value_path::write(&mut self.fields, path, value)?;
        self.touch_updated_at();
        Ok(())
    }
}
