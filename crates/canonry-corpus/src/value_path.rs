//! Field-path navigation over a definition's JSON field tree.

use canonry_kernel::{FieldPath, PathStep};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValuePathError {
    #[error("path `{0}` does not address an existing value")]
    Missing(String),
    #[error("path `{0}` traverses a non-container value")]
    NotAContainer(String),
    #[error("collection index out of bounds at `{0}`")]
    IndexOutOfBounds(String),
    #[error("path `{0}` is not writable")]
    NotWritable(String),
}

/// Value at a concrete path. Wildcard paths never resolve here; use
/// [`resolve_all`].
pub fn resolve<'a>(fields: &'a Map<String, Value>, path: &FieldPath) -> Option<&'a Value> {
    let mut steps = path.steps().iter();
    let Some(PathStep::Key(first)) = steps.next() else {
        return None;
    };
    let mut current = fields.get(first)?;
    for step in steps {
        current = match step {
            PathStep::Key(name) => current.as_object()?.get(name)?,
            PathStep::Index(index) => current.as_array()?.get(*index)?,
            PathStep::AnyIndex => return None,
        };
    }
    Some(current)
}

/// Every value matched by a path whose collection steps may be wildcards,
/// paired with the concrete rendering of the path that reached it. Missing
/// or mistyped segments simply contribute no matches.
pub fn resolve_all<'a>(fields: &'a Map<String, Value>, path: &FieldPath) -> Vec<(String, &'a Value)> {
    let mut out = Vec::new();
    let steps = path.steps();
    let Some(PathStep::Key(first)) = steps.first() else {
        return out;
    };
    let Some(root) = fields.get(first) else {
        return out;
    };
    walk(root, first.clone(), &steps[1..], &mut out);
    out
}

fn walk<'a>(
    value: &'a Value,
    rendered: String,
    rest: &[PathStep],
    out: &mut Vec<(String, &'a Value)>,
) {
    let Some(step) = rest.first() else {
        out.push((rendered, value));
        return;
    };
    match step {
        PathStep::Key(name) => {
            if let Some(object) = value.as_object()
                && let Some(next) = object.get(name)
            {
                walk(next, format!("{rendered}.{name}"), &rest[1..], out);
            }
        }
        PathStep::Index(index) => {
            if let Some(array) = value.as_array()
                && let Some(next) = array.get(*index)
            {
                walk(next, format!("{rendered}[{index}]"), &rest[1..], out);
            }
        }
        PathStep::AnyIndex => {
            if let Some(array) = value.as_array() {
                for (index, next) in array.iter().enumerate() {
                    walk(next, format!("{rendered}[{index}]"), &rest[1..], out);
                }
            }
        }
    }
}

/// Write a value at a concrete path. Every intermediate container must
/// already exist; the final key may be new, a final index must be in
/// bounds.
pub fn write(
    fields: &mut Map<String, Value>,
    path: &FieldPath,
    value: Value,
) -> Result<(), ValuePathError> {
    let steps = path.steps();
    let Some(PathStep::Key(first)) = steps.first() else {
        return Err(ValuePathError::NotWritable(path.to_string()));
    };
    if !path.is_concrete() {
        return Err(ValuePathError::NotWritable(path.to_string()));
    }
    if steps.len() == 1 {
        fields.insert(first.clone(), value);
        return Ok(());
    }

    let mut current = fields
        .get_mut(first)
        .ok_or_else(|| ValuePathError::Missing(path.to_string()))?;
    for step in &steps[1..steps.len() - 1] {
        current = match step {
            PathStep::Key(name) => current
                .as_object_mut()
                .ok_or_else(|| ValuePathError::NotAContainer(path.to_string()))?
                .get_mut(name)
                .ok_or_else(|| ValuePathError::Missing(path.to_string()))?,
            PathStep::Index(index) => current
                .as_array_mut()
                .ok_or_else(|| ValuePathError::NotAContainer(path.to_string()))?
                .get_mut(*index)
                .ok_or_else(|| ValuePathError::IndexOutOfBounds(path.to_string()))?,
            PathStep::AnyIndex => return Err(ValuePathError::NotWritable(path.to_string())),
        };
    }

    match steps.last() {
        Some(PathStep::Key(name)) => {
            let object = current
                .as_object_mut()
                .ok_or_else(|| ValuePathError::NotAContainer(path.to_string()))?;
            object.insert(name.clone(), value);
            Ok(())
        }
        Some(PathStep::Index(index)) => {
            let array = current
                .as_array_mut()
                .ok_or_else(|| ValuePathError::NotAContainer(path.to_string()))?;
            let slot = array
                .get_mut(*index)
                .ok_or_else(|| ValuePathError::IndexOutOfBounds(path.to_string()))?;
            *slot = value;
            Ok(())
        }
        _ => Err(ValuePathError::NotWritable(path.to_string())),
    }
}
