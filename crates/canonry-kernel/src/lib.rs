//! # Canonry Kernel
//!
//! Identity layer for definition corpora: the canonical identifier grammar,
//! the compatibility catalog mapping legacy identifiers to canonical ones,
//! nearest-match suggestion, field paths, and the validation report model.
//!
//! Everything in this crate is pure: no I/O, no corpus access. Higher
//! layers feed corpus state in and carry issues out.
//!
//! ## Architecture
//!
//! ```text
//! canon            ← canonical grammar: is_valid_format / normalize / simplify
//!     │
//! catalog          ← legacy alias table + canonical set, digest check
//!     │
//! suggest          ← Levenshtein nearest-match, duplicate alternates
//!     │
//! fieldpath        ← dotted paths with collection indices, wildcard collapse
//!     │
//! report           ← Issue / Severity / ValidationReport
//! ```

pub mod canon;
pub mod catalog;
pub mod fieldpath;
pub mod report;
pub mod suggest;

pub use canon::{is_valid_format, normalize, simplify};
pub use catalog::CompatCatalog;
pub use fieldpath::{FieldPath, FieldPathError, PathStep, normalize_reference_path};
pub use report::{Issue, Severity, ValidationReport};
pub use suggest::{duplicate_alternates, nearest_id};
