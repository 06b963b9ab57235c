//! # Canonry Corpus
//!
//! The corpus layer: definition records with arbitrary typed fields, the
//! declarative schema model, and the on-disk store (one JSON file per
//! definition, atomic per-record writes).
//!
//! This crate knows nothing about validation passes or repair plans; it is
//! the memory and disk boundary the engines operate on.

pub mod definition;
pub mod files;
pub mod lock;
pub mod schema;
pub mod store;
pub mod value_path;

pub use definition::Definition;
pub use files::{CorpusError, load_corpus, save_definition, suggested_relative_path};
pub use lock::{CorpusLockGuard, LockError, corpus_lock_path};
pub use schema::{
    ConstraintRule, FieldRule, RecordSchema, ReferenceRule, SchemaBuilder, SchemaError, SchemaSet,
};
pub use store::Corpus;
pub use value_path::{ValuePathError, resolve, resolve_all, write};
