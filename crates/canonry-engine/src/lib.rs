//! # Canonry Engine
//!
//! The passes that keep a definition corpus internally consistent:
//! validation, auto-repair, single-id rename, and bulk normalization.
//! Every entry point takes the corpus handle explicitly and reports
//! findings as data; mutation happens only through the shared apply
//! machinery and only in apply modes.
//!
//! ## Architecture
//!
//! ```text
//! validate    ← identity + catalog + schema checks → ValidationReport
//!     │
//! repair      ← normalization / duplicates / missing refs / orphans
//!     │             → report + plan, then apply or preview by mode
//! rename      ← single-id migration: plan, then apply
//!     │
//! normalize   ← bulk normalization partition, quarantine, apply
//!     │
//! apply       ← grouped, stale-checked, per-record atomic writes
//!     │
//! heuristic   ← id-bearing string-field discovery
//!     │
//! config      ← canonry.toml: policies, catalog extension, schemas
//! ```

pub mod apply;
pub mod config;
pub mod heuristic;
pub mod normalize;
pub mod repair;
pub mod rename;
pub mod validate;

pub use apply::{ApplyOutcome, PlannedChange, apply_changes};
pub use config::{Config, ConfigError};
pub use heuristic::{HeuristicOptions, StringField, id_bearing_fields, string_fields};
pub use normalize::{
    BulkNormalizeOutcome, CleanNormalization, CollisionGroup, NormalizationPartition,
    bulk_normalize, partition_normalizations,
};
pub use repair::{
    MissingReferencePolicy, RepairMode, RepairOptions, RepairOutcome, plan_repair, render_preview,
    run_repair,
};
pub use rename::{RenameError, RenameOverrides, RenamePlan, apply_rename, plan_rename};
pub use validate::{ValidateOptions, validate_corpus, validate_definition};
