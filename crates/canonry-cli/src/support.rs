use canonry_corpus::{Corpus, CorpusLockGuard, SchemaSet, load_corpus};
use canonry_engine::{ApplyOutcome, Config, PlannedChange};
use canonry_kernel::ValidationReport;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub fn load_config_or_exit(config_arg: &str) -> Config {
    Config::load_or_default(Path::new(config_arg)).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

pub fn load_corpus_or_exit(corpus_arg: &str) -> (Corpus, PathBuf) {
    let root = PathBuf::from(corpus_arg);
    let corpus = load_corpus(&root).unwrap_or_else(|e| {
        eprintln!("error: failed to load corpus at {}: {e}", root.display());
        std::process::exit(1);
    });
    (corpus, root)
}

pub fn schemas_or_exit(config: &Config) -> SchemaSet {
    config.schemas().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

pub fn lock_or_exit(root: &Path) -> CorpusLockGuard {
    CorpusLockGuard::acquire(root).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

pub fn print_json(payload: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("json serialization")
    );
}

pub fn json_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).expect("json serialization")
}

/// Kernel rendering of the report, indented under the command header.
pub fn print_report_block(report: &ValidationReport) {
    for line in report.render_text().lines() {
        println!("  {line}");
    }
}

pub fn print_planned_block(planned: &[PlannedChange]) {
    if planned.is_empty() {
        return;
    }
    println!("  Planned changes ({}):", planned.len());
    for change in planned {
        println!(
            "    - {} :: {} -> {} [{}]",
            change.path, change.field, change.new, change.reason
        );
    }
}

pub fn print_apply_block(outcome: &ApplyOutcome) {
    println!("  Applied: {} record(s)", outcome.applied_paths.len());
    for path in &outcome.applied_paths {
        println!("    - {path}");
    }
    if !outcome.skipped_paths.is_empty() {
        println!("  Skipped as stale: {} record(s)", outcome.skipped_paths.len());
        for path in &outcome.skipped_paths {
            println!("    - {path}");
        }
    }
    if !outcome.dropped_fields.is_empty() {
        println!("  Dropped stale fields:");
        for (path, field) in &outcome.dropped_fields {
            println!("    - {path} :: {field}");
        }
    }
    if !outcome.write_failures.is_empty() {
        println!("  Write failures:");
        for (path, message) in &outcome.write_failures {
            println!("    - {path}: {message}");
        }
    }
}

pub fn yes_no(ok: bool) -> &'static str {
    if ok { "yes" } else { "no" }
}
