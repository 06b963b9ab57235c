use crate::support::{
    json_value, load_corpus_or_exit, lock_or_exit, print_apply_block, print_json,
    print_planned_block, print_report_block,
};
use canonry_engine::bulk_normalize;
use serde_json::json;

pub fn run(corpus: String, apply: bool, json_output: bool) {
    let (mut store, root) = load_corpus_or_exit(&corpus);

    let _lock = apply.then(|| lock_or_exit(&root));
    let outcome = bulk_normalize(&mut store, &root, apply);
    let partition = &outcome.partition;

    if json_output {
        print_json(&json!({
            "action": "normalize",
            "corpusRoot": root.display().to_string(),
            "recordCount": store.len(),
            "alreadyCanonical": partition.already_canonical.len(),
            "normalizable": partition.clean.len(),
            "collisionGroups": partition.collisions.len(),
            "invalid": partition.invalid.len(),
            "blank": partition.blank.len(),
            "report": json_value(&outcome.report),
            "plannedChanges": json_value(&outcome.planned),
            "applied": outcome.applied.as_ref().map(json_value),
        }));
    } else {
        println!("canonry normalize");
        println!("  Corpus: {} ({} records)", root.display(), store.len());
        println!("  Already canonical: {}", partition.already_canonical.len());
        println!("  Normalizable: {}", partition.clean.len());
        println!("  Collision groups: {}", partition.collisions.len());
        println!("  Invalid: {}", partition.invalid.len());
        println!("  Blank: {}", partition.blank.len());
        print_report_block(&outcome.report);
        match &outcome.applied {
            Some(applied) => print_apply_block(applied),
            None => {
                print_planned_block(&outcome.planned);
                if !outcome.planned.is_empty() {
                    println!("  Dry run; pass --apply to write.");
                }
            }
        }
    }

    // Collisions, invalid forms, and blank ids stay unfixed either way.
    let write_failed = outcome
        .applied
        .as_ref()
        .is_some_and(|applied| !applied.write_failures.is_empty());
    if outcome.report.has_errors() || write_failed {
        std::process::exit(1);
    }
}
