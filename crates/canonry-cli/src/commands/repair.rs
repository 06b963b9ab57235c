use crate::cli::{MissingPolicyArg, RepairModeArg};
use crate::support::{
    json_value, load_config_or_exit, load_corpus_or_exit, lock_or_exit, print_apply_block,
    print_json, print_planned_block, print_report_block, schemas_or_exit,
};
use canonry_engine::{RepairMode, plan_repair, run_repair};
use canonry_graph::ExtractorSet;
use serde_json::json;

pub fn run(
    corpus: String,
    config: String,
    mode: RepairModeArg,
    policy: Option<MissingPolicyArg>,
    max_missing: Option<usize>,
    json_output: bool,
) {
    let config = load_config_or_exit(&config);
    let (mut store, root) = load_corpus_or_exit(&corpus);
    let schemas = schemas_or_exit(&config);
    let catalog = config.catalog();
    let extractors = ExtractorSet::new();

    let mut options = config.repair_options(mode.into());
    if let Some(policy) = policy {
        options.missing_reference_policy = policy.into();
    }
    if let Some(max) = max_missing {
        options.max_missing_references = max;
    }

    let _lock = matches!(options.mode, RepairMode::ApplySafeFixes).then(|| lock_or_exit(&root));
    let outcome = run_repair(&mut store, &root, &schemas, &catalog, &extractors, &options);

    // After an apply pass the printed report describes the pre-apply state;
    // the exit code must describe what is still wrong.
    let errors_remain = if outcome.applied.is_some() {
        let (post_report, _) = plan_repair(&store, &schemas, &catalog, &extractors, &options);
        post_report.has_errors()
    } else {
        outcome.report.has_errors()
    };

    if json_output {
        print_json(&json!({
            "action": "repair",
            "mode": mode.label(),
            "corpusRoot": root.display().to_string(),
            "recordCount": store.len(),
            "report": json_value(&outcome.report),
            "plannedChanges": json_value(&outcome.planned),
            "applied": outcome.applied.as_ref().map(json_value),
            "preview": outcome.preview,
            "errorsRemain": errors_remain,
        }));
    } else if let Some(preview) = &outcome.preview {
        // Preview mode prints only the script so it can be piped to a file.
        print!("{preview}");
    } else {
        println!("canonry repair --mode {}", mode.label());
        println!("  Corpus: {} ({} records)", root.display(), store.len());
        print_report_block(&outcome.report);
        match &outcome.applied {
            Some(applied) => print_apply_block(applied),
            None => {
                print_planned_block(&outcome.planned);
                if !outcome.planned.is_empty() {
                    println!("  Dry run; pass --mode apply to write.");
                }
            }
        }
    }

    let write_failed = outcome
        .applied
        .as_ref()
        .is_some_and(|applied| !applied.write_failures.is_empty());
    if errors_remain || write_failed {
        std::process::exit(1);
    }
}
