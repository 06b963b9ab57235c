use crate::support::{
    json_value, load_config_or_exit, load_corpus_or_exit, lock_or_exit, print_apply_block,
    print_json, schemas_or_exit,
};
use canonry_engine::{apply_rename, plan_rename};
use serde_json::json;

pub fn run(
    current_id: String,
    new_id: String,
    corpus: String,
    config: String,
    apply: bool,
    json_output: bool,
) {
    let config = load_config_or_exit(&config);
    let (mut store, root) = load_corpus_or_exit(&corpus);
    let schemas = schemas_or_exit(&config);
    let overrides = config.rename_overrides();

    let target_path = store
        .find_by_id(&current_id)
        .map(|definition| definition.path.clone())
        .unwrap_or_else(|| {
            eprintln!("error: no definition has id `{current_id}`");
            std::process::exit(1);
        });

    let plan = plan_rename(&store, &schemas, &overrides, &target_path, &new_id).unwrap_or_else(
        |e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        },
    );

    if apply {
        let _lock = lock_or_exit(&root);
        let outcome = apply_rename(&mut store, &root, &plan);

        if json_output {
            print_json(&json!({
                "action": "rename.apply",
                "corpusRoot": root.display().to_string(),
                "plan": json_value(&plan),
                "applied": json_value(&outcome),
            }));
        } else {
            println!("canonry rename {current_id} {} --apply", plan.new_id);
            println!("  Target: {}", plan.target_path);
            print_apply_block(&outcome);
        }

        if !outcome.write_failures.is_empty() {
            std::process::exit(1);
        }
    } else {
        if json_output {
            print_json(&json!({
                "action": "rename.plan",
                "corpusRoot": root.display().to_string(),
                "plan": json_value(&plan),
            }));
        } else {
            println!("canonry rename {current_id} {}", plan.new_id);
            println!("  Target: {}", plan.target_path);
            if let Some(raw) = &plan.normalized_from {
                println!("  Proposal normalized from `{raw}`");
            }
            println!("  Operations ({}):", plan.operations.len());
            for operation in &plan.operations {
                println!(
                    "    - {} :: {} -> {}",
                    operation.path, operation.field, operation.new
                );
            }
            println!("  Dry run; pass --apply to write.");
        }
    }
}
