use crate::support::{
    json_value, load_config_or_exit, load_corpus_or_exit, print_json, print_report_block,
    schemas_or_exit,
};
use canonry_engine::validate_corpus;
use serde_json::json;

pub fn run(corpus: String, config: String, strict: bool, json_output: bool) {
    let config = load_config_or_exit(&config);
    let (store, root) = load_corpus_or_exit(&corpus);
    let schemas = schemas_or_exit(&config);
    let catalog = config.catalog();
    let options = config.validate_options(strict);

    let report = validate_corpus(&store, &schemas, &catalog, &options);

    if json_output {
        print_json(&json!({
            "action": "validate",
            "corpusRoot": root.display().to_string(),
            "recordCount": store.len(),
            "strict": strict,
            "report": json_value(&report),
        }));
    } else {
        println!("canonry validate");
        println!("  Corpus: {} ({} records)", root.display(), store.len());
        if strict {
            println!("  Strict: legacy aliases flagged");
        }
        print_report_block(&report);
    }

    if report.has_errors() {
        std::process::exit(1);
    }
}
