use crate::cli::GraphCommands;
use crate::support::{
    json_value, load_config_or_exit, load_corpus_or_exit, print_json, print_report_block,
    schemas_or_exit, yes_no,
};
use canonry_corpus::Corpus;
use canonry_graph::{ExtractorSet, ReferenceGraph, build_reference_graph};
use canonry_kernel::report::{CLASS_GRAPH_DANGLING, CLASS_GRAPH_ORPHANED};
use canonry_kernel::{Issue, Severity, ValidationReport};
use serde_json::json;

pub fn run(command: GraphCommands) {
    match command {
        GraphCommands::Outgoing {
            id,
            corpus,
            config,
            json,
        } => run_outgoing(id, corpus, config, json),

        GraphCommands::Incoming {
            id,
            corpus,
            config,
            json,
        } => run_incoming(id, corpus, config, json),

        GraphCommands::Chain {
            id,
            max_depth,
            corpus,
            config,
            json,
        } => run_chain(id, max_depth, corpus, config, json),

        GraphCommands::CanDelete {
            id,
            corpus,
            config,
            json,
        } => run_can_delete(id, corpus, config, json),

        GraphCommands::Orphans {
            corpus,
            config,
            json,
        } => run_orphans(corpus, config, json),

        GraphCommands::Missing {
            max,
            corpus,
            config,
            json,
        } => run_missing(max, corpus, config, json),
    }
}

fn load_graph(corpus_arg: &str, config_arg: &str) -> (Corpus, ReferenceGraph) {
    let config = load_config_or_exit(config_arg);
    let (store, _root) = load_corpus_or_exit(corpus_arg);
    let schemas = schemas_or_exit(&config);
    let graph = build_reference_graph(&store, &schemas, &ExtractorSet::new());
    (store, graph)
}

fn node_or_exit(store: &Corpus, id: &str) -> (String, String) {
    let definition = store.find_by_id(id).unwrap_or_else(|| {
        eprintln!("error: no definition has id `{id}`");
        std::process::exit(1);
    });
    (definition.kind.clone(), definition.id.clone())
}

fn run_outgoing(id: String, corpus: String, config: String, json_output: bool) {
    let (store, graph) = load_graph(&corpus, &config);
    let (kind, id) = node_or_exit(&store, &id);
    let references = graph.outgoing(&kind, &id);

    if json_output {
        print_json(&json!({
            "action": "graph.outgoing",
            "kind": kind,
            "id": id,
            "references": json_value(&references),
        }));
    } else {
        println!("canonry graph outgoing {id}");
        println!("  References held by {kind}:{id} ({}):", references.len());
        for reference in references {
            println!(
                "    - {} -> {}:{}",
                reference.field, reference.target_kind, reference.target_id
            );
        }
    }
}

fn run_incoming(id: String, corpus: String, config: String, json_output: bool) {
    let (store, graph) = load_graph(&corpus, &config);
    let (kind, id) = node_or_exit(&store, &id);
    let references = graph.incoming(&kind, &id);

    if json_output {
        print_json(&json!({
            "action": "graph.incoming",
            "kind": kind,
            "id": id,
            "references": json_value(&references),
        }));
    } else {
        println!("canonry graph incoming {id}");
        println!("  References to {kind}:{id} ({}):", references.len());
        for reference in references {
            println!(
                "    - {}:{} ({})",
                reference.source_kind, reference.source_id, reference.field
            );
        }
    }
}

fn run_chain(id: String, max_depth: usize, corpus: String, config: String, json_output: bool) {
    let (store, graph) = load_graph(&corpus, &config);
    let (kind, id) = node_or_exit(&store, &id);
    let chain = graph.dependency_chain(&kind, &id, max_depth);

    if json_output {
        print_json(&json!({
            "action": "graph.chain",
            "kind": kind,
            "id": id,
            "maxDepth": max_depth,
            "chain": chain,
        }));
    } else {
        println!("canonry graph chain {id}");
        match chain {
            Some(chain) => println!("  {chain}"),
            None => println!("  No inbound references."),
        }
    }
}

fn run_can_delete(id: String, corpus: String, config: String, json_output: bool) {
    let (store, graph) = load_graph(&corpus, &config);
    let (kind, id) = node_or_exit(&store, &id);
    let (deletable, blockers) = graph.can_delete(&kind, &id);

    if json_output {
        print_json(&json!({
            "action": "graph.canDelete",
            "kind": kind,
            "id": id,
            "deletable": deletable,
            "blockers": json_value(&blockers),
        }));
    } else {
        println!("canonry graph can-delete {id}");
        println!("  Deletable: {}", yes_no(deletable));
        for blocker in &blockers {
            println!(
                "    - {}:{} ({})",
                blocker.source_kind, blocker.source_id, blocker.field
            );
        }
    }

    if !deletable {
        std::process::exit(1);
    }
}

fn run_orphans(corpus: String, config: String, json_output: bool) {
    let (_store, graph) = load_graph(&corpus, &config);
    let orphans = graph.orphans();

    let mut report = ValidationReport::new();
    for node in &orphans {
        let mut issue = Issue::new(
            CLASS_GRAPH_ORPHANED,
            Severity::Info,
            &node.kind,
            format!("`{node}` has no inbound references"),
        );
        issue.id = Some(node.id.clone());
        report.push(issue);
    }

    if json_output {
        print_json(&json!({
            "action": "graph.orphans",
            "nodeCount": graph.node_count(),
            "orphanCount": orphans.len(),
            "report": json_value(&report),
        }));
    } else {
        println!("canonry graph orphans");
        println!("  Graph: {} nodes, {} orphaned", graph.node_count(), orphans.len());
        print_report_block(&report);
    }
}

fn run_missing(max: usize, corpus: String, config: String, json_output: bool) {
    let (_store, graph) = load_graph(&corpus, &config);
    let missing = graph.missing_references(max);

    let mut report = ValidationReport::new();
    for reference in &missing {
        let mut issue = Issue::new(
            CLASS_GRAPH_DANGLING,
            Severity::Error,
            &reference.source_kind,
            format!(
                "field `{}` on `{}:{}` points to missing `{}:{}`",
                reference.field,
                reference.source_kind,
                reference.source_id,
                reference.target_kind,
                reference.target_id
            ),
        );
        issue.id = Some(reference.source_id.clone());
        issue.field = Some(reference.field.clone());
        report.push(issue);
    }

    if json_output {
        print_json(&json!({
            "action": "graph.missing",
            "missingCount": missing.len(),
            "maxReported": max,
            "report": json_value(&report),
        }));
    } else {
        println!("canonry graph missing");
        print_report_block(&report);
    }

    if report.has_errors() {
        std::process::exit(1);
    }
}
