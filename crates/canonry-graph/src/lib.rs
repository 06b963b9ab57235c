//! # Canonry Graph
//!
//! The reference graph over a corpus: directed edges from reference-bearing
//! fields to the definitions they name, with outgoing/incoming lookups,
//! dangling-edge detection, orphan detection, deletion-safety checks, and
//! bounded dependency-chain tracing.
//!
//! The graph is built, never authored: [`build_reference_graph`] derives
//! every edge from schema reference rules plus per-kind custom extractors.

use canonry_corpus::{Corpus, Definition, SchemaSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Graph node: one definition, keyed by kind and id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeKey {
    pub kind: String,
    pub id: String,
}

impl NodeKey {
    pub fn new(kind: &str, id: &str) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingRef {
    pub field: String,
    pub target_kind: String,
    pub target_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingRef {
    pub source_kind: String,
    pub source_id: String,
    pub field: String,
}

/// A dangling edge: its target key was never registered as a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingReference {
    pub source_kind: String,
    pub source_id: String,
    pub field: String,
    pub target_kind: String,
    pub target_id: String,
}

/// Directed reference graph with deterministic iteration everywhere.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    nodes: BTreeSet<NodeKey>,
    outgoing: BTreeMap<NodeKey, Vec<OutgoingRef>>,
    incoming: BTreeMap<NodeKey, Vec<IncomingRef>>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. Idempotent; blank kind or id is a no-op.
    pub fn add_definition(&mut self, kind: &str, id: &str) {
        if kind.is_empty() || id.is_empty() {
            return;
        }
        self.nodes.insert(NodeKey::new(kind, id));
    }

    /// Append an edge to both indices. Any blank argument is a no-op.
    pub fn add_reference(
        &mut self,
        source_kind: &str,
        source_id: &str,
        field: &str,
        target_kind: &str,
        target_id: &str,
    ) {
        if source_kind.is_empty()
            || source_id.is_empty()
            || field.is_empty()
            || target_kind.is_empty()
            || target_id.is_empty()
        {
            return;
        }
        self.outgoing
            .entry(NodeKey::new(source_kind, source_id))
            .or_default()
            .push(OutgoingRef {
                field: field.to_string(),
                target_kind: target_kind.to_string(),
                target_id: target_id.to_string(),
            });
        self.incoming
            .entry(NodeKey::new(target_kind, target_id))
            .or_default()
            .push(IncomingRef {
                source_kind: source_kind.to_string(),
                source_id: source_id.to_string(),
                field: field.to_string(),
            });
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, kind: &str, id: &str) -> bool {
        self.nodes.contains(&NodeKey::new(kind, id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeKey> {
        self.nodes.iter()
    }

    pub fn outgoing(&self, kind: &str, id: &str) -> &[OutgoingRef] {
        self.outgoing
            .get(&NodeKey::new(kind, id))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn incoming(&self, kind: &str, id: &str) -> &[IncomingRef] {
        self.incoming
            .get(&NodeKey::new(kind, id))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Walk every outgoing edge and collect those whose target was never
    /// registered, stopping early once `max` are found.
    pub fn missing_references(&self, max: usize) -> Vec<MissingReference> {
        let mut out = Vec::new();
        for (source, edges) in &self.outgoing {
            for edge in edges {
                if out.len() >= max {
                    return out;
                }
                let target = NodeKey::new(&edge.target_kind, &edge.target_id);
                if !self.nodes.contains(&target) {
                    out.push(MissingReference {
                        source_kind: source.kind.clone(),
                        source_id: source.id.clone(),
                        field: edge.field.clone(),
                        target_kind: edge.target_kind.clone(),
                        target_id: edge.target_id.clone(),
                    });
                }
            }
        }
        out
    }

    /// Registered nodes with zero inbound edges.
    pub fn orphans(&self) -> Vec<NodeKey> {
        self.nodes
            .iter()
            .filter(|node| {
                self.incoming
                    .get(node)
                    .is_none_or(|edges| edges.is_empty())
            })
            .cloned()
            .collect()
    }

    /// Deletable iff nothing points at the node; otherwise lists who would
    /// break.
    pub fn can_delete(&self, kind: &str, id: &str) -> (bool, Vec<IncomingRef>) {
        let dependents = self.incoming(kind, id).to_vec();
        (dependents.is_empty(), dependents)
    }

    /// Follow one inbound edge at a time (first in deterministic order),
    /// rendering `Kind:id (field) <- Kind:id (field) <- …` for up to
    /// `max_depth` hops. Stops on depth, exhaustion, or a node revisit.
    /// `None` when the node is unknown or nothing points at it.
    pub fn dependency_chain(&self, kind: &str, id: &str, max_depth: usize) -> Option<String> {
        let start = NodeKey::new(kind, id);
        if !self.nodes.contains(&start) {
            return None;
        }
        if self.incoming.get(&start).is_none_or(|edges| edges.is_empty()) {
            return None;
        }

        let mut chain = String::new();
        let mut visited = BTreeSet::new();
        visited.insert(start.clone());
        let mut current = start;
        let mut depth = 0usize;
        loop {
            let inbound = if depth < max_depth {
                self.incoming.get(&current).and_then(|edges| edges.first())
            } else {
                None
            };
            match inbound {
                Some(edge) => {
                    chain.push_str(&format!("{current} ({})", edge.field));
                    let next = NodeKey::new(&edge.source_kind, &edge.source_id);
                    chain.push_str(" <- ");
                    if visited.contains(&next) {
                        chain.push_str(&next.to_string());
                        break;
                    }
                    visited.insert(next.clone());
                    current = next;
                    depth += 1;
                }
                None => {
                    chain.push_str(&current.to_string());
                    break;
                }
            }
        }
        Some(chain)
    }
}

/// One custom-extracted reference bundle: the field path it came from, the
/// ids it holds, and the kinds those ids may belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedReference {
    pub field: String,
    pub ids: Vec<String>,
    pub targets: Vec<String>,
}

/// Per-kind extraction hook for id-bearing substructures the schema model
/// cannot express.
pub type ReferenceExtractor = fn(&Definition) -> Vec<ExtractedReference>;

#[derive(Debug, Clone, Default)]
pub struct ExtractorSet {
    by_kind: BTreeMap<String, Vec<ReferenceExtractor>>,
}

impl ExtractorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: &str, extractor: ReferenceExtractor) {
        self.by_kind
            .entry(kind.to_string())
            .or_default()
            .push(extractor);
    }

    pub fn for_kind(&self, kind: &str) -> &[ReferenceExtractor] {
        self.by_kind
            .get(kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Single full pass over the corpus: register every definition, then derive
/// edges from schema reference rules and custom extractors.
///
/// A referenced id fans out to one edge per allowed target kind it exists
/// under; when it exists under none, it fans out to every allowed kind so
/// dangling-edge detection can report under each candidate.
pub fn build_reference_graph(
    corpus: &Corpus,
    schemas: &SchemaSet,
    extractors: &ExtractorSet,
) -> ReferenceGraph {
    let mut graph = ReferenceGraph::new();
    for definition in corpus.definitions() {
        graph.add_definition(&definition.kind, &definition.id);
    }
    for definition in corpus.definitions() {
        if definition.id.is_empty() {
            continue;
        }
        if let Some(schema) = schemas.schema(&definition.kind) {
            for rule in schema.reference_rules() {
                for (field, id) in rule.referenced_ids(definition) {
                    add_fanout(
                        &mut graph,
                        corpus,
                        &definition.kind,
                        &definition.id,
                        &field,
                        &rule.targets,
                        &id,
                    );
                }
            }
        }
        for extractor in extractors.for_kind(&definition.kind) {
            for extracted in extractor(definition) {
                for id in &extracted.ids {
                    add_fanout(
                        &mut graph,
                        corpus,
                        &definition.kind,
                        &definition.id,
                        &extracted.field,
                        &extracted.targets,
                        id,
                    );
                }
            }
        }
    }
    graph
}

fn add_fanout(
    graph: &mut ReferenceGraph,
    corpus: &Corpus,
    source_kind: &str,
    source_id: &str,
    field: &str,
    targets: &[String],
    id: &str,
) {
    let existing: Vec<&String> = targets
        .iter()
        .filter(|kind| corpus.contains(kind, id))
        .collect();
    if existing.is_empty() {
        for kind in targets {
            graph.add_reference(source_kind, source_id, field, kind, id);
        }
    } else {
        for kind in existing {
            graph.add_reference(source_kind, source_id, field, kind, id);
        }
    }
}
