//! Canonical in-memory representation of corpus state.
//!
//! Definitions are keyed by their relative file path, not their id:
//! duplicate ids are a condition the engines must be able to observe and
//! report, so the store never collapses them.

use crate::definition::Definition;
use std::collections::{BTreeMap, BTreeSet};

/// In-memory corpus state with deterministic path-ordered iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    definitions: BTreeMap<String, Definition>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a corpus from materialized records. Each definition gets its
    /// path attached; a repeated path is last-write-wins, matching the
    /// on-disk reality of one file per path.
    pub fn from_definitions(definitions: Vec<(String, Definition)>) -> Self {
        let mut corpus = Self::new();
        for (path, definition) in definitions {
            corpus.insert(&path, definition);
        }
        corpus
    }

    pub fn insert(&mut self, path: &str, mut definition: Definition) -> Option<Definition> {
        definition.path = path.to_string();
        self.definitions.insert(path.to_string(), definition)
    }

    pub fn get(&self, path: &str) -> Option<&Definition> {
        self.definitions.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Definition> {
        self.definitions.get_mut(path)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All definitions in path order.
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }

    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Definition> {
        self.definitions()
            .filter(move |definition| definition.kind == kind)
    }

    /// First definition (in path order) whose current id matches.
    pub fn find_by_id(&self, id: &str) -> Option<&Definition> {
        self.definitions()
            .find(|definition| definition.id == id)
    }

    pub fn contains(&self, kind: &str, id: &str) -> bool {
        self.of_kind(kind).any(|definition| definition.id == id)
    }

    /// Every non-empty current id in the corpus.
    pub fn id_set(&self) -> BTreeSet<String> {
        self.definitions()
            .filter(|definition| !definition.id.is_empty())
            .map(|definition| definition.id.clone())
            .collect()
    }
}
