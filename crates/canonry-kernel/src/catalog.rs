//! Compatibility catalog: legacy identifier aliases and the canonical set.
//!
//! The catalog is append-only. The builtin table covers historical field
//! names, separator variants, and case variants accumulated over the life
//! of the corpus; deployments extend it from config. Aliases never
//! overwrite: the first mapping for a legacy key wins.

use crate::canon::simplify;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatCatalog {
    canonical: BTreeSet<String>,
    aliases: BTreeMap<String, String>,
    recorded_digest: Option<String>,
}

impl CompatCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The static table compiled into the binary.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for id in [
            "combat.attackRange",
            "combat.baseDamage",
            "core.armor",
            "core.maxHealth",
            "core.moveSpeed",
            "economy.buildTime",
            "economy.supplyCost",
        ] {
            catalog.add_canonical(id);
        }
        for (legacy, canonical) in [
            ("attack-range", "combat.attackRange"),
            ("base-damage", "combat.baseDamage"),
            ("baseDamage", "combat.baseDamage"),
            ("build-time", "economy.buildTime"),
            ("hp", "core.maxHealth"),
            ("max-health", "core.maxHealth"),
            ("max_health", "core.maxHealth"),
            ("maxHealth", "core.maxHealth"),
            ("move-speed", "core.moveSpeed"),
            ("movespeed", "core.moveSpeed"),
            ("supply", "economy.supplyCost"),
        ] {
            catalog.add_alias(legacy, canonical);
        }
        catalog
    }

    pub fn add_canonical(&mut self, id: &str) {
        let id = id.trim();
        if !id.is_empty() {
            self.canonical.insert(id.to_string());
        }
    }

    /// Append-only: a legacy key that is already mapped keeps its first
    /// mapping.
    pub fn add_alias(&mut self, legacy: &str, canonical: &str) {
        let legacy = legacy.trim();
        let canonical = canonical.trim();
        if legacy.is_empty() || canonical.is_empty() {
            return;
        }
        self.aliases
            .entry(legacy.to_string())
            .or_insert_with(|| canonical.to_string());
        self.canonical.insert(canonical.to_string());
    }

    /// Extend from config: extra canonical entries plus extra alias pairs.
    pub fn merge<C, A>(&mut self, canonical: C, aliases: A)
    where
        C: IntoIterator<Item = String>,
        A: IntoIterator<Item = (String, String)>,
    {
        for id in canonical {
            self.add_canonical(&id);
        }
        for (legacy, target) in aliases {
            self.add_alias(&legacy, &target);
        }
    }

    pub fn canonical_ids(&self) -> impl Iterator<Item = &str> {
        self.canonical.iter().map(String::as_str)
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn contains(&self, id: &str) -> bool {
        self.canonical.contains(id)
    }

    /// Exact alias-key membership. Strict-mode validation treats a legacy
    /// key as an error even when it still resolves.
    pub fn is_legacy(&self, id: &str) -> bool {
        self.aliases.contains_key(id)
    }

    /// Resolve an identifier to its canonical form: exact alias hit first,
    /// then a simplified-key match against every canonical entry and every
    /// alias key. `None` when nothing matches.
    pub fn resolve(&self, id: &str) -> Option<String> {
        if let Some(canonical) = self.aliases.get(id) {
            return Some(canonical.clone());
        }
        if self.canonical.contains(id) {
            return Some(id.to_string());
        }
        let key = simplify(id);
        if key.is_empty() {
            return None;
        }
        for canonical in &self.canonical {
            if simplify(canonical) == key {
                return Some(canonical.clone());
            }
        }
        for (legacy, canonical) in &self.aliases {
            if simplify(legacy) == key {
                return Some(canonical.clone());
            }
        }
        None
    }

    /// Resolve a drifted identifier against a live id set: a catalog
    /// resolution wins when the canonical form is in `known`; otherwise a
    /// simplified-key match among `known`, accepted only when exactly one
    /// id matches. Deterministic by construction, so the result is safe to
    /// plan as a fix.
    pub fn resolve_among(&self, id: &str, known: &BTreeSet<String>) -> Option<String> {
        if let Some(canonical) = self.resolve(id)
            && known.contains(&canonical)
        {
            return Some(canonical);
        }
        let key = simplify(id);
        if key.is_empty() {
            return None;
        }
        let mut hits = known.iter().filter(|candidate| simplify(candidate) == key);
        let first = hits.next()?;
        if hits.next().is_some() {
            return None;
        }
        Some(first.clone())
    }

    /// A config-extended catalog records its expected digest next to its
    /// entries; a mismatch against [`CompatCatalog::digest`] means the
    /// recorded value is stale.
    pub fn set_recorded_digest(&mut self, digest: Option<String>) {
        self.recorded_digest = digest;
    }

    pub fn recorded_digest(&self) -> Option<&str> {
        self.recorded_digest.as_deref()
    }

    /// Deterministic sha256 over the sorted catalog contents.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for id in &self.canonical {
            hasher.update(b"canonical:");
            hasher.update(id.as_bytes());
            hasher.update(b"\n");
        }
        for (legacy, canonical) in &self.aliases {
            hasher.update(b"alias:");
            hasher.update(legacy.as_bytes());
            hasher.update(b"=");
            hasher.update(canonical.as_bytes());
            hasher.update(b"\n");
        }
        let hash = hasher.finalize();
        format!("{hash:x}")
    }
}
