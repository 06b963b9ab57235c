//! Nearest-match suggestion over known identifiers.

use std::collections::BTreeSet;
use strsim::levenshtein;

/// Distance cap for repair suggestions. A close-but-wrong id can still be
/// semantically wrong, so suggestions stay informational.
pub const SUGGEST_MAX_DISTANCE: usize = 3;

/// Closest candidate by Levenshtein distance, `None` when even the best
/// match is farther than `max_distance`. Candidates are walked in sorted
/// order so distance ties resolve to the lexicographically first id.
pub fn nearest_id<'a, I>(candidates: I, raw: &str, max_distance: usize) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut sorted: Vec<&str> = candidates.into_iter().collect();
    sorted.sort_unstable();
    sorted
        .into_iter()
        .min_by_key(|candidate| levenshtein(raw, candidate))
        .filter(|best| levenshtein(raw, best) <= max_distance)
}

/// Deterministic alternate ids offered when `normalized` is already taken:
/// `-variant`, `-alt`, `-v2`, continuing with `-v3`, `-v4`, … when the
/// fixed suffixes are themselves in use. Always returns three candidates.
pub fn duplicate_alternates(normalized: &str, taken: &BTreeSet<String>) -> Vec<String> {
    let mut fixed = [
        format!("{normalized}-variant"),
        format!("{normalized}-alt"),
    ]
    .into_iter();
    let mut version = 2usize;
    let mut out = Vec::with_capacity(3);
    while out.len() < 3 {
        let candidate = match fixed.next() {
            Some(candidate) => candidate,
            None => {
                let candidate = format!("{normalized}-v{version}");
                version += 1;
                candidate
            }
        };
        if !taken.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_within_distance_threshold() {
        let candidates = ["combat.baseDamage", "core.maxHealth"];
        assert_eq!(
            nearest_id(candidates, "combta.baseDamage", SUGGEST_MAX_DISTANCE),
            Some("combat.baseDamage")
        );
    }

    #[test]
    fn rejects_distant_candidates() {
        let candidates = ["zz.completelyUnrelatedThing"];
        assert_eq!(nearest_id(candidates, "core.armor", 3), None);
    }

    #[test]
    fn ties_resolve_to_lexicographically_first() {
        // Both are distance 1 from the probe.
        let candidates = ["core.statB", "core.statA"];
        assert_eq!(nearest_id(candidates, "core.stat", 3), Some("core.statA"));
    }

    #[test]
    fn empty_candidate_set_yields_none() {
        assert_eq!(nearest_id(std::iter::empty(), "core.maxHealth", 3), None);
    }

    #[test]
    fn alternates_follow_the_fixed_suffix_order() {
        let taken = BTreeSet::new();
        assert_eq!(
            duplicate_alternates("unit.soldier", &taken),
            vec![
                "unit.soldier-variant".to_string(),
                "unit.soldier-alt".to_string(),
                "unit.soldier-v2".to_string(),
            ]
        );
    }

    #[test]
    fn alternates_skip_taken_ids() {
        let taken: BTreeSet<String> = ["unit.soldier-alt".to_string(), "unit.soldier-v2".to_string()]
            .into_iter()
            .collect();
        assert_eq!(
            duplicate_alternates("unit.soldier", &taken),
            vec![
                "unit.soldier-variant".to_string(),
                "unit.soldier-v3".to_string(),
                "unit.soldier-v4".to_string(),
            ]
        );
    }
}
