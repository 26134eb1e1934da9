//! Operations over whole population maps (entity → member positions), such as those
//! produced by two independently trained engines.

use std::collections::BTreeMap;

use crate::geometry;
use crate::{PopulationMap, PositionMap};

pub const DEFAULT_DEDUP_RADIUS: f64 = 0.1;
pub const DEFAULT_MATCH_RADIUS: f64 = 0.5;

/// Every entity of either map. A's members come first, then each B member that is not
/// strictly within `dedup_radius` of a member already kept.
pub fn union(a: &PopulationMap, b: &PopulationMap, dedup_radius: f64) -> PopulationMap {
    let mut out: PopulationMap = a.clone();
    for (entity, members) in b {
        let combined = out.entry(entity.clone()).or_default();
        for candidate in members {
            let duplicate = combined
                .iter()
                .any(|kept| geometry::distance(kept, candidate) < dedup_radius);
            if !duplicate {
                combined.push(candidate.clone());
            }
        }
    }
    out
}

/// Entities present in both maps, keeping A's members that have some B member strictly
/// within `match_radius`. Entities left without members are dropped.
pub fn intersection(a: &PopulationMap, b: &PopulationMap, match_radius: f64) -> PopulationMap {
    let mut out = BTreeMap::new();
    for (entity, members_a) in a {
        let Some(members_b) = b.get(entity) else {
            continue;
        };
        let matched: Vec<Vec<f64>> = members_a
            .iter()
            .filter(|pa| {
                members_b
                    .iter()
                    .any(|pb| geometry::distance(pa, pb) < match_radius)
            })
            .cloned()
            .collect();
        if !matched.is_empty() {
            out.insert(entity.clone(), matched);
        }
    }
    out
}

/// Arithmetic mean of each entity's members; empty entities are omitted.
pub fn population_means(populations: &PopulationMap) -> PositionMap {
    populations
        .iter()
        .filter_map(|(entity, members)| {
            let dims = members.first()?.len();
            geometry::mean(members.iter().map(Vec::as_slice), dims).map(|m| (entity.clone(), m))
        })
        .collect()
}

/// The `i`-th member of every entity, or its first member when it has fewer.
pub fn configuration(populations: &PopulationMap, i: usize) -> PositionMap {
    populations
        .iter()
        .filter_map(|(entity, members)| {
            members
                .get(i)
                .or_else(|| members.first())
                .map(|p| (entity.clone(), p.clone()))
        })
        .collect()
}

/// Smallest population size across entities (0 for an empty map).
pub fn configuration_count(populations: &PopulationMap) -> usize {
    populations.values().map(Vec::len).min().unwrap_or(0)
}
