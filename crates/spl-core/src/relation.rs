use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::rng;

/// The connector words linking two entities in a definition, e.g. `["is", "a"]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorPattern(pub Vec<String>);

impl ConnectorPattern {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(words.into_iter().map(Into::into).collect())
    }

    pub fn words(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ConnectorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

fn default_weight() -> f64 {
    1.0
}

/// A relation as supplied by the extraction collaborator, before entity interning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelationSpec {
    pub left: String,
    pub right: String,
    pub pattern: ConnectorPattern,
    #[serde(default)]
    pub negated: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl RelationSpec {
    pub fn new(left: impl Into<String>, right: impl Into<String>, pattern: ConnectorPattern) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            pattern,
            negated: false,
            weight: 1.0,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// Serialized form of one direction table entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectorEntry {
    pub pattern: ConnectorPattern,
    pub direction: Vec<f64>,
}

/// Ordered connector pattern → direction table.
///
/// Directions are shared by reference with every relation and predator that uses the
/// pattern. Insertion order is kept because predators are created per entry, in order.
#[derive(Clone, Debug, Default)]
pub struct ConnectorDirections {
    entries: Vec<(ConnectorPattern, Arc<[f64]>)>,
    lookup: HashMap<ConnectorPattern, usize>,
}

impl ConnectorDirections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Returns `false` (and leaves the table untouched) when the pattern
    /// is already present; duplicates are reported by the engine at initialization.
    pub fn insert(&mut self, pattern: ConnectorPattern, direction: Vec<f64>) -> bool {
        if self.lookup.contains_key(&pattern) {
            return false;
        }
        self.lookup.insert(pattern.clone(), self.entries.len());
        self.entries.push((pattern, direction.into()));
        true
    }

    /// One random unit direction per pattern, drawn in the given order from a single
    /// stream seeded with `seed`.
    pub fn generate<I>(patterns: I, dimensions: usize, seed: u64) -> Self
    where
        I: IntoIterator<Item = ConnectorPattern>,
    {
        let mut rng = rng::create_rng(seed);
        let mut table = Self::new();
        for pattern in patterns {
            if table.lookup.contains_key(&pattern) {
                continue;
            }
            let direction = rng::random_unit_vector(&mut rng, dimensions);
            table.insert(pattern, direction);
        }
        table
    }

    /// Generate directions for every pattern used by `relations` that occurs at least
    /// `min_frequency` times. Patterns are ordered by descending frequency, then
    /// lexicographically, before drawing.
    pub fn from_relation_frequencies(
        relations: &[RelationSpec],
        min_frequency: usize,
        dimensions: usize,
        seed: u64,
    ) -> Self {
        let mut freq: BTreeMap<&ConnectorPattern, usize> = BTreeMap::new();
        for r in relations {
            *freq.entry(&r.pattern).or_insert(0) += 1;
        }
        let mut candidates: Vec<(&ConnectorPattern, usize)> = freq
            .into_iter()
            .filter(|(p, count)| *count >= min_frequency && !p.0.is_empty())
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        Self::generate(candidates.into_iter().map(|(p, _)| p.clone()), dimensions, seed)
    }

    pub fn from_entries(entries: Vec<ConnectorEntry>) -> Result<Self, ConnectorPattern> {
        let mut table = Self::new();
        for entry in entries {
            if !table.insert(entry.pattern.clone(), entry.direction) {
                return Err(entry.pattern);
            }
        }
        Ok(table)
    }

    pub fn to_entries(&self) -> Vec<ConnectorEntry> {
        self.entries
            .iter()
            .map(|(pattern, direction)| ConnectorEntry {
                pattern: pattern.clone(),
                direction: direction.to_vec(),
            })
            .collect()
    }

    pub fn get(&self, pattern: &ConnectorPattern) -> Option<&Arc<[f64]>> {
        self.lookup.get(pattern).map(|&i| &self.entries[i].1)
    }

    pub fn position(&self, pattern: &ConnectorPattern) -> Option<usize> {
        self.lookup.get(pattern).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConnectorPattern, &Arc<[f64]>)> {
        self.entries.iter().map(|(p, d)| (p, d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retain only the relations whose pattern has a direction. Collaborators that filter
    /// rare connectors call this before handing relations to the engine.
    pub fn filter_relations(&self, relations: Vec<RelationSpec>) -> Vec<RelationSpec> {
        relations
            .into_iter()
            .filter(|r| self.lookup.contains_key(&r.pattern))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::norm;

    fn pat(words: &[&str]) -> ConnectorPattern {
        ConnectorPattern::new(words.iter().copied())
    }

    #[test]
    fn generated_directions_are_unit_and_deterministic() {
        let patterns = vec![pat(&["is", "a"]), pat(&["can"])];
        let a = ConnectorDirections::generate(patterns.clone(), 8, 42);
        let b = ConnectorDirections::generate(patterns, 8, 42);
        assert_eq!(a.len(), 2);
        for ((pa, da), (pb, db)) in a.iter().zip(b.iter()) {
            assert_eq!(pa, pb);
            assert_eq!(da, db);
            assert!((norm(da) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn frequency_ordering_and_minimum() {
        let relations = vec![
            RelationSpec::new("a", "b", pat(&["can"])),
            RelationSpec::new("a", "c", pat(&["is", "a"])),
            RelationSpec::new("b", "c", pat(&["is", "a"])),
            RelationSpec::new("c", "d", pat(&["has"])),
            RelationSpec::new("d", "e", pat(&["can"])),
            RelationSpec::new("d", "b", pat(&["is", "a"])),
        ];
        let table = ConnectorDirections::from_relation_frequencies(&relations, 2, 4, 1);
        let order: Vec<String> = table.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(order, vec!["is a".to_string(), "can".to_string()]);
        assert!(table.get(&pat(&["has"])).is_none());

        let kept = table.filter_relations(relations);
        assert_eq!(kept.len(), 5);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut table = ConnectorDirections::new();
        assert!(table.insert(pat(&["is"]), vec![1.0, 0.0]));
        assert!(!table.insert(pat(&["is"]), vec![0.0, 1.0]));
        assert_eq!(table.get(&pat(&["is"])).unwrap().as_ref(), &[1.0, 0.0]);
    }

    #[test]
    fn relation_spec_json_defaults() {
        let json = r#"{ "left": "dog", "right": "animal", "pattern": ["is", "an"] }"#;
        let spec: RelationSpec = serde_json::from_str(json).unwrap();
        assert!(!spec.negated);
        assert_eq!(spec.weight, 1.0);
        assert_eq!(spec.pattern.to_string(), "is an");
    }
}
