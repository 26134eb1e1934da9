use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::geometry;
use crate::lexicon::{self, Lexicon};
use crate::PositionMap;

const DEFAULT_CATEGORIES: [&str; 14] = [
    "animal", "person", "thing", "food", "water", "place", "sound", "color", "part", "name",
    "force", "matter", "wave", "energy",
];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Normalized distance below which the geometric fallback answers "Yes".
    pub yes_threshold: f64,
    /// Normalized distance above which the geometric fallback answers "No".
    pub no_threshold: f64,
    pub max_chain_depth: usize,
    /// Preferred answers for what-is questions, checked before any other content word.
    pub categories: Vec<String>,
    /// Document-frequency fraction above which an entry counts as structural.
    pub structural_fraction: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            yes_threshold: 0.7,
            no_threshold: 1.0,
            max_chain_depth: 3,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            structural_fraction: lexicon::DEFAULT_STRUCTURAL_FRACTION,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Unknown,
    /// An entity named as the category of the subject; rendered with its article.
    Entity(String),
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Yes => write!(f, "Yes"),
            Answer::No => write!(f, "No"),
            Answer::Unknown => write!(f, "I don't know"),
            Answer::Entity(word) => {
                let article = if word.starts_with(['a', 'e', 'i', 'o', 'u']) {
                    "an"
                } else {
                    "a"
                };
                write!(f, "{article} {word}")
            }
        }
    }
}

/// Answers what-is and yes/no questions from definition chains, falling back to geometry.
pub struct Resolver<'a> {
    positions: PositionMap,
    lexicon: &'a Lexicon,
    config: ResolverConfig,
    mean_distance: f64,
}

impl<'a> Resolver<'a> {
    pub fn new(positions: PositionMap, lexicon: &'a Lexicon, config: ResolverConfig) -> Self {
        let mean_distance = mean_pairwise_distance(&positions);
        Self {
            positions,
            lexicon,
            config,
            mean_distance,
        }
    }

    pub fn mean_distance(&self) -> f64 {
        self.mean_distance
    }

    pub fn resolve(&self, query: &str) -> Answer {
        let normalized = query.trim().to_lowercase();
        let normalized = normalized.trim_end_matches('?').trim();
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let mapped = self.lexicon.map_tokens(normalized);

        let answer = match words.as_slice() {
            ["what", "is", ..] => self.resolve_what_is(&mapped),
            ["is" | "can", ..] => self.resolve_yes_no(&mapped),
            _ => Answer::Unknown,
        };
        trace!(query, %answer, "resolved");
        answer
    }

    fn resolve_what_is(&self, mapped: &[&str]) -> Answer {
        let lex = self.lexicon;
        let Some(subject) = mapped
            .iter()
            .copied()
            .find(|w| lex.is_content(w) && lex.has_definition(w))
        else {
            return Answer::Unknown;
        };
        let definition = lex.definition(subject).unwrap_or_default();
        let defined: Vec<&str> = lex.map_tokens(definition);

        if let Some(category) = defined
            .iter()
            .find(|e| **e != subject && self.config.categories.iter().any(|c| c.as_str() == **e))
        {
            return Answer::Entity(category.to_string());
        }
        if let Some(word) = defined
            .iter()
            .find(|e| **e != subject && lex.is_content(e))
        {
            return Answer::Entity(word.to_string());
        }

        let Some(origin) = self.positions.get(subject) else {
            return Answer::Unknown;
        };
        let mut nearest: Option<(f64, &str)> = None;
        for word in lex.content() {
            if word == subject {
                continue;
            }
            if let Some(position) = self.positions.get(word) {
                let d = geometry::distance(origin, position);
                if nearest.map_or(true, |(best, _)| d < best) {
                    nearest = Some((d, word.as_str()));
                }
            }
        }
        nearest.map_or(Answer::Unknown, |(_, w)| Answer::Entity(w.to_string()))
    }

    fn resolve_yes_no(&self, mapped: &[&str]) -> Answer {
        let lex = self.lexicon;
        let content: Vec<&str> = mapped.iter().copied().filter(|w| lex.is_content(w)).collect();

        if content.len() < 2 {
            let Some(&subject) = content.first() else {
                return Answer::Unknown;
            };
            return match mapped
                .iter()
                .rev()
                .find(|w| !lex.is_structural(w) && **w != subject)
            {
                Some(property) => self.check_chain(subject, property),
                None => Answer::Unknown,
            };
        }

        self.check_chain(content[0], content[content.len() - 1])
    }

    /// Identity, then explicit negation, then a breadth-first walk through content
    /// definitions, then normalized distance.
    fn check_chain(&self, subject: &str, target: &str) -> Answer {
        if subject == target {
            return Answer::Yes;
        }
        let lex = self.lexicon;
        let subject_definition = lex.definition(subject).unwrap_or_default();

        if negated_entries(lex, subject_definition).contains(&target) {
            return Answer::No;
        }
        let subject_entries: BTreeSet<&str> = lex.map_tokens(subject_definition).into_iter().collect();
        let target_definition = lex.definition(target).unwrap_or_default();
        if negated_entries(lex, target_definition)
            .iter()
            .any(|e| subject_entries.contains(e))
        {
            return Answer::No;
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut frontier = vec![subject];
        for _ in 0..self.config.max_chain_depth {
            let mut next = Vec::new();
            for word in frontier {
                if !visited.insert(word) {
                    continue;
                }
                for entry in lex.map_tokens(lex.definition(word).unwrap_or_default()) {
                    if entry == target {
                        return Answer::Yes;
                    }
                    if !visited.contains(entry) && lex.is_content(entry) && lex.has_definition(entry)
                    {
                        next.push(entry);
                    }
                }
            }
            frontier = next;
        }

        if let (Some(a), Some(b)) = (self.positions.get(subject), self.positions.get(target)) {
            let d = geometry::distance(a, b);
            let normalized = if self.mean_distance > 0.0 {
                d / self.mean_distance
            } else {
                d
            };
            if normalized < self.config.yes_threshold {
                return Answer::Yes;
            }
            if normalized > self.config.no_threshold {
                return Answer::No;
            }
        }
        Answer::Unknown
    }
}

/// Entries that directly follow a "not" in `definition`.
fn negated_entries<'l>(lex: &'l Lexicon, definition: &str) -> Vec<&'l str> {
    lexicon::tokenize(definition)
        .windows(2)
        .filter(|pair| pair[0] == "not")
        .filter_map(|pair| lex.stem(&pair[1]))
        .collect()
}

/// Mean Euclidean distance over all unordered pairs; 1.0 when there are no pairs.
pub fn mean_pairwise_distance(positions: &PositionMap) -> f64 {
    let points: Vec<&Vec<f64>> = positions.values().collect();
    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            total += geometry::distance(a, b);
            pairs += 1;
        }
    }
    if pairs == 0 {
        1.0
    } else {
        total / pairs as f64
    }
}
