//! Dictionary-side helpers: tokenizing, mapping inflected tokens back to entries, and
//! splitting entries into structural and content words.

use std::collections::{BTreeMap, BTreeSet};

/// Suffix rewrites tried in order when a token is not itself an entry.
const SUFFIX_RULES: [(&str, &str); 9] = [
    ("ing", ""),
    ("ed", ""),
    ("es", ""),
    ("s", ""),
    ("ies", "y"),
    ("ting", "t"),
    ("ning", "n"),
    ("ving", "ve"),
    ("king", "ke"),
];

pub const DEFAULT_STRUCTURAL_FRACTION: f64 = 0.20;

/// Lowercased runs of ASCII letters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Map a possibly inflected token onto a known entry.
pub fn stem_to_entry<'a>(token: &str, entries: &'a BTreeSet<String>) -> Option<&'a str> {
    if let Some(entry) = entries.get(token) {
        return Some(entry.as_str());
    }
    for (suffix, replacement) in SUFFIX_RULES {
        if let Some(stem) = token.strip_suffix(suffix) {
            let base = format!("{stem}{replacement}");
            if let Some(entry) = entries.get(&base) {
                return Some(entry.as_str());
            }
        }
    }
    if token == "an" {
        return entries.get("a").map(String::as_str);
    }
    None
}

/// Split `entries` by document frequency across the other entries' definitions.
///
/// An entry that appears in more than `⌊definitions × structural_fraction⌋` definitions
/// (its own excluded) is structural; everything else is content.
pub fn classify_roles(
    definitions: &BTreeMap<String, String>,
    entries: &BTreeSet<String>,
    structural_fraction: f64,
) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
    for (word, definition) in definitions {
        let seen: BTreeSet<&str> = tokenize(definition)
            .iter()
            .filter_map(|t| stem_to_entry(t, entries))
            .filter(|entry| *entry != word.as_str())
            .collect();
        for entry in seen {
            *doc_freq.entry(entry).or_insert(0) += 1;
        }
    }

    let threshold = (definitions.len() as f64 * structural_fraction + 1e-9).floor() as usize;
    entries
        .iter()
        .cloned()
        .partition(|w| doc_freq.get(w.as_str()).copied().unwrap_or(0) > threshold)
}

/// Definitions plus the structural/content split the resolver reasons over.
#[derive(Clone, Debug, Default)]
pub struct Lexicon {
    definitions: BTreeMap<String, String>,
    entries: BTreeSet<String>,
    structural: BTreeSet<String>,
    content: BTreeSet<String>,
}

impl Lexicon {
    /// Build a lexicon, deriving roles with [`classify_roles`].
    ///
    /// Every defined word is an entry, in addition to `extra_entries`.
    pub fn classified<I>(
        definitions: BTreeMap<String, String>,
        extra_entries: I,
        structural_fraction: f64,
    ) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let entries = Self::entry_set(&definitions, extra_entries);
        let (structural, content) = classify_roles(&definitions, &entries, structural_fraction);
        Self {
            definitions,
            entries,
            structural,
            content,
        }
    }

    /// Build a lexicon with caller-supplied roles. Role words become entries too.
    pub fn with_roles<I>(
        definitions: BTreeMap<String, String>,
        extra_entries: I,
        structural: BTreeSet<String>,
        content: BTreeSet<String>,
    ) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut entries = Self::entry_set(&definitions, extra_entries);
        entries.extend(structural.iter().cloned());
        entries.extend(content.iter().cloned());
        Self {
            definitions,
            entries,
            structural,
            content,
        }
    }

    fn entry_set<I>(definitions: &BTreeMap<String, String>, extra: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = String>,
    {
        definitions.keys().cloned().chain(extra).collect()
    }

    pub fn definition(&self, word: &str) -> Option<&str> {
        self.definitions.get(word).map(String::as_str)
    }

    pub fn has_definition(&self, word: &str) -> bool {
        self.definitions.contains_key(word)
    }

    pub fn stem(&self, token: &str) -> Option<&str> {
        stem_to_entry(token, &self.entries)
    }

    /// Entries named by the tokens of `text`, in order; unmappable tokens are dropped.
    pub fn map_tokens(&self, text: &str) -> Vec<&str> {
        tokenize(text).iter().filter_map(|t| self.stem(t)).collect()
    }

    pub fn is_structural(&self, word: &str) -> bool {
        self.structural.contains(word)
    }

    pub fn is_content(&self, word: &str) -> bool {
        self.content.contains(word)
    }

    pub fn entries(&self) -> &BTreeSet<String> {
        &self.entries
    }

    pub fn structural(&self) -> &BTreeSet<String> {
        &self.structural
    }

    pub fn content(&self) -> &BTreeSet<String> {
        &self.content
    }
}
