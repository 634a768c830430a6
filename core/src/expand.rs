use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Term → alternative terms. Static configuration: assembled once from the
/// seed table and/or a caller-supplied file, read-only during expansion.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymTable {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl SynonymTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in weather-domain seed table.
    pub fn seed() -> Self {
        let entries: &[(&str, &[&str])] = &[
            ("weather", &["climate", "temperature", "condition"]),
            ("temperature", &["heat", "cold", "warm"]),
            ("rain", &["precipitation", "rainfall", "wet"]),
            ("snow", &["snowfall", "snowstorm", "blizzard"]),
            ("sun", &["sunny", "bright", "clear"]),
            ("wind", &["breeze", "gust", "storm"]),
            ("beach", &["shore", "coast", "seaside"]),
            ("outdoor", &["outside", "outdoors", "exterior"]),
            ("activity", &["action", "sport"]),
            ("enjoy", &["like", "love", "appreciate"]),
            ("plan", &["schedule", "arrange", "organize"]),
            ("relax", &["rest", "relieve", "unwind"]),
            ("season", &["period", "time", "quarter"]),
            ("change", &["alter", "modify", "transform"]),
            ("predict", &["forecast", "prognosticate", "anticipate"]),
            ("unpredictable", &["erratic", "unstable", "variable"]),
        ];
        let mut table = Self::empty();
        for (term, synonyms) in entries {
            table.insert(term, synonyms.iter().copied());
        }
        table
    }

    /// Register synonyms for a term, lowercased and trimmed; unions with
    /// any existing entry.
    pub fn insert<I, S>(&mut self, term: &str, synonyms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = self.entries.entry(term.trim().to_lowercase()).or_default();
        for synonym in synonyms {
            let synonym = synonym.into().trim().to_lowercase();
            if !synonym.is_empty() {
                set.insert(synonym);
            }
        }
    }

    pub fn synonyms_for(&self, term: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(term)
    }

    /// Union-merge: synonym sets of shared terms are combined, other
    /// entries are taken as-is.
    pub fn merge(&mut self, other: SynonymTable) {
        for (term, synonyms) in other.entries {
            self.entries.entry(term).or_default().extend(synonyms);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.entries.iter().map(|(term, set)| (term.as_str(), set))
    }
}

/// Append each query term's synonyms after the original tokens. Originals
/// are always retained; terms without an entry pass through unchanged. The
/// result is a token list, so a synonym shared by several query terms
/// counts once per occurrence in the query term frequencies.
pub fn expand_with_synonyms(query_terms: &[String], table: &SynonymTable) -> Vec<String> {
    let mut expanded = query_terms.to_vec();
    for term in query_terms {
        if let Some(synonyms) = table.synonyms_for(term) {
            expanded.extend(synonyms.iter().cloned());
        }
    }
    expanded
}

/// Multiply each term's count by its configured weight; unconfigured terms
/// keep weight 1. Applied after expansion so synonym-introduced terms can
/// be boosted too.
pub fn apply_weights(
    counts: &HashMap<String, f32>,
    weights: &HashMap<String, f32>,
) -> HashMap<String, f32> {
    counts
        .iter()
        .map(|(term, &count)| {
            let weight = weights.get(term).copied().unwrap_or(1.0);
            (term.clone(), count * weight)
        })
        .collect()
}
