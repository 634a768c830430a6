use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::document::{DocId, Document};
use crate::error::EngineError;

/// Term → ascending, duplicate-free posting list. Built once per
/// collection load and read-only afterwards; a rebuild replaces the whole
/// structure.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<DocId>>,
}

impl InvertedIndex {
    /// Index every distinct term of every document. A term occurring
    /// multiple times in one document contributes that id once.
    pub fn build(documents: &[Document]) -> Result<Self, EngineError> {
        if documents.is_empty() {
            return Err(EngineError::EmptyCollection);
        }
        let mut postings: HashMap<String, Vec<DocId>> = HashMap::new();
        for doc in documents {
            let distinct: HashSet<&str> = doc.terms.iter().map(String::as_str).collect();
            for term in distinct {
                postings.entry(term.to_string()).or_default().push(doc.id);
            }
        }
        for list in postings.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        Ok(Self { postings })
    }

    /// Reassemble from posting lists; each list must already be ascending
    /// and duplicate-free.
    pub fn from_postings(postings: HashMap<String, Vec<DocId>>) -> Result<Self, EngineError> {
        for (term, list) in &postings {
            if !is_strictly_ascending(list) {
                return Err(EngineError::MalformedPostingList(format!(
                    "term {term:?}: ids must be ascending and duplicate-free"
                )));
            }
        }
        Ok(Self { postings })
    }

    /// Posting list for a term, empty for unseen terms.
    pub fn postings_for(&self, term: &str) -> &[DocId] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Documents containing every given term; empty when `terms` is empty
    /// or any term is unseen.
    pub fn and_query(&self, terms: &[String]) -> HashSet<DocId> {
        let Some(first) = terms.first() else {
            return HashSet::new();
        };
        let mut result: HashSet<DocId> = self.postings_for(first).iter().copied().collect();
        for term in &terms[1..] {
            if result.is_empty() {
                break;
            }
            let other: HashSet<DocId> = self.postings_for(term).iter().copied().collect();
            result.retain(|id| other.contains(id));
        }
        result
    }

    /// Documents containing any of the given terms.
    pub fn or_query(&self, terms: &[String]) -> HashSet<DocId> {
        let mut result = HashSet::new();
        for term in terms {
            result.extend(self.postings_for(term).iter().copied());
        }
        result
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DocId])> {
        self.postings
            .iter()
            .map(|(term, list)| (term.as_str(), list.as_slice()))
    }
}

pub(crate) fn is_strictly_ascending(ids: &[DocId]) -> bool {
    ids.windows(2).all(|w| w[0] < w[1])
}
