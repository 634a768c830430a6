use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::EngineError;

/// Term → document frequency over a fixed collection. A term absent from
/// the collection has no entry, so `df` is in `[1, N]` for every stored
/// term.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    df: HashMap<String, u32>,
}

impl Dictionary {
    pub fn build(documents: &[Document]) -> Result<Self, EngineError> {
        if documents.is_empty() {
            return Err(EngineError::EmptyCollection);
        }
        let mut df: HashMap<String, u32> = HashMap::new();
        for doc in documents {
            let distinct: HashSet<&str> = doc.terms.iter().map(String::as_str).collect();
            for term in distinct {
                *df.entry(term.to_string()).or_insert(0) += 1;
            }
        }
        Ok(Self { df })
    }

    /// Document frequency, 0 for terms outside the collection vocabulary.
    pub fn df(&self, term: &str) -> u32 {
        self.df.get(term).copied().unwrap_or(0)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.df.contains_key(term)
    }

    pub fn len(&self) -> usize {
        self.df.len()
    }

    pub fn is_empty(&self) -> bool {
        self.df.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.df.iter().map(|(term, &df)| (term.as_str(), df))
    }

    pub(crate) fn from_entries(df: HashMap<String, u32>) -> Self {
        Self { df }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: u32, terms: &[&str]) -> Document {
        Document::new(id, terms.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn counts_documents_not_occurrences() {
        let docs = vec![doc(1, &["sun", "rain"]), doc(2, &["sun", "sun", "snow"])];
        let dictionary = Dictionary::build(&docs).unwrap();
        assert_eq!(dictionary.df("sun"), 2);
        assert_eq!(dictionary.df("rain"), 1);
        assert_eq!(dictionary.df("snow"), 1);
        assert_eq!(dictionary.len(), 3);
    }

    #[test]
    fn absent_terms_have_no_entry() {
        let docs = vec![doc(1, &["sun"])];
        let dictionary = Dictionary::build(&docs).unwrap();
        assert!(!dictionary.contains("moon"));
        assert_eq!(dictionary.df("moon"), 0);
    }

    #[test]
    fn empty_collection_is_rejected() {
        assert!(matches!(
            Dictionary::build(&[]),
            Err(EngineError::EmptyCollection)
        ));
    }

    #[test]
    fn empty_documents_contribute_no_terms() {
        let docs = vec![doc(1, &[]), doc(2, &["sun"])];
        let dictionary = Dictionary::build(&docs).unwrap();
        assert_eq!(dictionary.len(), 1);
        assert_eq!(dictionary.df("sun"), 1);
    }
}
