//! Batch search engine over a fixed in-memory document collection:
//! dictionary and inverted-index construction, gap-encoded compression,
//! TF-IDF/cosine ranking, synonym-based query expansion and Precision@k
//! evaluation.

pub mod compress;
pub mod dictionary;
pub mod document;
pub mod error;
pub mod eval;
pub mod expand;
pub mod index;
pub mod persist;
pub mod rank;
pub mod tokenizer;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use crate::compress::CompressedIndex;
pub use crate::dictionary::Dictionary;
pub use crate::document::{DocId, DocMeta, Document};
pub use crate::error::EngineError;
pub use crate::expand::SynonymTable;
pub use crate::index::InvertedIndex;
pub use crate::rank::VectorModel;
pub use crate::tokenizer::AnalyzerOptions;

/// Everything a query needs, built once per collection load. Queries only
/// ever read a snapshot; re-indexing builds a new one and swaps it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub dictionary: Dictionary,
    pub index: InvertedIndex,
    pub model: VectorModel,
    pub docs: HashMap<DocId, DocMeta>,
    pub synonyms: SynonymTable,
    pub analyzer: AnalyzerOptions,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub k: usize,
    pub expand: bool,
    pub weights: HashMap<String, f32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            k: 10,
            expand: false,
            weights: HashMap::new(),
        }
    }
}

impl Snapshot {
    /// Build dictionary, inverted index and vector model from the
    /// preprocessed documents.
    pub fn build(
        documents: &[Document],
        docs: HashMap<DocId, DocMeta>,
        synonyms: SynonymTable,
        analyzer: AnalyzerOptions,
    ) -> Result<Self, EngineError> {
        let dictionary = Dictionary::build(documents)?;
        let index = InvertedIndex::build(documents)?;
        let model = VectorModel::build(documents, &dictionary)?;
        Ok(Self {
            dictionary,
            index,
            model,
            docs,
            synonyms,
            analyzer,
        })
    }

    /// Expand, weight, vectorize and rank a preprocessed query.
    pub fn search(
        &self,
        query_terms: &[String],
        options: &SearchOptions,
    ) -> Result<Vec<(DocId, f32)>, EngineError> {
        let expanded;
        let terms = if options.expand {
            expanded = expand::expand_with_synonyms(query_terms, &self.synonyms);
            expanded.as_slice()
        } else {
            query_terms
        };
        let mut counts = rank::term_counts(terms);
        if !options.weights.is_empty() {
            counts = expand::apply_weights(&counts, &options.weights);
        }
        let query = self.model.query_vector(&counts);
        self.model.rank(&query, options.k)
    }

    pub fn external_id(&self, id: DocId) -> Option<&str> {
        self.docs.get(&id).map(|meta| meta.external_id.as_str())
    }
}
