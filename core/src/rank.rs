use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::document::{DocId, Document};
use crate::error::EngineError;

/// Sparse term-weight vector; absent terms weigh 0.
pub type SparseVector = HashMap<String, f32>;

/// Normalized term frequency: raw count over document length, 0 for an
/// empty document.
pub fn tf(count: u32, doc_len: usize) -> f32 {
    if doc_len == 0 {
        0.0
    } else {
        count as f32 / doc_len as f32
    }
}

/// Inverse document frequency `ln(N / df)`; 0 when the term is unseen so
/// open-vocabulary queries never fault.
pub fn idf(df: u32, num_docs: u32) -> f32 {
    if df == 0 || num_docs == 0 {
        0.0
    } else {
        (num_docs as f32 / df as f32).ln()
    }
}

/// Cosine similarity over the shared terms of two sparse vectors; 0 when
/// either norm is 0.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f32 {
    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f32 = small
        .iter()
        .filter_map(|(term, wa)| large.get(term).map(|wb| wa * wb))
        .sum();
    dot / (norm_a * norm_b)
}

fn norm(vector: &SparseVector) -> f32 {
    vector.values().map(|w| w * w).sum::<f32>().sqrt()
}

/// Raw term counts of a query token sequence, the query-side analogue of a
/// document's term frequencies. Counts are `f32` so weight multipliers can
/// be applied before vectorization.
pub fn term_counts(terms: &[String]) -> HashMap<String, f32> {
    let mut counts: HashMap<String, f32> = HashMap::new();
    for term in terms {
        *counts.entry(term.clone()).or_insert(0.0) += 1.0;
    }
    counts
}

/// Precomputed TF-IDF model: idf per term, sparse weight vector and norm
/// per document. Immutable once built; ranking only reads it.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorModel {
    idf: HashMap<String, f32>,
    vectors: HashMap<DocId, SparseVector>,
    norms: HashMap<DocId, f32>,
    num_docs: u32,
}

impl VectorModel {
    pub fn build(documents: &[Document], dictionary: &Dictionary) -> Result<Self, EngineError> {
        if documents.is_empty() {
            return Err(EngineError::EmptyCollection);
        }
        let num_docs = documents.len() as u32;
        let mut idf_table: HashMap<String, f32> = HashMap::with_capacity(dictionary.len());
        for (term, df) in dictionary.iter() {
            idf_table.insert(term.to_string(), idf(df, num_docs));
        }

        let mut vectors: HashMap<DocId, SparseVector> = HashMap::with_capacity(documents.len());
        let mut norms: HashMap<DocId, f32> = HashMap::with_capacity(documents.len());
        for doc in documents {
            let mut counts: HashMap<&str, u32> = HashMap::new();
            for term in &doc.terms {
                *counts.entry(term.as_str()).or_insert(0) += 1;
            }
            let mut vector: SparseVector = HashMap::with_capacity(counts.len());
            for (term, count) in counts {
                let weight = tf(count, doc.len()) * idf_table.get(term).copied().unwrap_or(0.0);
                vector.insert(term.to_string(), weight);
            }
            norms.insert(doc.id, norm(&vector));
            vectors.insert(doc.id, vector);
        }

        Ok(Self {
            idf: idf_table,
            vectors,
            norms,
            num_docs,
        })
    }

    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    pub fn idf_for(&self, term: &str) -> f32 {
        self.idf.get(term).copied().unwrap_or(0.0)
    }

    pub fn document_vector(&self, id: DocId) -> Option<&SparseVector> {
        self.vectors.get(&id)
    }

    /// TF-IDF vector for a query treated as a pseudo-document; the zero
    /// vector when `counts` is empty.
    pub fn query_vector(&self, counts: &HashMap<String, f32>) -> SparseVector {
        let total: f32 = counts.values().sum();
        if total <= 0.0 {
            return SparseVector::new();
        }
        counts
            .iter()
            .map(|(term, &count)| (term.clone(), (count / total) * self.idf_for(term)))
            .collect()
    }

    /// Score every document against the query vector and return at most
    /// `k` results, best first. Equal scores order by ascending id; zero
    /// scores are kept so callers always see up to `k` entries.
    pub fn rank(&self, query: &SparseVector, k: usize) -> Result<Vec<(DocId, f32)>, EngineError> {
        if k == 0 {
            return Err(EngineError::InvalidK(k));
        }
        let query_norm = norm(query);
        let mut scored: Vec<(DocId, f32)> = self
            .vectors
            .iter()
            .map(|(&id, vector)| (id, self.score_one(query, query_norm, id, vector)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    fn score_one(
        &self,
        query: &SparseVector,
        query_norm: f32,
        id: DocId,
        vector: &SparseVector,
    ) -> f32 {
        let doc_norm = self.norms.get(&id).copied().unwrap_or(0.0);
        if query_norm == 0.0 || doc_norm == 0.0 {
            return 0.0;
        }
        let dot: f32 = query
            .iter()
            .filter_map(|(term, qw)| vector.get(term).map(|dw| qw * dw))
            .sum();
        dot / (query_norm * doc_norm)
    }
}
