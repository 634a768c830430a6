use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::DocId;
use crate::error::EngineError;
use crate::index::{is_strictly_ascending, InvertedIndex};

/// Gap-encode an ascending, duplicate-free id list: the first value is the
/// first id, every following value the difference from its predecessor.
pub fn encode(sorted_ids: &[DocId]) -> Result<Vec<u32>, EngineError> {
    if !is_strictly_ascending(sorted_ids) {
        return Err(EngineError::MalformedPostingList(
            "encode input must be ascending and duplicate-free".into(),
        ));
    }
    let mut gaps = Vec::with_capacity(sorted_ids.len());
    let mut prev = 0u32;
    for (i, &id) in sorted_ids.iter().enumerate() {
        if i == 0 {
            gaps.push(id);
        } else {
            gaps.push(id - prev);
        }
        prev = id;
    }
    Ok(gaps)
}

/// Running-sum reconstruction, the exact inverse of [`encode`]. Rejects
/// gap sequences whose reconstruction would be non-monotonic or overflow
/// the id space.
pub fn decode(gaps: &[u32]) -> Result<Vec<DocId>, EngineError> {
    let mut ids = Vec::with_capacity(gaps.len());
    let mut acc: u32 = 0;
    for (i, &gap) in gaps.iter().enumerate() {
        if i == 0 {
            acc = gap;
        } else {
            if gap == 0 {
                return Err(EngineError::MalformedPostingList(format!(
                    "zero gap at position {i} would duplicate id {acc}"
                )));
            }
            acc = acc.checked_add(gap).ok_or_else(|| {
                EngineError::MalformedPostingList(format!(
                    "gap at position {i} overflows the id space"
                ))
            })?;
        }
        ids.push(acc);
    }
    Ok(ids)
}

/// Gap-encoded rendition of an [`InvertedIndex`]. Not queryable: lookups
/// and ranking require a decompressed index, trading query-readiness for
/// storage size.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedIndex {
    postings: HashMap<String, Vec<u32>>,
}

impl CompressedIndex {
    pub fn from_index(index: &InvertedIndex) -> Result<Self, EngineError> {
        let mut postings = HashMap::with_capacity(index.num_terms());
        for (term, ids) in index.iter() {
            postings.insert(term.to_string(), encode(ids)?);
        }
        Ok(Self { postings })
    }

    /// Exact inverse of [`CompressedIndex::from_index`].
    pub fn decompress(&self) -> Result<InvertedIndex, EngineError> {
        let mut postings = HashMap::with_capacity(self.postings.len());
        for (term, gaps) in &self.postings {
            let ids = match decode(gaps) {
                Ok(ids) => ids,
                Err(EngineError::MalformedPostingList(detail)) => {
                    return Err(EngineError::MalformedPostingList(format!(
                        "term {term:?}: {detail}"
                    )));
                }
                Err(err) => return Err(err),
            };
            postings.insert(term.clone(), ids);
        }
        InvertedIndex::from_postings(postings)
    }

    pub fn gaps_for(&self, term: &str) -> &[u32] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.postings
            .iter()
            .map(|(term, gaps)| (term.as_str(), gaps.as_slice()))
    }

    pub(crate) fn from_records(postings: HashMap<String, Vec<u32>>) -> Self {
        Self { postings }
    }
}

/// Fractional size reduction `1 - compressed / original`, measured over
/// the tab-separated text encoding each posting record occupies on disk
/// (`term<TAB>v1,v2,...<NL>`). 0 when the original index is empty.
pub fn compression_ratio(original: &InvertedIndex, compressed: &CompressedIndex) -> f64 {
    let original_size: usize = original.iter().map(|(t, ids)| record_len(t, ids)).sum();
    let compressed_size: usize = compressed.iter().map(|(t, gaps)| record_len(t, gaps)).sum();
    if original_size == 0 {
        return 0.0;
    }
    1.0 - compressed_size as f64 / original_size as f64
}

fn record_len(term: &str, values: &[u32]) -> usize {
    let digits: usize = values.iter().map(|&v| decimal_width(v)).sum();
    let separators = values.len().saturating_sub(1);
    term.len() + 1 + digits + separators + 1
}

fn decimal_width(mut v: u32) -> usize {
    let mut width = 1;
    while v >= 10 {
        v /= 10;
        width += 1;
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn round_trip_preserves_id_lists() {
        for ids in [vec![], vec![7], vec![1, 2], vec![3, 17, 160, 161, 4000]] {
            let gaps = encode(&ids).unwrap();
            assert_eq!(decode(&gaps).unwrap(), ids);
        }
    }

    #[test]
    fn encode_emits_first_id_then_deltas() {
        assert_eq!(encode(&[1, 2]).unwrap(), vec![1, 1]);
        assert_eq!(encode(&[5, 9, 30]).unwrap(), vec![5, 4, 21]);
    }

    #[test]
    fn encode_rejects_unsorted_input() {
        assert!(matches!(
            encode(&[3, 1]),
            Err(EngineError::MalformedPostingList(_))
        ));
    }

    #[test]
    fn encode_rejects_duplicates() {
        assert!(matches!(
            encode(&[1, 1, 2]),
            Err(EngineError::MalformedPostingList(_))
        ));
    }

    #[test]
    fn decode_rejects_zero_gaps() {
        assert!(matches!(
            decode(&[1, 0]),
            Err(EngineError::MalformedPostingList(_))
        ));
    }

    #[test]
    fn decode_rejects_overflowing_gaps() {
        assert!(matches!(
            decode(&[u32::MAX, 1]),
            Err(EngineError::MalformedPostingList(_))
        ));
    }

    #[test]
    fn decode_of_empty_is_empty() {
        assert!(decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn index_round_trip_is_lossless() {
        let docs = vec![
            Document::new(1, vec!["sun".into(), "rain".into()]),
            Document::new(2, vec!["sun".into(), "snow".into()]),
            Document::new(9, vec!["sun".into(), "wind".into()]),
        ];
        let index = InvertedIndex::build(&docs).unwrap();
        let compressed = CompressedIndex::from_index(&index).unwrap();
        assert_eq!(compressed.gaps_for("sun"), &[1, 1, 7]);
        assert_eq!(compressed.decompress().unwrap(), index);
    }

    #[test]
    fn ratio_is_zero_for_empty_index() {
        let index = InvertedIndex::default();
        let compressed = CompressedIndex::default();
        assert_eq!(compression_ratio(&index, &compressed), 0.0);
    }

    #[test]
    fn ratio_reflects_shrinking_records() {
        // Adjacent four-digit ids encode to single-digit gaps.
        let docs: Vec<Document> = (0..9)
            .map(|i| Document::new(5000 + i, vec!["sun".into()]))
            .collect();
        let index = InvertedIndex::build(&docs).unwrap();
        let compressed = CompressedIndex::from_index(&index).unwrap();
        let ratio = compression_ratio(&index, &compressed);
        assert!(ratio > 0.0 && ratio < 1.0, "ratio was {ratio}");
    }
}
