use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A labeled test query: text plus the hand-judged relevant external ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment {
    pub text: String,
    pub relevant: HashSet<String>,
}

/// Ground-truth relevance judgments keyed by query id.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgments {
    queries: BTreeMap<String, Judgment>,
}

impl Judgments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<I, S>(&mut self, query_id: &str, text: &str, relevant: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queries.insert(
            query_id.to_string(),
            Judgment {
                text: text.to_string(),
                relevant: relevant.into_iter().map(Into::into).collect(),
            },
        );
    }

    /// Parse a judgments file, one record per line:
    /// `query_id<TAB>query text<TAB>rel1,rel2,...`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut judgments = Self::new();
        for (record, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.splitn(3, '\t');
            let (Some(query_id), Some(text), Some(relevant)) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(EngineError::CorruptPersistedState {
                    file: path.display().to_string(),
                    record: record + 1,
                    reason: "expected query_id<TAB>text<TAB>relevant ids".into(),
                });
            };
            judgments.add(
                query_id,
                text,
                relevant
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty()),
            );
        }
        Ok(judgments)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Judgment)> {
        self.queries.iter().map(|(id, j)| (id.as_str(), j))
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// Fraction of the top-k ranked ids that are judged relevant. The divisor
/// is `k` even when fewer than `k` results were retrieved.
pub fn precision_at_k(
    ranked: &[String],
    relevant: &HashSet<String>,
    k: usize,
) -> Result<f32, EngineError> {
    if k == 0 {
        return Err(EngineError::InvalidK(k));
    }
    let hits = ranked
        .iter()
        .take(k)
        .filter(|id| relevant.contains(id.as_str()))
        .count();
    Ok(hits as f32 / k as f32)
}

/// Mean of the per-query precision values; 0 over an empty slice.
pub fn mean_precision(precisions: &[f32]) -> f32 {
    if precisions.is_empty() {
        0.0
    } else {
        precisions.iter().sum::<f32>() / precisions.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ranked(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn relevant(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn counts_hits_in_the_top_k_only() {
        let ranked = ranked(&["a", "b", "c", "d"]);
        let relevant = relevant(&["a", "c", "d"]);
        assert_eq!(precision_at_k(&ranked, &relevant, 2).unwrap(), 0.5);
        assert_eq!(precision_at_k(&ranked, &relevant, 4).unwrap(), 0.75);
    }

    #[test]
    fn divisor_stays_k_when_fewer_results_exist() {
        let ranked = ranked(&["a"]);
        let relevant = relevant(&["a"]);
        assert_eq!(precision_at_k(&ranked, &relevant, 5).unwrap(), 0.2);
    }

    #[test]
    fn zero_k_is_rejected() {
        assert!(matches!(
            precision_at_k(&[], &HashSet::new(), 0),
            Err(EngineError::InvalidK(0))
        ));
    }

    #[test]
    fn mean_over_no_queries_is_zero() {
        assert_eq!(mean_precision(&[]), 0.0);
        assert_eq!(mean_precision(&[0.5, 1.0]), 0.75);
    }

    #[test]
    fn loads_tab_separated_judgments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.tsv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "q1\tsunny weather\tdoc1,doc2").unwrap();
        writeln!(file, "q2\tsnow\tdoc3").unwrap();
        let judgments = Judgments::load(&path).unwrap();
        assert_eq!(judgments.len(), 2);
        let (id, judgment) = judgments.iter().next().unwrap();
        assert_eq!(id, "q1");
        assert_eq!(judgment.text, "sunny weather");
        assert!(judgment.relevant.contains("doc2"));
    }

    #[test]
    fn missing_fields_abort_with_record_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.tsv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "q1\tsunny weather\tdoc1").unwrap();
        writeln!(file, "q2 no tabs here").unwrap();
        match Judgments::load(&path) {
            Err(EngineError::CorruptPersistedState { record, .. }) => assert_eq!(record, 2),
            other => panic!("expected corrupt-state error, got {other:?}"),
        }
    }
}
