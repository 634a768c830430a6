use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compress::{decode, CompressedIndex};
use crate::dictionary::Dictionary;
use crate::document::{DocId, DocMeta};
use crate::error::EngineError;
use crate::expand::SynonymTable;
use crate::index::{is_strictly_ascending, InvertedIndex};
use crate::rank::VectorModel;
use crate::Snapshot;

/// Build summary stamped next to the snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u64,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
    fn dictionary(&self) -> PathBuf {
        self.root.join("dictionary.tsv")
    }
    fn index(&self) -> PathBuf {
        self.root.join("index.tsv")
    }
    fn compressed(&self) -> PathBuf {
        self.root.join("compressed.tsv")
    }
    fn tfidf(&self) -> PathBuf {
        self.root.join("tfidf.tsv")
    }
    fn synonyms(&self) -> PathBuf {
        self.root.join("synonyms.tsv")
    }
    fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }
    fn snapshot(&self) -> PathBuf {
        self.root.join("snapshot.bin")
    }
}

fn corrupt(path: &Path, record: usize, reason: impl Into<String>) -> EngineError {
    EngineError::CorruptPersistedState {
        file: path.display().to_string(),
        record,
        reason: reason.into(),
    }
}

pub fn save_dictionary(paths: &IndexPaths, dictionary: &Dictionary) -> Result<(), EngineError> {
    create_dir_all(&paths.root)?;
    let mut entries: Vec<(&str, u32)> = dictionary.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    let mut out = BufWriter::new(File::create(paths.dictionary())?);
    for (term, df) in entries {
        writeln!(out, "{term}\t{df}")?;
    }
    out.flush()?;
    Ok(())
}

pub fn load_dictionary(paths: &IndexPaths) -> Result<Dictionary, EngineError> {
    let path = paths.dictionary();
    let reader = BufReader::new(File::open(&path)?);
    let mut df = HashMap::new();
    for (record, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let (term, count) = line
            .split_once('\t')
            .ok_or_else(|| corrupt(&path, record + 1, "expected term<TAB>df"))?;
        let count: u32 = count
            .parse()
            .map_err(|_| corrupt(&path, record + 1, format!("df {count:?} is not an integer")))?;
        if count == 0 {
            return Err(corrupt(&path, record + 1, "df of a stored term cannot be 0"));
        }
        df.insert(term.to_string(), count);
    }
    Ok(Dictionary::from_entries(df))
}

pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<(), EngineError> {
    create_dir_all(&paths.root)?;
    let mut entries: Vec<(&str, &[DocId])> = index.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    let mut out = BufWriter::new(File::create(paths.index())?);
    for (term, ids) in entries {
        writeln!(out, "{term}\t{}", join_values(ids))?;
    }
    out.flush()?;
    Ok(())
}

/// Load the posting-list file. Records that parse but violate the
/// ascending duplicate-free invariant are skipped with a warning; records
/// that do not parse abort the load.
pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex, EngineError> {
    let path = paths.index();
    let reader = BufReader::new(File::open(&path)?);
    let mut postings: HashMap<String, Vec<DocId>> = HashMap::new();
    for (record, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let (term, raw_ids) = line
            .split_once('\t')
            .ok_or_else(|| corrupt(&path, record + 1, "expected term<TAB>doc ids"))?;
        let ids = parse_values(&path, record + 1, raw_ids)?;
        if !is_strictly_ascending(&ids) {
            tracing::warn!(term, record = record + 1, "skipping malformed posting list");
            continue;
        }
        postings.insert(term.to_string(), ids);
    }
    InvertedIndex::from_postings(postings)
}

pub fn save_compressed_index(
    paths: &IndexPaths,
    compressed: &CompressedIndex,
) -> Result<(), EngineError> {
    create_dir_all(&paths.root)?;
    let mut entries: Vec<(&str, &[u32])> = compressed.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    let mut out = BufWriter::new(File::create(paths.compressed())?);
    for (term, gaps) in entries {
        writeln!(out, "{term}\t{}", join_values(gaps))?;
    }
    out.flush()?;
    Ok(())
}

/// Load the gap-encoded index file. Gap records that would decode to a
/// non-monotonic id sequence are skipped with a warning.
pub fn load_compressed_index(paths: &IndexPaths) -> Result<CompressedIndex, EngineError> {
    let path = paths.compressed();
    let reader = BufReader::new(File::open(&path)?);
    let mut postings: HashMap<String, Vec<u32>> = HashMap::new();
    for (record, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let (term, raw_gaps) = line
            .split_once('\t')
            .ok_or_else(|| corrupt(&path, record + 1, "expected term<TAB>gaps"))?;
        let gaps = parse_values(&path, record + 1, raw_gaps)?;
        match decode(&gaps) {
            Ok(_) => {
                postings.insert(term.to_string(), gaps);
            }
            Err(err) => {
                tracing::warn!(term, record = record + 1, %err, "skipping malformed gap record");
            }
        }
    }
    Ok(CompressedIndex::from_records(postings))
}

/// Reporting artifact: per document, per term, the computed TF-IDF
/// weight. Written for inspection, never re-parsed.
pub fn save_tfidf(
    paths: &IndexPaths,
    model: &VectorModel,
    docs: &HashMap<DocId, DocMeta>,
) -> Result<(), EngineError> {
    create_dir_all(&paths.root)?;
    let mut entries: Vec<(&DocId, &DocMeta)> = docs.iter().collect();
    entries.sort_unstable_by_key(|(id, _)| **id);
    let mut out = BufWriter::new(File::create(paths.tfidf())?);
    for (id, meta) in entries {
        let Some(vector) = model.document_vector(*id) else {
            continue;
        };
        writeln!(out, "{}", meta.external_id)?;
        let mut terms: Vec<(&String, &f32)> = vector.iter().collect();
        terms.sort_unstable_by(|a, b| a.0.cmp(b.0));
        for (term, weight) in terms {
            writeln!(out, "\t{term}\t{weight:.6}")?;
        }
    }
    out.flush()?;
    Ok(())
}

pub fn save_synonyms(paths: &IndexPaths, table: &SynonymTable) -> Result<(), EngineError> {
    create_dir_all(&paths.root)?;
    let mut out = BufWriter::new(File::create(paths.synonyms())?);
    for (term, synonyms) in table.iter() {
        let joined = synonyms
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{term}\t{joined}")?;
    }
    out.flush()?;
    Ok(())
}

/// Parse a synonyms file from an arbitrary path; callers merge the result
/// into whatever table they start from.
pub fn load_synonyms<P: AsRef<Path>>(path: P) -> Result<SynonymTable, EngineError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut table = SynonymTable::empty();
    for (record, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (term, synonyms) = line
            .split_once('\t')
            .ok_or_else(|| corrupt(path, record + 1, "expected term<TAB>synonyms"))?;
        table.insert(term, synonyms.split(','));
    }
    Ok(table)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<(), EngineError> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    let mut out = File::create(paths.meta())?;
    out.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile, EngineError> {
    let mut buf = String::new();
    File::open(paths.meta())?.read_to_string(&mut buf)?;
    let meta = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub fn save_snapshot(paths: &IndexPaths, snapshot: &Snapshot) -> Result<(), EngineError> {
    create_dir_all(&paths.root)?;
    let bytes = bincode::serialize(snapshot)?;
    let mut out = File::create(paths.snapshot())?;
    out.write_all(&bytes)?;
    Ok(())
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<Snapshot, EngineError> {
    let mut buf = Vec::new();
    File::open(paths.snapshot())?.read_to_end(&mut buf)?;
    let snapshot = bincode::deserialize(&buf)?;
    Ok(snapshot)
}

fn join_values(values: &[u32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_values(path: &Path, record: usize, raw: &str) -> Result<Vec<u32>, EngineError> {
    raw.split(',')
        .map(|v| {
            v.parse::<u32>()
                .map_err(|_| corrupt(path, record, format!("value {v:?} is not an integer")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn dictionary_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let docs = vec![
            crate::Document::new(1, vec!["sun".into(), "rain".into()]),
            crate::Document::new(2, vec!["sun".into()]),
        ];
        let dictionary = Dictionary::build(&docs).unwrap();
        save_dictionary(&paths, &dictionary).unwrap();
        assert_eq!(load_dictionary(&paths).unwrap(), dictionary);
    }

    #[test]
    fn index_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let docs = vec![
            crate::Document::new(1, vec!["sun".into(), "rain".into()]),
            crate::Document::new(2, vec!["sun".into(), "snow".into()]),
        ];
        let index = InvertedIndex::build(&docs).unwrap();
        save_index(&paths, &index).unwrap();
        assert_eq!(load_index(&paths).unwrap(), index);
    }

    #[test]
    fn compressed_index_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let docs = vec![
            crate::Document::new(1, vec!["sun".into()]),
            crate::Document::new(8, vec!["sun".into(), "rain".into()]),
        ];
        let index = InvertedIndex::build(&docs).unwrap();
        let compressed = CompressedIndex::from_index(&index).unwrap();
        save_compressed_index(&paths, &compressed).unwrap();
        assert_eq!(load_compressed_index(&paths).unwrap(), compressed);
    }

    #[test]
    fn unsorted_posting_record_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        fs::write(paths.index(), "rain\t1,3\nsun\t3,1\n").unwrap();
        let index = load_index(&paths).unwrap();
        assert_eq!(index.postings_for("rain"), &[1, 3]);
        assert!(index.postings_for("sun").is_empty());
        assert_eq!(index.num_terms(), 1);
    }

    #[test]
    fn zero_gap_record_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        fs::write(paths.compressed(), "rain\t1,2\nsun\t1,0\n").unwrap();
        let compressed = load_compressed_index(&paths).unwrap();
        assert_eq!(compressed.num_terms(), 1);
        assert_eq!(compressed.gaps_for("rain"), &[1, 2]);
    }

    #[test]
    fn unparsable_record_aborts_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        fs::write(paths.index(), "rain\t1,3\nsun\tone,two\n").unwrap();
        match load_index(&paths) {
            Err(EngineError::CorruptPersistedState { record, file, .. }) => {
                assert_eq!(record, 2);
                assert!(file.ends_with("index.tsv"));
            }
            other => panic!("expected corrupt-state error, got {other:?}"),
        }
    }

    #[test]
    fn missing_tab_aborts_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        fs::write(paths.dictionary(), "sun 2\n").unwrap();
        assert!(matches!(
            load_dictionary(&paths),
            Err(EngineError::CorruptPersistedState { record: 1, .. })
        ));
    }

    #[test]
    fn synonyms_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut table = SynonymTable::empty();
        table.insert("sun", ["solar", "sunny"]);
        table.insert("rain", ["wet"]);
        save_synonyms(&paths, &table).unwrap();
        assert_eq!(load_synonyms(paths.synonyms()).unwrap(), table);
    }

    #[test]
    fn meta_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let meta = MetaFile {
            num_docs: 5,
            num_terms: 42,
            created_at: "2024-01-01T00:00:00Z".into(),
            version: 1,
        };
        save_meta(&paths, &meta).unwrap();
        let loaded = load_meta(&paths).unwrap();
        assert_eq!(loaded.num_docs, 5);
        assert_eq!(loaded.num_terms, 42);
        assert_eq!(loaded.version, 1);
    }
}
