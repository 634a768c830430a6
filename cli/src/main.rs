use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use quarry::document::{corpus_stats, DocId, DocMeta, Document};
use quarry::eval::{mean_precision, precision_at_k, Judgments};
use quarry::persist::{
    load_snapshot, load_synonyms, save_compressed_index, save_dictionary, save_index, save_meta,
    save_snapshot, save_synonyms, save_tfidf, IndexPaths, MetaFile,
};
use quarry::tokenizer::{tokenize, AnalyzerOptions};
use quarry::{compress, CompressedIndex, SearchOptions, Snapshot, SynonymTable};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Build and query a TF-IDF inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a directory of .txt documents
    Build {
        /// Directory containing the document collection
        #[arg(long)]
        docs: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Disable stemming during preprocessing
        #[arg(long, default_value_t = false)]
        no_stemming: bool,
        /// Synonyms file merged into the built-in table
        #[arg(long)]
        synonyms: Option<String>,
        /// Start from an empty synonym table instead of the built-in one
        #[arg(long, default_value_t = false)]
        no_seed_synonyms: bool,
    },
    /// Rank documents against a query
    Search {
        /// Index directory produced by `build`
        #[arg(long)]
        index: String,
        query: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
        /// Expand the query with synonyms before ranking
        #[arg(long, default_value_t = false)]
        expand: bool,
        /// Boost a term's query weight, e.g. --boost sun=2.0 (repeatable)
        #[arg(long)]
        boost: Vec<String>,
        /// Write results as rank<TAB>doc<TAB>score
        #[arg(long)]
        save: Option<String>,
    },
    /// Boolean posting-list lookup
    Lookup {
        #[arg(long)]
        index: String,
        #[arg(long, value_enum, default_value = "and")]
        mode: Mode,
        terms: Vec<String>,
    },
    /// Precision@k evaluation against labeled judgments
    Eval {
        #[arg(long)]
        index: String,
        /// Judgments file: query_id<TAB>query text<TAB>rel1,rel2
        #[arg(long)]
        queries: String,
        /// Cutoffs to evaluate (repeatable)
        #[arg(long, default_values_t = vec![5, 10])]
        k: Vec<usize>,
        #[arg(long, default_value_t = false)]
        expand: bool,
        /// Write the evaluation report to a file
        #[arg(long)]
        report: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    And,
    Or,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            docs,
            output,
            no_stemming,
            synonyms,
            no_seed_synonyms,
        } => build(&docs, &output, no_stemming, synonyms.as_deref(), no_seed_synonyms),
        Commands::Search {
            index,
            query,
            k,
            expand,
            boost,
            save,
        } => search(&index, &query, k, expand, &boost, save.as_deref()),
        Commands::Lookup { index, mode, terms } => lookup(&index, mode, &terms),
        Commands::Eval {
            index,
            queries,
            k,
            expand,
            report,
        } => evaluate(&index, &queries, &k, expand, report.as_deref()),
    }
}

fn build(
    docs_dir: &str,
    output: &str,
    no_stemming: bool,
    synonyms_file: Option<&str>,
    no_seed_synonyms: bool,
) -> Result<()> {
    let analyzer = AnalyzerOptions {
        stemming: !no_stemming,
    };

    let mut files: Vec<PathBuf> = WalkDir::new(docs_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file()
                && e.path().extension().and_then(|s| s.to_str()) == Some("txt")
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    // Sorted file order keeps doc-id assignment deterministic across runs.
    files.sort();
    if files.is_empty() {
        bail!("no .txt documents found under {docs_dir}");
    }

    let mut documents = Vec::with_capacity(files.len());
    let mut metas: HashMap<DocId, DocMeta> = HashMap::with_capacity(files.len());
    for (i, file) in files.iter().enumerate() {
        let text = fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))?;
        let terms = tokenize(&text, analyzer);
        let external_id = file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("doc")
            .to_string();
        let id = i as DocId;
        metas.insert(
            id,
            DocMeta {
                external_id,
                num_tokens: terms.len() as u32,
            },
        );
        documents.push(Document::new(id, terms));
    }

    let mut synonyms = if no_seed_synonyms {
        SynonymTable::empty()
    } else {
        SynonymTable::seed()
    };
    if let Some(path) = synonyms_file {
        let loaded =
            load_synonyms(path).with_context(|| format!("loading synonyms from {path}"))?;
        synonyms.merge(loaded);
    }

    let snapshot = Snapshot::build(&documents, metas, synonyms, analyzer)?;
    let stats = corpus_stats(&documents);
    tracing::info!(
        num_docs = stats.num_documents,
        num_terms = snapshot.dictionary.len(),
        total_tokens = stats.total_tokens,
        avg_tokens = stats.avg_tokens_per_doc,
        "ingested documents"
    );

    let compressed = CompressedIndex::from_index(&snapshot.index)?;
    let ratio = compress::compression_ratio(&snapshot.index, &compressed);
    tracing::info!(ratio_pct = format!("{:.2}", ratio * 100.0), "index compressed");

    let paths = IndexPaths::new(output);
    save_dictionary(&paths, &snapshot.dictionary)?;
    save_index(&paths, &snapshot.index)?;
    save_compressed_index(&paths, &compressed)?;
    save_tfidf(&paths, &snapshot.model, &snapshot.docs)?;
    save_synonyms(&paths, &snapshot.synonyms)?;
    save_snapshot(&paths, &snapshot)?;
    let meta = MetaFile {
        num_docs: stats.num_documents as u32,
        num_terms: snapshot.dictionary.len() as u64,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: 1,
    };
    save_meta(&paths, &meta)?;

    tracing::info!(output, "index build complete");
    Ok(())
}

fn search(
    index_dir: &str,
    query: &str,
    k: usize,
    expand: bool,
    boost: &[String],
    save: Option<&str>,
) -> Result<()> {
    let paths = IndexPaths::new(index_dir);
    let snapshot = load_snapshot(&paths).context("loading index snapshot")?;

    let terms = tokenize(query, snapshot.analyzer);
    if terms.is_empty() {
        println!("query is empty after preprocessing");
        return Ok(());
    }
    let weights = parse_boosts(boost, snapshot.analyzer)?;
    let options = SearchOptions { k, expand, weights };
    let results = snapshot.search(&terms, &options)?;

    for (rank, (doc_id, score)) in results.iter().enumerate() {
        let name = snapshot.external_id(*doc_id).unwrap_or("?");
        println!("{:2}. {name}  {score:.6}", rank + 1);
    }
    if let Some(path) = save {
        save_results(Path::new(path), &results, &snapshot)?;
        tracing::info!(path, "results saved");
    }
    Ok(())
}

/// Parse `term=WEIGHT` boost flags, normalizing each term with the same
/// analyzer the index was built with.
fn parse_boosts(boosts: &[String], analyzer: AnalyzerOptions) -> Result<HashMap<String, f32>> {
    let mut weights = HashMap::new();
    for entry in boosts {
        let (term, weight) = entry
            .split_once('=')
            .with_context(|| format!("boost {entry:?} must look like term=2.0"))?;
        let weight: f32 = weight
            .parse()
            .with_context(|| format!("boost weight in {entry:?} is not a number"))?;
        let Some(normalized) = tokenize(term, analyzer).into_iter().next() else {
            bail!("boost term in {entry:?} is empty after preprocessing");
        };
        weights.insert(normalized, weight);
    }
    Ok(weights)
}

fn save_results(path: &Path, results: &[(DocId, f32)], snapshot: &Snapshot) -> Result<()> {
    let mut out = String::new();
    for (rank, (doc_id, score)) in results.iter().enumerate() {
        let name = snapshot.external_id(*doc_id).unwrap_or("?");
        out.push_str(&format!("{}\t{}\t{:.6}\n", rank + 1, name, score));
    }
    fs::write(path, out)?;
    Ok(())
}

fn lookup(index_dir: &str, mode: Mode, raw_terms: &[String]) -> Result<()> {
    let paths = IndexPaths::new(index_dir);
    let snapshot = load_snapshot(&paths).context("loading index snapshot")?;
    let terms: Vec<String> = raw_terms
        .iter()
        .flat_map(|t| tokenize(t, snapshot.analyzer))
        .collect();

    let ids = match mode {
        Mode::And => snapshot.index.and_query(&terms),
        Mode::Or => snapshot.index.or_query(&terms),
    };
    let mut ids: Vec<DocId> = ids.into_iter().collect();
    ids.sort_unstable();
    if ids.is_empty() {
        println!("no matching documents");
        return Ok(());
    }
    for id in ids {
        println!("{}", snapshot.external_id(id).unwrap_or("?"));
    }
    Ok(())
}

fn evaluate(
    index_dir: &str,
    queries_file: &str,
    ks: &[usize],
    expand: bool,
    report: Option<&str>,
) -> Result<()> {
    let paths = IndexPaths::new(index_dir);
    let snapshot = load_snapshot(&paths).context("loading index snapshot")?;
    let judgments =
        Judgments::load(queries_file).with_context(|| format!("loading {queries_file}"))?;
    if judgments.is_empty() {
        bail!("no queries in {queries_file}");
    }

    let mut ks_sorted = ks.to_vec();
    ks_sorted.sort_unstable();
    ks_sorted.dedup();
    let max_k = ks_sorted.last().copied().unwrap_or(10);

    let mut report_text = String::new();
    let mut per_k: HashMap<usize, Vec<f32>> = HashMap::new();
    for (query_id, judgment) in judgments.iter() {
        let terms = tokenize(&judgment.text, snapshot.analyzer);
        let options = SearchOptions {
            k: max_k,
            expand,
            weights: HashMap::new(),
        };
        let results = snapshot.search(&terms, &options)?;
        let ranked: Vec<String> = results
            .iter()
            .map(|(id, _)| snapshot.external_id(*id).unwrap_or("?").to_string())
            .collect();

        report_text.push_str(&format!("[{query_id}] {}\n", judgment.text));
        for (rank, ((_, score), name)) in results.iter().zip(&ranked).enumerate() {
            let mark = if judgment.relevant.contains(name) { "+" } else { "-" };
            report_text.push_str(&format!("  {:2}. {name}\t{score:.6}\t{mark}\n", rank + 1));
        }
        for &k in &ks_sorted {
            let precision = precision_at_k(&ranked, &judgment.relevant, k)?;
            per_k.entry(k).or_default().push(precision);
            report_text.push_str(&format!("  precision@{k}: {precision:.4}\n"));
        }
    }
    for k in &ks_sorted {
        let mean = mean_precision(per_k.get(k).map(Vec::as_slice).unwrap_or(&[]));
        report_text.push_str(&format!("mean precision@{k}: {mean:.4}\n"));
    }

    print!("{report_text}");
    if let Some(path) = report {
        fs::write(path, &report_text)?;
        tracing::info!(path, "evaluation report saved");
    }
    Ok(())
}
