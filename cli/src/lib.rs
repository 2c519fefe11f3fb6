use anyhow::{Context, Result};
use cinedex_core::persist::{load_index, save_index, IndexPaths};
use cinedex_core::tokenizer::load_stopwords;
use cinedex_core::{Bm25Params, Corpus, DocId, QueryEngine, SearchConfig, SearchIndex, Tokenizer, DEFAULT_RESULT_LIMIT};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cinedex")]
#[command(about = "Keyword search over a movie corpus with TF-IDF and BM25", long_about = None)]
pub struct Cli {
    /// Corpus file, `{"movies": [...]}`
    #[arg(long, global = true, default_value = "data/movies.json")]
    pub corpus: PathBuf,
    /// Newline-delimited stopword list; the built-in English list is used if absent
    #[arg(long, global = true, default_value = "data/stopwords.txt")]
    pub stopwords: PathBuf,
    /// Directory holding the saved index
    #[arg(long, global = true, default_value = "cache")]
    pub cache: PathBuf,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the inverted index and save it to the cache directory
    Build,
    /// Unranked token match, in query-token order
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_RESULT_LIMIT)]
        limit: usize,
    },
    /// Search movies ranked by BM25
    Bm25search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_RESULT_LIMIT)]
        limit: usize,
    },
    /// Term frequency of a term in a document
    Tf { doc_id: DocId, term: String },
    /// Inverse document frequency of a term
    Idf { term: String },
    /// TF-IDF score of a term in a document
    Tfidf { doc_id: DocId, term: String },
    /// BM25 IDF score of a term
    Bm25idf { term: String },
    /// BM25 saturated term frequency of a term in a document
    Bm25tf {
        doc_id: DocId,
        term: String,
        #[arg(long, default_value_t = cinedex_core::scorer::DEFAULT_K1)]
        k1: f64,
        #[arg(long, default_value_t = cinedex_core::scorer::DEFAULT_B)]
        b: f64,
    },
    /// BM25 score of a term in a document
    Bm25 { doc_id: DocId, term: String },
}

fn tokenizer(stopwords: &Path) -> Result<Tokenizer> {
    if !stopwords.exists() {
        tracing::warn!(path = %stopwords.display(), "stopword file not found, using built-in list");
        return Ok(Tokenizer::default());
    }
    let words = load_stopwords(stopwords).with_context(|| format!("reading {}", stopwords.display()))?;
    Ok(Tokenizer::new(words))
}

fn open_engine(stopwords: &Path, cache: &Path) -> Result<QueryEngine> {
    let tok = tokenizer(stopwords)?;
    let index = load_index(&IndexPaths::new(cache))?;
    Ok(QueryEngine::new(index, tok, SearchConfig::default()))
}

pub fn run<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    let engine = || open_engine(&cli.stopwords, &cli.cache);
    match cli.command {
        Commands::Build => {
            let tok = tokenizer(&cli.stopwords)?;
            let corpus = Corpus::load(&cli.corpus).with_context(|| format!("loading corpus {}", cli.corpus.display()))?;
            let index = SearchIndex::build(&tok, &corpus)?;
            save_index(&IndexPaths::new(&cli.cache), &index)?;
            writeln!(out, "Index built and saved: {} documents, {} terms.", index.num_docs(), index.num_terms())?;
        }
        Commands::Search { query, limit } => {
            let engine = engine()?;
            writeln!(out, "Searching for: {query}")?;
            for (i, doc) in engine.search(&query, limit).iter().enumerate() {
                writeln!(out, "{}. {} (ID: {})", i + 1, doc.title, doc.id)?;
            }
        }
        Commands::Bm25search { query, limit } => {
            let engine = engine()?;
            writeln!(out, "Searching for: {query}")?;
            for (i, hit) in engine.bm25_search(&query, limit).iter().enumerate() {
                writeln!(out, "{}. ({}) {} - Score: {:.2}", i + 1, hit.id, hit.title, hit.score)?;
            }
        }
        Commands::Tf { doc_id, term } => {
            let tf = engine()?.scorer().term_frequency(doc_id, &term)?;
            writeln!(out, "Term frequency of '{term}' in document {doc_id}: {tf}")?;
        }
        Commands::Idf { term } => {
            let idf = engine()?.scorer().idf(&term)?;
            writeln!(out, "Inverse document frequency of '{term}': {idf:.2}")?;
        }
        Commands::Tfidf { doc_id, term } => {
            let score = engine()?.scorer().tfidf(doc_id, &term)?;
            writeln!(out, "TF-IDF score of '{term}' in document {doc_id}: {score:.2}")?;
        }
        Commands::Bm25idf { term } => {
            let score = engine()?.scorer().bm25_idf(&term)?;
            writeln!(out, "BM25 IDF score of '{term}': {score:.2}")?;
        }
        Commands::Bm25tf { doc_id, term, k1, b } => {
            let score = engine()?.scorer().bm25_tf(doc_id, &term, k1, b)?;
            writeln!(out, "BM25 TF score of '{term}' in document {doc_id}: {score:.2}")?;
        }
        Commands::Bm25 { doc_id, term } => {
            let engine = engine()?;
            let scorer = engine.scorer();
            let Bm25Params { k1, b } = scorer.params();
            let score = scorer.bm25(doc_id, &term)?;
            writeln!(out, "BM25 score of '{term}' in document {doc_id} (k1={k1}, b={b}): {score:.2}")?;
        }
    }
    Ok(())
}
