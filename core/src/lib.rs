//! Inverted index, TF-IDF and BM25 scoring over a small movie corpus.

pub mod corpus;
pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod scorer;
pub mod shared;
pub mod tokenizer;

pub use corpus::Corpus;
pub use error::{Result, SearchError};
pub use index::{DocId, DocLengths, DocMap, Document, IndexBuilder, Postings, SearchIndex, TermFrequencies};
pub use query::{QueryEngine, RankedHit, SearchConfig, DEFAULT_RESULT_LIMIT};
pub use scorer::{Bm25Params, Scorer};
pub use shared::SharedEngine;
pub use tokenizer::Tokenizer;
