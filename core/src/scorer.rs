//! Term statistics and TF-IDF / BM25 scoring over a built [`SearchIndex`].
//!
//! Public methods take raw, caller-supplied terms and tokenize them first; a
//! term that tokenizes into more than one token is rejected with
//! [`SearchError::InvalidTermArgument`]. Terms absent from the vocabulary are
//! not errors and score zero.

use crate::error::{Result, SearchError};
use crate::index::{DocId, SearchIndex};
use crate::tokenizer::Tokenizer;

pub const DEFAULT_K1: f64 = 1.5;
pub const DEFAULT_B: f64 = 0.75;

/// BM25 parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f64,
    /// Document length normalization.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: DEFAULT_K1, b: DEFAULT_B }
    }
}

pub struct Scorer<'a> {
    index: &'a SearchIndex,
    tokenizer: &'a Tokenizer,
    params: Bm25Params,
    avg_doc_len: f64,
}

impl<'a> Scorer<'a> {
    pub fn new(index: &'a SearchIndex, tokenizer: &'a Tokenizer, params: Bm25Params) -> Self {
        Self { index, tokenizer, params, avg_doc_len: index.avg_doc_length() }
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// Reduce `term` to at most one index token. The multi-token check runs
    /// before any document lookup, so it fails even for an unseen document.
    /// A token missing from the vocabulary is logged but is not an error.
    fn single_token(&self, term: &str) -> Result<Option<String>> {
        let mut tokens = self.tokenizer.tokenize(term);
        let token = match tokens.len() {
            0 => None,
            1 => tokens.pop(),
            n => return Err(SearchError::InvalidTermArgument { term: term.to_string(), tokens: n }),
        };
        if token.as_deref().map_or(true, |t| self.index.document_frequency(t) == 0) {
            tracing::info!(term, "term not found in index");
        }
        Ok(token)
    }

    fn document_frequency(&self, token: Option<&str>) -> usize {
        token.map_or(0, |t| self.index.document_frequency(t))
    }

    /// Occurrences of `term` in the document. Errors only when `term` is
    /// more than one token, checked ahead of the document lookup.
    pub fn term_frequency(&self, doc_id: DocId, term: &str) -> Result<u32> {
        let token = self.single_token(term)?;
        Ok(token.map_or(0, |t| self.index.token_frequency(doc_id, &t)))
    }

    /// `ln((N + 1) / (df + 1))`
    pub fn idf(&self, term: &str) -> Result<f64> {
        let token = self.single_token(term)?;
        let df = self.document_frequency(token.as_deref());
        Ok(self.idf_for_df(df))
    }

    pub fn tfidf(&self, doc_id: DocId, term: &str) -> Result<f64> {
        let tf = self.term_frequency(doc_id, term)?;
        let idf = self.idf(term)?;
        Ok(tf as f64 * idf)
    }

    /// `ln((N - df + 0.5) / (df + 0.5) + 1)`, or 0.0 for an unseen term.
    pub fn bm25_idf(&self, term: &str) -> Result<f64> {
        let token = self.single_token(term)?;
        let df = self.document_frequency(token.as_deref());
        Ok(self.bm25_idf_for_df(df))
    }

    pub fn bm25_tf(&self, doc_id: DocId, term: &str, k1: f64, b: f64) -> Result<f64> {
        let tf = self.term_frequency(doc_id, term)?;
        Ok(self.saturated_tf(tf, self.index.doc_length(doc_id), k1, b))
    }

    /// BM25 score of one term in one document, using the scorer's parameters.
    pub fn bm25(&self, doc_id: DocId, term: &str) -> Result<f64> {
        let token = self.single_token(term)?;
        Ok(token.map_or(0.0, |t| self.bm25_token(doc_id, &t)))
    }

    /// BM25 for an already-normalized token. Used by ranked search so query
    /// tokens are not stemmed a second time.
    pub(crate) fn bm25_token(&self, doc_id: DocId, token: &str) -> f64 {
        let idf = self.bm25_idf_for_df(self.index.document_frequency(token));
        let tf = self.index.token_frequency(doc_id, token);
        let Bm25Params { k1, b } = self.params;
        idf * self.saturated_tf(tf, self.index.doc_length(doc_id), k1, b)
    }

    fn idf_for_df(&self, df: usize) -> f64 {
        let n = self.index.num_docs() as f64;
        ((n + 1.0) / (df as f64 + 1.0)).ln()
    }

    fn bm25_idf_for_df(&self, df: usize) -> f64 {
        if df == 0 {
            return 0.0;
        }
        let n = self.index.num_docs() as f64;
        let df = df as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn saturated_tf(&self, tf: u32, doc_len: u32, k1: f64, b: f64) -> f64 {
        if tf == 0 {
            return 0.0;
        }
        let length_norm = if self.avg_doc_len == 0.0 {
            1.0 - b
        } else {
            1.0 - b + b * (doc_len as f64 / self.avg_doc_len)
        };
        let tf = tf as f64;
        (tf * (k1 + 1.0)) / (tf + k1 * length_norm)
    }
}
