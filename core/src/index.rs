use crate::corpus::Corpus;
use crate::error::{Result, SearchError};
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub type DocId = u32;

/// term -> ids of the documents containing it, ascending.
pub type Postings = HashMap<String, BTreeSet<DocId>>;
/// doc -> term -> occurrences in that document.
pub type TermFrequencies = HashMap<DocId, HashMap<String, u32>>;
/// doc -> number of indexed tokens.
pub type DocLengths = HashMap<DocId, u32>;
pub type DocMap = HashMap<DocId, Document>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub description: String,
}

impl Document {
    pub fn new(id: DocId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id, title: title.into(), description: description.into() }
    }

    /// The text that gets indexed: title followed by description.
    pub fn indexed_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// The four structures produced by one build pass. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchIndex {
    pub(crate) postings: Postings,
    pub(crate) docmap: DocMap,
    pub(crate) term_frequencies: TermFrequencies,
    pub(crate) doc_lengths: DocLengths,
}

impl SearchIndex {
    /// Build a fresh index over `corpus`.
    pub fn build(tokenizer: &Tokenizer, corpus: &Corpus) -> Result<Self> {
        IndexBuilder::new(tokenizer).build(corpus)
    }

    pub fn postings(&self) -> &Postings { &self.postings }
    pub fn docmap(&self) -> &DocMap { &self.docmap }
    pub fn term_frequencies(&self) -> &TermFrequencies { &self.term_frequencies }
    pub fn doc_lengths(&self) -> &DocLengths { &self.doc_lengths }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.docmap.get(&doc_id)
    }

    pub fn num_docs(&self) -> usize {
        self.docmap.len()
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    /// Number of documents containing an already-normalized token.
    pub fn document_frequency(&self, token: &str) -> usize {
        self.postings.get(token).map_or(0, BTreeSet::len)
    }

    /// Occurrences of an already-normalized token in one document.
    pub fn token_frequency(&self, doc_id: DocId, token: &str) -> u32 {
        self.term_frequencies
            .get(&doc_id)
            .and_then(|tf| tf.get(token))
            .copied()
            .unwrap_or(0)
    }

    pub fn doc_length(&self, doc_id: DocId) -> u32 {
        self.doc_lengths.get(&doc_id).copied().unwrap_or(0)
    }

    /// Mean document length, 0.0 for an empty index.
    pub fn avg_doc_length(&self) -> f64 {
        if self.doc_lengths.is_empty() {
            return 0.0;
        }
        let total: u64 = self.doc_lengths.values().map(|&l| l as u64).sum();
        total as f64 / self.doc_lengths.len() as f64
    }

    /// Sorted posting list for an already-normalized token.
    pub fn documents_for(&self, token: &str) -> Vec<DocId> {
        match self.postings.get(token) {
            Some(ids) => ids.iter().copied().collect(),
            None => {
                tracing::info!(term = token, "term not found in index");
                Vec::new()
            }
        }
    }

    /// Check that the four structures agree with each other.
    pub fn validate(&self) -> Result<()> {
        for (&doc_id, doc) in &self.docmap {
            if doc.id != doc_id {
                return Err(corrupt(format!("docmap key {doc_id} holds document {}", doc.id)));
            }
            let tf = self
                .term_frequencies
                .get(&doc_id)
                .ok_or_else(|| corrupt(format!("document {doc_id} has no term frequencies")))?;
            let len = self
                .doc_lengths
                .get(&doc_id)
                .ok_or_else(|| corrupt(format!("document {doc_id} has no length")))?;
            let sum: u64 = tf.values().map(|&c| c as u64).sum();
            if sum != *len as u64 {
                return Err(corrupt(format!("document {doc_id} has length {len} but {sum} counted tokens")));
            }
            for (term, &count) in tf {
                let listed = self.postings.get(term).is_some_and(|ids| ids.contains(&doc_id));
                if count == 0 || !listed {
                    return Err(corrupt(format!("term '{term}' in document {doc_id} is not posted")));
                }
            }
        }
        if self.term_frequencies.len() != self.docmap.len() || self.doc_lengths.len() != self.docmap.len() {
            return Err(corrupt("per-document tables cover a different set of documents".into()));
        }
        for (term, ids) in &self.postings {
            if ids.is_empty() {
                return Err(corrupt(format!("term '{term}' has an empty posting list")));
            }
            if let Some(&doc_id) = ids.iter().find(|&&d| self.token_frequency(d, term) == 0) {
                return Err(corrupt(format!("term '{term}' is posted for document {doc_id} without occurrences")));
            }
        }
        Ok(())
    }
}

fn corrupt(msg: String) -> SearchError {
    SearchError::CorruptIndex(msg)
}

/// Single-use builder. `build` consumes it, so every build starts from empty
/// containers.
pub struct IndexBuilder<'a> {
    tokenizer: &'a Tokenizer,
    index: SearchIndex,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(tokenizer: &'a Tokenizer) -> Self {
        Self { tokenizer, index: SearchIndex::default() }
    }

    pub fn build(mut self, corpus: &Corpus) -> Result<SearchIndex> {
        for doc in corpus.documents() {
            self.add_document(doc)?;
        }
        tracing::info!(
            num_docs = self.index.num_docs(),
            num_terms = self.index.num_terms(),
            "built inverted index"
        );
        Ok(self.index)
    }

    fn add_document(&mut self, doc: &Document) -> Result<()> {
        if self.index.docmap.contains_key(&doc.id) {
            return Err(SearchError::DuplicateDocument(doc.id));
        }
        let tokens = self.tokenizer.tokenize(&doc.indexed_text());
        let freqs = self.index.term_frequencies.entry(doc.id).or_default();
        let len = self.index.doc_lengths.entry(doc.id).or_insert(0);
        for token in tokens {
            *freqs.entry(token.clone()).or_insert(0) += 1;
            *len += 1;
            self.index.postings.entry(token).or_default().insert(doc.id);
        }
        self.index.docmap.insert(doc.id, doc.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        Corpus::new(vec![
            Document::new(1, "The Great Escape", "A man escapes prison"),
            Document::new(2, "Escape Room", "Friends escape a room"),
            Document::new(3, "It", "The and of"),
        ])
    }

    #[test]
    fn build_populates_all_tables() {
        let tok = Tokenizer::default();
        let index = SearchIndex::build(&tok, &corpus()).unwrap();
        assert_eq!(index.num_docs(), 3);
        assert_eq!(index.doc_lengths().len(), 3);
        assert_eq!(index.term_frequencies().len(), 3);
        index.validate().unwrap();
    }

    #[test]
    fn doc_length_is_sum_of_counts() {
        let tok = Tokenizer::default();
        let index = SearchIndex::build(&tok, &corpus()).unwrap();
        for (doc_id, tf) in index.term_frequencies() {
            let sum: u32 = tf.values().sum();
            assert_eq!(index.doc_length(*doc_id), sum);
        }
        assert_eq!(index.doc_length(1), 5);
    }

    #[test]
    fn all_stopword_document_has_zero_length() {
        let tok = Tokenizer::default();
        let index = SearchIndex::build(&tok, &corpus()).unwrap();
        assert_eq!(index.doc_length(3), 0);
        assert!(index.term_frequencies()[&3].is_empty());
        assert!(index.document(3).is_some());
    }

    #[test]
    fn postings_are_sorted_and_deduplicated() {
        let tok = Tokenizer::default();
        let index = SearchIndex::build(&tok, &corpus()).unwrap();
        let escape = &tok.tokenize("escape")[0];
        assert_eq!(index.documents_for(escape), vec![1, 2]);
        assert_eq!(index.document_frequency(escape), 2);
        assert_eq!(index.token_frequency(1, escape), 2);
        assert!(index.documents_for("nonexistent").is_empty());
    }

    #[test]
    fn duplicate_ids_fail_the_build() {
        let tok = Tokenizer::default();
        let corpus = Corpus::new(vec![
            Document::new(4, "Alien", "space"),
            Document::new(4, "Aliens", "more space"),
        ]);
        let err = SearchIndex::build(&tok, &corpus).unwrap_err();
        assert!(matches!(err, SearchError::DuplicateDocument(4)));
    }

    #[test]
    fn empty_corpus_builds_empty_index() {
        let index = SearchIndex::build(&Tokenizer::default(), &Corpus::default()).unwrap();
        assert_eq!(index, SearchIndex::default());
        assert_eq!(index.avg_doc_length(), 0.0);
    }

    #[test]
    fn validate_detects_length_mismatch() {
        let tok = Tokenizer::default();
        let mut index = SearchIndex::build(&tok, &corpus()).unwrap();
        index.doc_lengths.insert(1, 99);
        assert!(matches!(index.validate(), Err(SearchError::CorruptIndex(_))));
    }
}
