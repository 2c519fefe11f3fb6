use crate::index::{DocId, Document, SearchIndex};
use crate::scorer::{Bm25Params, Scorer};
use crate::tokenizer::Tokenizer;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_RESULT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    pub bm25: Bm25Params,
    /// Result cap used when the caller does not give one.
    pub result_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { bm25: Bm25Params::default(), result_limit: DEFAULT_RESULT_LIMIT }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedHit {
    pub id: DocId,
    pub title: String,
    pub score: f64,
}

/// Answers queries against one immutable index.
pub struct QueryEngine {
    index: SearchIndex,
    tokenizer: Tokenizer,
    config: SearchConfig,
}

impl QueryEngine {
    pub fn new(index: SearchIndex, tokenizer: Tokenizer, config: SearchConfig) -> Self {
        Self { index, tokenizer, config }
    }

    pub fn index(&self) -> &SearchIndex { &self.index }
    pub fn tokenizer(&self) -> &Tokenizer { &self.tokenizer }
    pub fn config(&self) -> &SearchConfig { &self.config }

    pub fn scorer(&self) -> Scorer<'_> {
        Scorer::new(&self.index, &self.tokenizer, self.config.bm25)
    }

    /// Unranked token match: documents in query-token order, then ascending id
    /// within each posting list, without duplicates, capped at `limit`.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Document> {
        let mut results = Vec::new();
        if limit == 0 {
            return results;
        }
        let mut seen: HashSet<DocId> = HashSet::new();
        for token in self.tokenizer.tokenize(query) {
            for doc_id in self.index.documents_for(&token) {
                if !seen.insert(doc_id) {
                    continue;
                }
                if let Some(doc) = self.index.document(doc_id) {
                    results.push(doc);
                    if results.len() >= limit {
                        return results;
                    }
                }
            }
        }
        results
    }

    /// BM25-ranked search. Only documents matching at least one query token are
    /// scored; equal scores keep the order in which documents were first seen.
    pub fn bm25_search(&self, query: &str, limit: usize) -> Vec<RankedHit> {
        let scorer = self.scorer();
        let mut scores: Vec<(DocId, f64)> = Vec::new();
        let mut slot: HashMap<DocId, usize> = HashMap::new();
        for token in self.tokenizer.tokenize(query) {
            for doc_id in self.index.documents_for(&token) {
                let i = *slot.entry(doc_id).or_insert_with(|| {
                    scores.push((doc_id, 0.0));
                    scores.len() - 1
                });
                scores[i].1 += scorer.bm25_token(doc_id, &token);
            }
        }
        // stable sort keeps first-insertion order among ties
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        tracing::debug!(query, hits = scores.len(), "bm25 search");

        scores
            .into_iter()
            .take(limit)
            .filter_map(|(doc_id, score)| {
                self.index.document(doc_id).map(|doc| RankedHit { id: doc_id, title: doc.title.clone(), score })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Corpus;

    fn engine(docs: Vec<Document>) -> QueryEngine {
        let tok = Tokenizer::default();
        let index = SearchIndex::build(&tok, &Corpus::new(docs)).unwrap();
        QueryEngine::new(index, tok, SearchConfig::default())
    }

    #[test]
    fn exact_search_respects_limit() {
        let docs = (1..=10).map(|i| Document::new(i, format!("Heist {i}"), "a robbery")).collect();
        let engine = engine(docs);
        let ids: Vec<DocId> = engine.search("heist", DEFAULT_RESULT_LIMIT).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert!(engine.search("heist", 0).is_empty());
    }

    #[test]
    fn exact_search_follows_token_then_id_order() {
        let engine = engine(vec![
            Document::new(1, "Shark", "ocean"),
            Document::new(2, "Tornado", "wind"),
            Document::new(3, "Sharknado", "tornado full of shark"),
        ]);
        let ids: Vec<DocId> = engine.search("tornado shark", 5).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn bm25_ties_keep_first_seen_order() {
        let engine = engine(vec![
            Document::new(5, "Ocean", "deep blue"),
            Document::new(2, "Ocean", "deep blue"),
        ]);
        let hits = engine.bm25_search("ocean", 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, hits[1].score);
        // posting lists iterate in ascending id order
        assert_eq!(hits[0].id, 2);
        assert_eq!(hits[1].id, 5);
    }

    #[test]
    fn bm25_sums_over_query_tokens() {
        let engine = engine(vec![
            Document::new(1, "Shark", "ocean"),
            Document::new(2, "Shark", "desert"),
            Document::new(3, "Camel", "desert"),
            Document::new(4, "Fish", "pond"),
        ]);
        let hits = engine.bm25_search("shark ocean", 5);
        assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![1, 2]);
        let scorer = engine.scorer();
        let expected = scorer.bm25(1, "shark").unwrap() + scorer.bm25(1, "ocean").unwrap();
        assert!((hits[0].score - expected).abs() < 1e-12);
    }
}
