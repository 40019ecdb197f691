//! Two-stage retrieval: candidates from the title index, then TF-IDF cosine ranking.

use crate::error::{Result, StoreError};
use crate::index::InvertedIndex;
use crate::persist::{load_meta, try_load_corpus, try_load_index, DataPaths};
use crate::rank::{cosine, TfIdfSpace};
use crate::tokenizer::tokenize;
use crate::{DocId, Publication};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    #[serde(flatten)]
    pub publication: Publication,
}

#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// Corpus or index has not been produced yet.
    NoData,
    Hits(Vec<SearchHit>),
}

/// Score each candidate title against the raw query and order by
/// `(score desc, doc_id asc)`. Only doc ids from `candidates` are returned.
pub fn rank_candidates(query: &str, candidates: &BTreeSet<DocId>, corpus: &[Publication]) -> Vec<(DocId, f64)> {
    let ids: Vec<DocId> = candidates.iter().copied().filter(|&d| (d as usize) < corpus.len()).collect();
    if ids.is_empty() {
        return Vec::new();
    }
    let titles: Vec<&str> = ids.iter().map(|&d| corpus[d as usize].title.as_str()).collect();
    let (space, doc_vectors) = TfIdfSpace::fit_transform(&titles);
    let query_vector = space.transform(query);

    let mut ranked: Vec<(DocId, f64)> = ids
        .into_iter()
        .zip(doc_vectors.iter())
        .map(|(doc_id, v)| (doc_id, cosine(&query_vector, v)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Loaded corpus and index, immutable once built and shared between queries.
#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    corpus: Vec<Publication>,
    index: InvertedIndex,
}

impl SearchEngine {
    /// Pair a corpus with its index, rejecting postings that point past the corpus.
    pub fn new(corpus: Vec<Publication>, index: InvertedIndex) -> Result<Self> {
        index.check_bounds(corpus.len())?;
        Ok(Self { corpus, index })
    }

    /// Load the persisted artifacts. Missing files give an engine that answers
    /// [`SearchOutcome::NoData`]; malformed or mismatched files are errors.
    pub fn open(paths: &DataPaths) -> Result<Self> {
        let corpus = try_load_corpus(paths)?;
        let index = try_load_index(paths)?;
        let (Some(corpus), Some(index)) = (corpus, index) else {
            tracing::warn!(root = %paths.root.display(), "corpus or index missing; run the crawl and index build first");
            return Ok(Self::default());
        };
        match load_meta(paths)? {
            Some(meta) if meta.corpus_sha1 != corpus.fingerprint => {
                return Err(StoreError::StaleIndex { expected: meta.corpus_sha1, actual: corpus.fingerprint });
            }
            Some(_) => {}
            None => tracing::warn!("index manifest missing; cannot confirm the index matches the corpus"),
        }
        let engine = Self::new(corpus.publications, index)?;
        tracing::info!(num_docs = engine.num_docs(), num_terms = engine.num_terms(), "search engine loaded");
        Ok(engine)
    }

    pub fn has_data(&self) -> bool { !self.corpus.is_empty() && !self.index.is_empty() }

    pub fn num_docs(&self) -> usize { self.corpus.len() }

    pub fn num_terms(&self) -> usize { self.index.num_terms() }

    pub fn publication(&self, doc_id: DocId) -> Option<&Publication> {
        self.corpus.get(doc_id as usize)
    }

    pub fn candidates(&self, query: &str) -> BTreeSet<DocId> {
        self.index.candidates(&tokenize(query))
    }

    /// Ranked `(doc_id, score)` pairs; empty when no query term is indexed.
    pub fn rank(&self, query: &str) -> Vec<(DocId, f64)> {
        let candidates = self.candidates(query);
        if candidates.is_empty() {
            return Vec::new();
        }
        rank_candidates(query, &candidates, &self.corpus)
    }

    pub fn search(&self, query: &str) -> SearchOutcome {
        if !self.has_data() {
            return SearchOutcome::NoData;
        }
        let hits = self
            .rank(query)
            .into_iter()
            .filter_map(|(doc_id, score)| {
                self.publication(doc_id).map(|p| SearchHit { doc_id, score, publication: p.clone() })
            })
            .collect();
        SearchOutcome::Hits(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_index;

    fn publication(title: &str) -> Publication {
        Publication {
            title: title.into(),
            authors: vec![],
            publication_year: "2022".into(),
            journal: None,
            volume: None,
            link: format!("https://portal.example/{}", title.replace(' ', "-")),
        }
    }

    #[test]
    fn ties_break_by_ascending_doc_id() {
        let corpus = vec![publication("Trade"), publication("Finance"), publication("Trade"), publication("Trade")];
        let candidates: BTreeSet<DocId> = [3, 0, 2].into_iter().collect();
        let ranked = rank_candidates("trade", &candidates, &corpus);
        let ids: Vec<DocId> = ranked.iter().map(|(d, _)| *d).collect();
        assert_eq!(ids, vec![0, 2, 3]);
    }

    #[test]
    fn unknown_query_terms_return_nothing() {
        let corpus = vec![publication("Corporate Governance")];
        let engine = SearchEngine::new(corpus.clone(), build_index(&corpus)).unwrap();
        assert!(engine.rank("quantum chromodynamics").is_empty());
        assert!(engine.rank("!!! 2024").is_empty());
        match engine.search("quantum") {
            SearchOutcome::Hits(h) => assert!(h.is_empty()),
            SearchOutcome::NoData => panic!("engine has data"),
        }
    }

    #[test]
    fn empty_engine_reports_no_data() {
        assert!(matches!(SearchEngine::default().search("health"), SearchOutcome::NoData));
    }

    #[test]
    fn new_rejects_dangling_postings() {
        let corpus = vec![publication("Audit quality"), publication("Audit fees")];
        let index = build_index(&corpus);
        assert!(SearchEngine::new(corpus[..1].to_vec(), index).is_err());
    }

    #[test]
    fn plural_query_reaches_singular_title() {
        let corpus = vec![publication("Outcome measurement")];
        let engine = SearchEngine::new(corpus.clone(), build_index(&corpus)).unwrap();
        assert_eq!(engine.candidates("outcomes").into_iter().collect::<Vec<_>>(), vec![0]);
    }
}
