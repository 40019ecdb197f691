use crate::error::{Result, StoreError};
use crate::tokenizer::tokenize;
use crate::{DocId, Publication};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Title term → ascending, duplicate-free doc ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvertedIndex {
    postings: BTreeMap<String, Vec<DocId>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Record that `doc_id` contains `term`. Doc ids must arrive in ascending order.
    pub fn insert(&mut self, term: String, doc_id: DocId) {
        let list = self.postings.entry(term).or_default();
        if list.last() != Some(&doc_id) {
            list.push(doc_id);
        }
    }

    pub fn postings(&self, term: &str) -> &[DocId] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &[DocId])> {
        self.postings.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    /// Union of the posting lists of every query term that is present in the index.
    pub fn candidates<S: AsRef<str>>(&self, terms: &[S]) -> BTreeSet<DocId> {
        terms
            .iter()
            .flat_map(|t| self.postings(t.as_ref()).iter().copied())
            .collect()
    }

    /// Check that every posting addresses a publication of a corpus holding `num_docs` records.
    pub fn check_bounds(&self, num_docs: usize) -> Result<()> {
        for (token, list) in &self.postings {
            if let Some(&doc_id) = list.iter().find(|&&d| d as usize >= num_docs) {
                return Err(StoreError::DanglingPosting { token: token.clone(), doc_id, num_docs });
            }
        }
        Ok(())
    }

    /// Postings whose document title no longer normalizes to the posted term.
    pub fn mismatched_postings(&self, corpus: &[Publication]) -> Vec<(String, DocId)> {
        let titles: Vec<Vec<String>> = corpus.iter().map(|p| tokenize(&p.title)).collect();
        let mut out = Vec::new();
        for (term, list) in &self.postings {
            for &doc_id in list {
                let found = titles.get(doc_id as usize).is_some_and(|t| t.iter().any(|w| w == term));
                if !found {
                    out.push((term.clone(), doc_id));
                }
            }
        }
        out
    }
}

/// Build the title index; a publication's doc id is its position in `publications`.
pub fn build_index(publications: &[Publication]) -> InvertedIndex {
    let mut index = InvertedIndex::new();
    for (doc_id, publication) in publications.iter().enumerate() {
        for term in tokenize(&publication.title) {
            index.insert(term, doc_id as DocId);
        }
    }
    tracing::debug!(num_docs = publications.len(), num_terms = index.num_terms(), "built title index");
    index
}
