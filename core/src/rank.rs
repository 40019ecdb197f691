//! Query-time TF-IDF space over a small set of candidate titles.
//!
//! The space is fitted on the candidate titles only, so its IDF reflects how
//! discriminative a word is among the candidates rather than the whole corpus.
//! Weights use raw term counts, smoothed IDF `ln((1 + n) / (1 + df)) + 1` and
//! L2-normalized rows; cosine similarity is then a sparse dot product.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"(?u)\b\w\w+\b").expect("valid regex");
}

/// Sparse vector as `(term index, weight)` pairs sorted by term index.
pub type SparseVec = Vec<(usize, f64)>;

/// Lowercase and split into word tokens of two or more characters.
pub fn analyze(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}

pub struct TfIdfSpace {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfIdfSpace {
    /// Fit vocabulary and IDF on `documents`, returning the space and each document's vector.
    pub fn fit_transform<S: AsRef<str>>(documents: &[S]) -> (Self, Vec<SparseVec>) {
        let analyzed: Vec<Vec<String>> = documents.iter().map(|d| analyze(d.as_ref())).collect();

        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut df: Vec<u32> = Vec::new();
        for terms in &analyzed {
            let mut seen: Vec<usize> = Vec::new();
            for term in terms {
                let next = vocabulary.len();
                let id = *vocabulary.entry(term.clone()).or_insert(next);
                if id == df.len() {
                    df.push(0);
                }
                if !seen.contains(&id) {
                    seen.push(id);
                    df[id] += 1;
                }
            }
        }

        let n = documents.len() as f64;
        let idf = df.iter().map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0).collect();
        let space = Self { vocabulary, idf };
        let vectors = analyzed.iter().map(|terms| space.weigh(terms)).collect();
        (space, vectors)
    }

    /// Vectorize text into the fitted space; words outside the vocabulary are dropped.
    pub fn transform(&self, text: &str) -> SparseVec {
        self.weigh(&analyze(text))
    }

    pub fn vocabulary_len(&self) -> usize { self.vocabulary.len() }

    fn weigh(&self, terms: &[String]) -> SparseVec {
        let mut counts: HashMap<usize, u32> = HashMap::new();
        for term in terms {
            if let Some(&id) = self.vocabulary.get(term) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let mut v: SparseVec = counts.into_iter().map(|(id, tf)| (id, tf as f64 * self.idf[id])).collect();
        v.sort_by_key(|(id, _)| *id);
        let norm = v.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in v.iter_mut() {
                *w /= norm;
            }
        }
        v
    }
}

/// Cosine similarity of two L2-normalized sparse vectors; zero when either is empty.
pub fn cosine(a: &SparseVec, b: &SparseVec) -> f64 {
    let (mut i, mut j, mut dot) = (0, 0, 0.0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot
}
