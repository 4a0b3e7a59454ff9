//! TF-IDF vectorization over a bounded vocabulary.
//!
//! # Weighting
//!
//! ```text
//! idf(t)    = ln((1 + n) / (1 + df(t))) + 1
//! w(t, d)   = count(t, d) × idf(t)
//! row(d)    = w(·, d) / ‖w(·, d)‖₂
//! ```
//!
//! `n` is the number of fitted documents. When `max_features` is set the
//! vocabulary keeps the terms with the highest total count across the corpus
//! (ties broken alphabetically), so the result is deterministic.
//!
//! Rows are sparse `(term_index, weight)` lists sorted by index. A row is
//! empty when none of its tokens survived stop-word removal or the feature
//! cap; its cosine with anything is `0.0`.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::stopwords::is_stop_word;
use crate::text::tokenize;

/// Sparse, L2-normalized TF-IDF row.
pub type SparseRow = Vec<(usize, f64)>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TfidfError {
    #[error("no documents to vectorize")]
    NoDocuments,
    #[error("empty vocabulary; documents contain only stop words or no tokens")]
    EmptyVocabulary,
}

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: Option<usize>,
    remove_stop_words: bool,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TfidfVectorizer {
    /// English stop words removed, unbounded vocabulary.
    pub fn new() -> Self {
        Self {
            max_features: None,
            remove_stop_words: true,
        }
    }

    pub fn max_features(mut self, limit: usize) -> Self {
        self.max_features = Some(limit);
        self
    }

    pub fn keep_stop_words(mut self) -> Self {
        self.remove_stop_words = false;
        self
    }

    /// Fit the vocabulary on `docs` and return one row per document, in order.
    pub fn fit_transform<S: AsRef<str>>(&self, docs: &[S]) -> Result<TfidfMatrix, TfidfError> {
        if docs.is_empty() {
            return Err(TfidfError::NoDocuments);
        }

        let tokenized: Vec<Vec<String>> = docs
            .iter()
            .map(|d| {
                tokenize(d.as_ref())
                    .into_iter()
                    .filter(|t| !self.remove_stop_words || !is_stop_word(t))
                    .collect()
            })
            .collect();

        let mut term_counts: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let mut seen: HashSet<&str> = HashSet::new();
            for token in tokens {
                *term_counts.entry(token.as_str()).or_insert(0) += 1;
                if seen.insert(token.as_str()) {
                    *doc_freq.entry(token.as_str()).or_insert(0) += 1;
                }
            }
        }

        if term_counts.is_empty() {
            return Err(TfidfError::EmptyVocabulary);
        }

        let mut terms: Vec<(&str, usize)> = term_counts.into_iter().collect();
        if let Some(limit) = self.max_features {
            if terms.len() > limit {
                terms.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
                terms.truncate(limit);
            }
        }

        let mut vocabulary: Vec<String> = terms.iter().map(|(t, _)| t.to_string()).collect();
        vocabulary.sort();

        let index: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let n = docs.len() as f64;
        let idf: Vec<f64> = vocabulary
            .iter()
            .map(|t| {
                let df = doc_freq.get(t.as_str()).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let rows = tokenized
            .iter()
            .map(|tokens| {
                let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
                for token in tokens {
                    if let Some(&i) = index.get(token.as_str()) {
                        *counts.entry(i).or_insert(0.0) += 1.0;
                    }
                }
                let row: SparseRow = counts.into_iter().map(|(i, c)| (i, c * idf[i])).collect();
                l2_normalize(row)
            })
            .collect();

        Ok(TfidfMatrix { rows, vocabulary })
    }
}

fn l2_normalize(mut row: SparseRow) -> SparseRow {
    let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > f64::EPSILON {
        for (_, w) in row.iter_mut() {
            *w /= norm;
        }
    }
    row
}

/// Fitted TF-IDF rows plus the (alphabetically sorted) vocabulary.
#[derive(Debug, Clone)]
pub struct TfidfMatrix {
    rows: Vec<SparseRow>,
    vocabulary: Vec<String>,
}

impl TfidfMatrix {
    pub fn rows(&self) -> &[SparseRow] {
        &self.rows
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of the weights of one row.
    pub fn row_sum(&self, i: usize) -> f64 {
        self.rows[i].iter().map(|(_, w)| w).sum()
    }

    /// Partition the rows at `mid`: `[0, mid)` and `[mid, len)`.
    pub fn split_at(&self, mid: usize) -> (&[SparseRow], &[SparseRow]) {
        self.rows.split_at(mid)
    }
}

/// Cosine similarity of two sparse rows, clamped to `[0.0, 1.0]`.
///
/// Returns `0.0` if either row is empty.
pub fn cosine(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let norm_a = a.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm_a < f64::EPSILON || norm_b < f64::EPSILON {
        return 0.0;
    }

    let (mut i, mut j, mut dot) = (0usize, 0usize, 0.0f64);
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

    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Full `left.len() × right.len()` cosine-similarity matrix.
pub fn pairwise_cosine(left: &[SparseRow], right: &[SparseRow]) -> Vec<Vec<f64>> {
    left.iter()
        .map(|l| right.iter().map(|r| cosine(l, r)).collect())
        .collect()
}
