//! Document-level and sentence-level similarity between a document and its
//! candidate sources.
//!
//! # Algorithm
//!
//! 1. **Document score**: a TF-IDF vectorizer (capped at
//!    [`SimilarityConfig::document_max_features`]) is fit on exactly two
//!    texts, the document and one source, and the cosine of the two rows is
//!    the score.
//! 2. **Sentence matches**: both texts are split into sentences and
//!    sentences shorter than [`SimilarityConfig::min_sentence_words`] are
//!    dropped. One vectorizer is fit over `doc_sentences ++ source_sentences`
//!    and the rows are partitioned at `doc_sentences.len()`, so both sides
//!    share one vocabulary and IDF. The full pairwise cosine matrix is
//!    computed in one pass; each document sentence keeps its best source
//!    sentence if that reaches [`SimilarityConfig::sentence_threshold`].
//! 3. **Inclusion and ranking**: a result is kept when its score reaches
//!    [`SimilarityConfig::inclusion_threshold`] or it has at least one
//!    sentence match. Kept results are stable-sorted by descending score.
//!
//! Vectorizer failures (for example a vocabulary made only of stop words)
//! are logged and treated as "no similarity".

use crate::models::{MatchResult, SentenceMatch, Source};
use crate::text::{split_sentences, word_count};
use crate::tfidf::{cosine, pairwise_cosine, TfidfVectorizer};

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityConfig {
    pub document_max_features: usize,
    pub sentence_max_features: usize,
    pub min_sentence_words: usize,
    pub sentence_threshold: f64,
    pub inclusion_threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            document_max_features: 1000,
            sentence_max_features: 500,
            min_sentence_words: 5,
            sentence_threshold: 0.7,
            inclusion_threshold: 0.01,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimilarityEngine {
    config: SimilarityConfig,
}

impl SimilarityEngine {
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Cosine similarity of the two texts' TF-IDF vectors, in `[0.0, 1.0]`.
    pub fn document_similarity(&self, document: &str, source: &str) -> f64 {
        let vectorizer = TfidfVectorizer::new().max_features(self.config.document_max_features);
        match vectorizer.fit_transform(&[document, source]) {
            Ok(matrix) => {
                let rows = matrix.rows();
                cosine(&rows[0], &rows[1])
            }
            Err(e) => {
                tracing::warn!(error = %e, "document similarity failed; scoring 0.0");
                0.0
            }
        }
    }

    /// Sentences long enough to take part in sentence matching.
    pub fn eligible_sentences(&self, text: &str) -> Vec<String> {
        split_sentences(text)
            .into_iter()
            .filter(|s| word_count(s) >= self.config.min_sentence_words)
            .collect()
    }

    /// Best source sentence per document sentence, in document order.
    pub fn sentence_matches(&self, document: &str, source: &str) -> Vec<SentenceMatch> {
        let doc_sentences = self.eligible_sentences(document);
        self.matches_for(&doc_sentences, source)
    }

    fn matches_for(&self, doc_sentences: &[String], source: &str) -> Vec<SentenceMatch> {
        let src_sentences = self.eligible_sentences(source);
        if doc_sentences.is_empty() || src_sentences.is_empty() {
            return Vec::new();
        }

        let all: Vec<&str> = doc_sentences
            .iter()
            .chain(src_sentences.iter())
            .map(String::as_str)
            .collect();

        let vectorizer = TfidfVectorizer::new().max_features(self.config.sentence_max_features);
        let matrix = match vectorizer.fit_transform(&all) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "sentence matching failed; no matches");
                return Vec::new();
            }
        };

        let (doc_rows, src_rows) = matrix.split_at(doc_sentences.len());
        let sims = pairwise_cosine(doc_rows, src_rows);

        let mut matches = Vec::new();
        for (i, row) in sims.iter().enumerate() {
            let mut best = 0usize;
            for (j, &s) in row.iter().enumerate() {
                if s > row[best] {
                    best = j;
                }
            }
            let similarity = row[best];
            if similarity >= self.config.sentence_threshold {
                matches.push(SentenceMatch {
                    document_sentence: doc_sentences[i].clone(),
                    source_sentence: src_sentences[best].clone(),
                    similarity,
                });
            }
        }
        matches
    }

    /// Score one source against the document.
    pub fn compare(&self, document: &str, source: &Source) -> MatchResult {
        let doc_sentences = self.eligible_sentences(document);
        self.compare_with_sentences(document, &doc_sentences, source)
    }

    fn compare_with_sentences(
        &self,
        document: &str,
        doc_sentences: &[String],
        source: &Source,
    ) -> MatchResult {
        MatchResult {
            source: source.meta(),
            score: self.document_similarity(document, &source.content),
            matches: self.matches_for(doc_sentences, &source.content),
        }
    }

    /// Compare every source, keep the included results, rank them.
    pub fn analyze(&self, document: &str, sources: &[Source]) -> Vec<MatchResult> {
        self.analyze_with(document, sources, |_, _| {})
    }

    /// Like [`analyze`](Self::analyze), calling `on_source(index, source)`
    /// before each comparison.
    pub fn analyze_with<F>(&self, document: &str, sources: &[Source], mut on_source: F) -> Vec<MatchResult>
    where
        F: FnMut(usize, &Source),
    {
        let doc_sentences = self.eligible_sentences(document);
        let mut results: Vec<MatchResult> = sources
            .iter()
            .enumerate()
            .filter_map(|(i, source)| {
                on_source(i, source);
                let result = self.compare_with_sentences(document, &doc_sentences, source);
                is_included(&result, self.config.inclusion_threshold).then_some(result)
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results
    }
}

/// Whether a result belongs in the report.
pub fn is_included(result: &MatchResult, threshold: f64) -> bool {
    result.score >= threshold || !result.matches.is_empty()
}
