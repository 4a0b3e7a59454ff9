//! TF-IDF phrase selection.
//!
//! Candidates are sentences of `min_words..=max_words` words where at least
//! half of `min_words` are not stop words. When there are more candidates
//! than the phrase budget, the sentences with the highest TF-IDF row sums
//! win, returned in document order.

use plagcheck_core::stopwords::is_stop_word;
use plagcheck_core::text::{split_sentences, truncate_chars};
use plagcheck_core::tfidf::TfidfVectorizer;

use crate::config::PhraseConfig;
use crate::traits::PhraseSelector;

const SCORING_FEATURES: usize = 100;
const FALLBACK_CHARS: usize = 200;
const CHARS_PER_PHRASE: usize = 3000;
const AUTO_MIN: usize = 5;
const AUTO_MAX: usize = 20;

#[derive(Debug, Clone)]
pub struct TfidfPhraseSelector {
    min_words: usize,
    max_words: usize,
    count: Option<usize>,
}

impl TfidfPhraseSelector {
    pub fn new(config: &PhraseConfig) -> Self {
        Self {
            min_words: config.min_words,
            max_words: config.max_words,
            count: config.count,
        }
    }

    /// `Some(0)` selects every candidate.
    pub fn with_count(mut self, count: Option<usize>) -> Self {
        self.count = count;
        self
    }

    pub fn candidates(&self, text: &str) -> Vec<String> {
        split_sentences(text)
            .into_iter()
            .filter(|sentence| {
                let words: Vec<&str> = sentence.split_whitespace().collect();
                if words.len() < self.min_words || words.len() > self.max_words {
                    return false;
                }
                let meaningful = words.iter().filter(|w| !is_stop_word(&w.to_lowercase())).count();
                // half of min_words, rounded up
                meaningful * 2 >= self.min_words
            })
            .collect()
    }

    /// Phrase budget for a text of `text_chars` characters with `candidates`
    /// eligible sentences.
    pub fn budget(&self, text_chars: usize, candidates: usize) -> usize {
        match self.count {
            Some(0) => candidates,
            Some(n) => n,
            None => (text_chars / CHARS_PER_PHRASE).max(1).clamp(AUTO_MIN, AUTO_MAX),
        }
    }
}

impl PhraseSelector for TfidfPhraseSelector {
    fn select(&self, text: &str) -> Vec<String> {
        let candidates = self.candidates(text);
        if candidates.is_empty() {
            tracing::warn!("no suitable sentences found; searching with the opening text");
            let opening = truncate_chars(text, FALLBACK_CHARS).trim();
            return if opening.is_empty() { Vec::new() } else { vec![opening.to_string()] };
        }

        let budget = self.budget(text.chars().count(), candidates.len());
        if self.count == Some(0) {
            tracing::warn!(
                phrases = candidates.len(),
                "selecting every candidate phrase; each one costs a rate-limited search"
            );
        }
        if candidates.len() <= budget {
            return candidates;
        }

        match TfidfVectorizer::new()
            .max_features(SCORING_FEATURES)
            .fit_transform(&candidates)
        {
            Ok(matrix) => {
                let mut ranked: Vec<usize> = (0..candidates.len()).collect();
                // descending score, earlier sentence first on ties
                ranked.sort_by(|&a, &b| matrix.row_sum(b).total_cmp(&matrix.row_sum(a)));
                ranked.truncate(budget);
                ranked.sort_unstable();
                ranked.into_iter().map(|i| candidates[i].clone()).collect()
            }
            Err(e) => {
                tracing::warn!(error = %e, "phrase scoring failed; using uniform spacing");
                let step = (candidates.len() / budget).max(1);
                candidates.into_iter().step_by(step).take(budget).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(count: Option<usize>) -> TfidfPhraseSelector {
        TfidfPhraseSelector::new(&PhraseConfig::default()).with_count(count)
    }

    const LONG: &str = "Photosynthesis converts sunlight carbon dioxide and water into glucose inside chloroplasts. \
        The mitochondria produce cellular energy through oxidative phosphorylation and electron transport chains. \
        Too short here. \
        Ribosomes translate messenger RNA sequences into polypeptide chains during protein synthesis. \
        Glaciers carve valleys through persistent erosion over thousands of years in mountain ranges.";

    #[test]
    fn candidates_respect_word_bounds() {
        let c = selector(None).candidates(LONG);
        assert_eq!(c.len(), 4);
        assert!(c.iter().all(|s| !s.contains("Too short")));
    }

    #[test]
    fn stop_word_heavy_sentences_are_rejected() {
        let text = "It is what it is and it was what it was to them all.";
        assert!(selector(None).candidates(text).is_empty());
    }

    #[test]
    fn no_candidates_uses_opening_text() {
        let text = "Short. ".repeat(60);
        let phrases = selector(None).select(&text);
        assert_eq!(phrases.len(), 1);
        assert!(phrases[0].chars().count() <= 200);
    }

    #[test]
    fn auto_budget_scales_with_length() {
        let s = selector(None);
        assert_eq!(s.budget(1_000, 50), 5);
        assert_eq!(s.budget(30_000, 50), 10);
        assert_eq!(s.budget(300_000, 50), 20);
        assert_eq!(selector(Some(0)).budget(10, 37), 37);
        assert_eq!(selector(Some(3)).budget(10, 37), 3);
    }

    #[test]
    fn over_budget_keeps_document_order() {
        let phrases = selector(Some(2)).select(LONG);
        assert_eq!(phrases.len(), 2);
        let positions: Vec<usize> = phrases.iter().map(|p| LONG.find(p.as_str()).unwrap()).collect();
        assert!(positions[0] < positions[1]);
    }

    #[test]
    fn under_budget_returns_all_candidates() {
        assert_eq!(selector(None).select(LONG).len(), 4);
    }
}
