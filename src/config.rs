//! TOML configuration.
//!
//! Every section and field is optional; an absent file or an empty file
//! yields the built-in defaults. [`load_config`] parses and validates.
//!
//! ```toml
//! [cache]
//! dir = ".plagcheck_cache"
//!
//! [retrieval]
//! timeouts_secs = [15, 25, 35]
//! delays_secs = [2, 5, 10]
//! url_delay_secs = 1
//! min_content_chars = 200
//! academic_apis = ["arxiv", "unpaywall", "semantic_scholar"]
//!
//! [similarity]
//! sentence_threshold = 0.7
//! inclusion_threshold = 0.01
//!
//! [search]
//! engine = "auto"
//! max_sources = 5
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use plagcheck_core::similarity::SimilarityConfig;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub similarity: SimilaritySection,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub phrases: PhraseConfig,
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".plagcheck_cache")
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Per-attempt timeouts, one per strategy (desktop, mobile, session).
    #[serde(default = "default_timeouts")]
    pub timeouts_secs: Vec<u64>,
    /// Wait after a failed attempt; unused after the last one.
    #[serde(default = "default_delays")]
    pub delays_secs: Vec<u64>,
    #[serde(default = "default_url_delay")]
    pub url_delay_secs: u64,
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
    #[serde(default = "default_academic_apis")]
    pub academic_apis: Vec<String>,
    #[serde(default = "default_api_timeout")]
    pub api_timeout_secs: u64,
    #[serde(default = "default_pdf_timeout")]
    pub pdf_timeout_secs: u64,
    #[serde(default = "default_unpaywall_email")]
    pub unpaywall_email: String,
    #[serde(default = "default_min_ascii_ratio")]
    pub min_ascii_ratio: f64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            timeouts_secs: default_timeouts(),
            delays_secs: default_delays(),
            url_delay_secs: default_url_delay(),
            min_content_chars: default_min_content_chars(),
            academic_apis: default_academic_apis(),
            api_timeout_secs: default_api_timeout(),
            pdf_timeout_secs: default_pdf_timeout(),
            unpaywall_email: default_unpaywall_email(),
            min_ascii_ratio: default_min_ascii_ratio(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_timeouts() -> Vec<u64> {
    vec![15, 25, 35]
}
fn default_delays() -> Vec<u64> {
    vec![2, 5, 10]
}
fn default_url_delay() -> u64 {
    1
}
fn default_min_content_chars() -> usize {
    200
}
fn default_academic_apis() -> Vec<String> {
    vec![
        "arxiv".to_string(),
        "unpaywall".to_string(),
        "semantic_scholar".to_string(),
    ]
}
fn default_api_timeout() -> u64 {
    15
}
fn default_pdf_timeout() -> u64 {
    20
}
fn default_unpaywall_email() -> String {
    "plagcheck@example.org".to_string()
}
fn default_min_ascii_ratio() -> f64 {
    0.7
}
fn default_max_redirects() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimilaritySection {
    #[serde(default = "default_document_max_features")]
    pub document_max_features: usize,
    #[serde(default = "default_sentence_max_features")]
    pub sentence_max_features: usize,
    #[serde(default = "default_min_sentence_words")]
    pub min_sentence_words: usize,
    #[serde(default = "default_sentence_threshold")]
    pub sentence_threshold: f64,
    #[serde(default = "default_inclusion_threshold")]
    pub inclusion_threshold: f64,
}

impl Default for SimilaritySection {
    fn default() -> Self {
        Self {
            document_max_features: default_document_max_features(),
            sentence_max_features: default_sentence_max_features(),
            min_sentence_words: default_min_sentence_words(),
            sentence_threshold: default_sentence_threshold(),
            inclusion_threshold: default_inclusion_threshold(),
        }
    }
}

fn default_document_max_features() -> usize {
    1000
}
fn default_sentence_max_features() -> usize {
    500
}
fn default_min_sentence_words() -> usize {
    5
}
fn default_sentence_threshold() -> f64 {
    0.7
}
fn default_inclusion_threshold() -> f64 {
    0.01
}

impl SimilaritySection {
    pub fn to_engine_config(&self) -> SimilarityConfig {
        SimilarityConfig {
            document_max_features: self.document_max_features,
            sentence_max_features: self.sentence_max_features,
            min_sentence_words: self.min_sentence_words,
            sentence_threshold: self.sentence_threshold,
            inclusion_threshold: self.inclusion_threshold,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// `auto`, `duckduckgo`, `serpapi` or `none`.
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
    #[serde(default)]
    pub serpapi_api_key: Option<String>,
    #[serde(default = "default_phrase_delay")]
    pub phrase_delay_secs: u64,
    #[serde(default = "default_web_results")]
    pub web_results_per_phrase: usize,
    #[serde(default = "default_academic_results")]
    pub academic_results_per_phrase: usize,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_excluded_domains")]
    pub excluded_domains: Vec<String>,
    #[serde(default)]
    pub use_apis: bool,
    #[serde(default)]
    pub use_local: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            max_sources: default_max_sources(),
            serpapi_api_key: None,
            phrase_delay_secs: default_phrase_delay(),
            web_results_per_phrase: default_web_results(),
            academic_results_per_phrase: default_academic_results(),
            timeout_secs: default_search_timeout(),
            excluded_domains: default_excluded_domains(),
            use_apis: false,
            use_local: false,
        }
    }
}

fn default_engine() -> String {
    "auto".to_string()
}
fn default_max_sources() -> usize {
    5
}
fn default_phrase_delay() -> u64 {
    4
}
fn default_web_results() -> usize {
    5
}
fn default_academic_results() -> usize {
    3
}
fn default_search_timeout() -> u64 {
    20
}
fn default_excluded_domains() -> Vec<String> {
    ["youtube.com", "facebook.com", "twitter.com", "instagram.com"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PhraseConfig {
    #[serde(default = "default_min_phrase_words")]
    pub min_words: usize,
    #[serde(default = "default_max_phrase_words")]
    pub max_words: usize,
    /// Fixed phrase count; `0` selects every candidate, absent scales with length.
    #[serde(default)]
    pub count: Option<usize>,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            min_words: default_min_phrase_words(),
            max_words: default_max_phrase_words(),
            count: None,
        }
    }
}

fn default_min_phrase_words() -> usize {
    8
}
fn default_max_phrase_words() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentConfig {
    #[serde(default = "default_min_document_chars")]
    pub min_chars: usize,
    #[serde(default = "default_chars_per_page")]
    pub chars_per_page: usize,
    #[serde(default = "default_local_dir")]
    pub local_references_dir: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            min_chars: default_min_document_chars(),
            chars_per_page: default_chars_per_page(),
            local_references_dir: default_local_dir(),
        }
    }
}

fn default_min_document_chars() -> usize {
    100
}
fn default_chars_per_page() -> usize {
    3000
}
fn default_local_dir() -> String {
    "local_references".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReportConfig {
    /// Directory for reports and search manifests; defaults to the
    /// document's directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.timeouts_secs.is_empty() {
            bail!("retrieval.timeouts_secs must not be empty");
        }
        if r.timeouts_secs.len() > 3 {
            bail!("retrieval.timeouts_secs supports at most 3 strategies (desktop, mobile, session)");
        }
        if r.delays_secs.len() != r.timeouts_secs.len() {
            bail!(
                "retrieval.delays_secs must have one entry per timeout ({} timeouts, {} delays)",
                r.timeouts_secs.len(),
                r.delays_secs.len()
            );
        }
        if r.timeouts_secs.iter().any(|&t| t == 0) {
            bail!("retrieval.timeouts_secs must be > 0");
        }
        if !strictly_increasing(&r.timeouts_secs) {
            bail!("retrieval.timeouts_secs must be strictly increasing");
        }
        if !strictly_increasing(&r.delays_secs) {
            bail!("retrieval.delays_secs must be strictly increasing");
        }
        if !(0.0..=1.0).contains(&r.min_ascii_ratio) {
            bail!("retrieval.min_ascii_ratio must be in [0.0, 1.0]");
        }
        for api in &r.academic_apis {
            match api.as_str() {
                "arxiv" | "unpaywall" | "semantic_scholar" => {}
                other => bail!(
                    "Unknown academic API: '{}'. Must be arxiv, unpaywall, or semantic_scholar.",
                    other
                ),
            }
        }

        let s = &self.similarity;
        if s.document_max_features == 0 || s.sentence_max_features == 0 {
            bail!("similarity max_features values must be > 0");
        }
        if !(0.0..=1.0).contains(&s.sentence_threshold) {
            bail!("similarity.sentence_threshold must be in [0.0, 1.0]");
        }
        if !(0.0..=1.0).contains(&s.inclusion_threshold) {
            bail!("similarity.inclusion_threshold must be in [0.0, 1.0]");
        }

        match self.search.engine.as_str() {
            "auto" | "duckduckgo" | "serpapi" | "none" => {}
            other => bail!(
                "Unknown search engine: '{}'. Must be auto, duckduckgo, serpapi, or none.",
                other
            ),
        }
        if self.search.max_sources == 0 {
            bail!("search.max_sources must be >= 1");
        }

        if self.phrases.min_words == 0 || self.phrases.min_words > self.phrases.max_words {
            bail!("phrases.min_words must be > 0 and <= phrases.max_words");
        }
        if self.document.chars_per_page == 0 {
            bail!("document.chars_per_page must be > 0");
        }
        Ok(())
    }
}

fn strictly_increasing(values: &[u64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load `path` when given, otherwise validated defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn empty_file_gives_defaults() {
        let f = write_config("");
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.retrieval.timeouts_secs, vec![15, 25, 35]);
        assert_eq!(cfg.retrieval.delays_secs, vec![2, 5, 10]);
        assert_eq!(cfg.retrieval.min_content_chars, 200);
        assert_eq!(cfg.search.engine, "auto");
        assert_eq!(cfg.search.max_sources, 5);
        assert_eq!(cfg.similarity.to_engine_config(), SimilarityConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let f = write_config("[search]\nengine = \"none\"\n\n[similarity]\nsentence_threshold = 0.8\n");
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.search.engine, "none");
        assert_eq!(cfg.search.phrase_delay_secs, 4);
        assert_eq!(cfg.similarity.sentence_threshold, 0.8);
        assert_eq!(cfg.similarity.inclusion_threshold, 0.01);
    }

    #[test]
    fn non_increasing_timeouts_rejected() {
        let f = write_config("[retrieval]\ntimeouts_secs = [15, 15, 35]\n");
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn mismatched_delays_rejected() {
        let f = write_config("[retrieval]\ntimeouts_secs = [10, 20]\n");
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn unknown_engine_rejected() {
        let f = write_config("[search]\nengine = \"bing\"\n");
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown search engine"));
    }

    #[test]
    fn unknown_api_rejected() {
        let f = write_config("[retrieval]\nacademic_apis = [\"scopus\"]\n");
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/plagcheck.toml")).is_err());
    }

    #[test]
    fn defaults_validate() {
        assert!(load_or_default(None).is_ok());
    }
}
