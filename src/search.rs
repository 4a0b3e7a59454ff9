//! Search providers and the SEARCH stage.
//!
//! Providers implement [`SearchProvider`]:
//!
//! | Provider | Backend |
//! |----------|---------|
//! | [`SerpApiProvider`] | Google results through SerpApi (API key) |
//! | [`DuckDuckGoProvider`] | DuckDuckGo's HTML endpoint (no key, rate limited) |
//! | [`AcademicSearch`] | CrossRef DOIs and arXiv ids, queried concurrently |
//! | [`NoSearch`] | Offline; always empty |
//!
//! [`SearchStage`] runs every phrase through the academic provider (when
//! enabled) and the web provider, filters and deduplicates the URLs in
//! first-seen order, and truncates to `max_sources`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;

use plagcheck_core::text::truncate_chars;

use crate::academic::atom_entry_ids;
use crate::config::{Config, SearchConfig};
use crate::fetch::{FetchError, HttpFetcher, Sleeper, Strategy};
use crate::progress::{ProgressEvent, ProgressReporter, Stage};
use crate::traits::SearchProvider;

const SERPAPI_BASE: &str = "https://serpapi.com/search";
const DUCKDUCKGO_BASE: &str = "https://html.duckduckgo.com/html/";
const CROSSREF_BASE: &str = "https://api.crossref.org/works";
const ARXIV_SEARCH_BASE: &str = "http://export.arxiv.org/api/query";

/// Hosts whose pages are served by the academic APIs instead of scraping.
pub const API_DOMAINS: &[&str] = &[
    "arxiv.org",
    "semanticscholar.org",
    "crossref.org",
    "doi.org",
    "ncbi.nlm.nih.gov",
    "pubmed",
];

const CONSECUTIVE_FAILURE_WARNING: usize = 3;

/// Substring-based URL exclusion.
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    excluded: Vec<String>,
}

impl UrlFilter {
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: excluded.into_iter().map(|s| s.into().to_lowercase()).collect(),
        }
    }

    pub fn allows(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        !self.excluded.iter().any(|d| lower.contains(d.as_str()))
    }
}

// ── SerpApi ─────────────────────────────────────────────────────────────

pub struct SerpApiProvider {
    http: HttpFetcher,
    base: String,
    key: String,
    num: usize,
    timeout: Duration,
    disabled: AtomicBool,
}

impl SerpApiProvider {
    pub fn new(http: HttpFetcher, key: String, config: &SearchConfig) -> Self {
        Self::with_base(http, key, config, SERPAPI_BASE)
    }

    pub fn with_base(http: HttpFetcher, key: String, config: &SearchConfig, base: &str) -> Self {
        Self {
            http,
            base: base.to_string(),
            key,
            num: config.web_results_per_phrase,
            timeout: Duration::from_secs(config.timeout_secs),
            disabled: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SearchProvider for SerpApiProvider {
    fn name(&self) -> &str {
        "serpapi"
    }

    async fn search(&self, phrase: &str) -> Vec<String> {
        if self.disabled.load(Ordering::Relaxed) {
            return Vec::new();
        }
        let num = self.num.to_string();
        let url = match url::Url::parse_with_params(
            &self.base,
            &[
                ("api_key", self.key.as_str()),
                ("engine", "google"),
                ("q", truncate_chars(phrase, 200)),
                ("num", num.as_str()),
                ("hl", "en"),
                ("gl", "us"),
            ],
        ) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(error = %e, "invalid SerpApi base URL");
                return Vec::new();
            }
        };

        let response = match self.http.api_get(url.as_str(), self.timeout).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "SerpApi request failed");
                return Vec::new();
            }
        };
        match response.status {
            200 => {}
            401 => {
                tracing::warn!("SerpApi key invalid; disabling SerpApi for this run");
                self.disabled.store(true, Ordering::Relaxed);
                return Vec::new();
            }
            429 => {
                tracing::warn!("SerpApi rate limit exceeded");
                return Vec::new();
            }
            status => {
                tracing::warn!(status, "SerpApi returned an error status");
                return Vec::new();
            }
        }

        let data: Value = match serde_json::from_slice(&response.body) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse SerpApi response");
                return Vec::new();
            }
        };
        data.get("organic_results")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("link").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ── DuckDuckGo ──────────────────────────────────────────────────────────

pub struct DuckDuckGoProvider {
    http: HttpFetcher,
    sleeper: Arc<dyn Sleeper>,
    base: String,
    limit: usize,
    timeout: Duration,
    retry_delay: Duration,
    rate_limited: AtomicBool,
}

impl DuckDuckGoProvider {
    pub fn new(http: HttpFetcher, sleeper: Arc<dyn Sleeper>, config: &SearchConfig) -> Self {
        Self::with_base(http, sleeper, config, DUCKDUCKGO_BASE)
    }

    pub fn with_base(http: HttpFetcher, sleeper: Arc<dyn Sleeper>, config: &SearchConfig, base: &str) -> Self {
        Self {
            http,
            sleeper,
            base: base.to_string(),
            limit: config.web_results_per_phrase,
            timeout: Duration::from_secs(config.timeout_secs),
            retry_delay: Duration::from_secs(3),
            rate_limited: AtomicBool::new(false),
        }
    }

    /// Whether DuckDuckGo has answered with a rate-limit status this run.
    pub fn was_rate_limited(&self) -> bool {
        self.rate_limited.load(Ordering::Relaxed)
    }
}

/// Keep word characters and whitespace, at most 100 characters.
fn clean_query(phrase: &str) -> String {
    let cleaned: String = phrase
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    truncate_chars(&cleaned, 100).to_string()
}

/// Result links from a DuckDuckGo HTML page, redirect wrappers decoded.
pub fn parse_duckduckgo(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("a.result__a") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(decode_result_href)
        .take(limit)
        .collect()
}

fn decode_result_href(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    if let Ok(parsed) = url::Url::parse(&absolute) {
        if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
            let target = target.into_owned();
            return target.starts_with("http").then_some(target);
        }
    }
    absolute.starts_with("http").then_some(absolute)
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, phrase: &str) -> Vec<String> {
        let query = clean_query(phrase);
        let url = match url::Url::parse_with_params(&self.base, &[("q", query.as_str())]) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(error = %e, "invalid DuckDuckGo base URL");
                return Vec::new();
            }
        };

        for attempt in 0..2 {
            match self.http.get(url.as_str(), Strategy::Session, self.timeout).await {
                Ok(r) if r.status == 200 => {
                    let results = parse_duckduckgo(&r.text(), self.limit);
                    if !results.is_empty() {
                        return results;
                    }
                }
                Ok(r) if r.status == 202 || r.status == 429 => {
                    tracing::warn!(status = r.status, "DuckDuckGo rate limiting detected");
                    self.rate_limited.store(true, Ordering::Relaxed);
                    return Vec::new();
                }
                Ok(r) => tracing::debug!(status = r.status, "DuckDuckGo returned an error status"),
                Err(e) => {
                    tracing::debug!(error = %e, "DuckDuckGo request failed");
                    if attempt == 0 {
                        self.sleeper.sleep(self.retry_delay).await;
                    }
                }
            }
        }
        Vec::new()
    }
}

// ── Academic search ─────────────────────────────────────────────────────

pub struct AcademicSearch {
    http: HttpFetcher,
    crossref_base: String,
    arxiv_base: String,
    rows: usize,
    timeout: Duration,
    mailto: String,
}

impl AcademicSearch {
    pub fn new(http: HttpFetcher, config: &Config) -> Self {
        Self::with_bases(http, config, CROSSREF_BASE, ARXIV_SEARCH_BASE)
    }

    pub fn with_bases(http: HttpFetcher, config: &Config, crossref: &str, arxiv: &str) -> Self {
        Self {
            http,
            crossref_base: crossref.to_string(),
            arxiv_base: arxiv.to_string(),
            rows: config.search.academic_results_per_phrase,
            timeout: Duration::from_secs(config.search.timeout_secs),
            mailto: config.retrieval.unpaywall_email.clone(),
        }
    }

    async fn crossref(&self, phrase: &str) -> Result<Vec<String>, FetchError> {
        let rows = self.rows.to_string();
        let url = url::Url::parse_with_params(
            &self.crossref_base,
            &[
                ("query", truncate_chars(phrase, 100)),
                ("rows", rows.as_str()),
                ("mailto", self.mailto.as_str()),
            ],
        )
        .map_err(|e| FetchError::Request(e.to_string()))?;
        let response = self.http.api_get(url.as_str(), self.timeout).await?;
        if response.status != 200 {
            return Err(FetchError::Status(response.status));
        }
        let data: Value =
            serde_json::from_slice(&response.body).map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(data
            .pointer("/message/items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.get("DOI").and_then(Value::as_str))
                    .map(|doi| format!("https://doi.org/{doi}"))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn arxiv(&self, phrase: &str) -> Result<Vec<String>, FetchError> {
        let rows = self.rows.to_string();
        let search_query = format!("all:{}", truncate_chars(phrase, 100));
        let url = url::Url::parse_with_params(
            &self.arxiv_base,
            &[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", rows.as_str()),
            ],
        )
        .map_err(|e| FetchError::Request(e.to_string()))?;
        let response = self.http.api_get(url.as_str(), self.timeout).await?;
        if response.status != 200 {
            return Err(FetchError::Status(response.status));
        }
        Ok(atom_entry_ids(&response.text()))
    }
}

#[async_trait]
impl SearchProvider for AcademicSearch {
    fn name(&self) -> &str {
        "academic"
    }

    async fn search(&self, phrase: &str) -> Vec<String> {
        let (crossref, arxiv) = tokio::join!(self.crossref(phrase), self.arxiv(phrase));
        let mut urls = Vec::new();
        for (name, result) in [("crossref", crossref), ("arxiv", arxiv)] {
            match result {
                Ok(found) => urls.extend(found),
                Err(e) => tracing::debug!(api = name, error = %e, "academic search failed"),
            }
        }
        dedup_in_order(urls)
    }
}

// ── Offline ─────────────────────────────────────────────────────────────

pub struct NoSearch;

#[async_trait]
impl SearchProvider for NoSearch {
    fn name(&self) -> &str {
        "none"
    }

    async fn search(&self, _phrase: &str) -> Vec<String> {
        Vec::new()
    }
}

fn dedup_in_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}

/// SerpApi key from config, else `SERPAPI_API_KEY`.
pub fn serpapi_key(config: &SearchConfig) -> Option<String> {
    config
        .serpapi_api_key
        .clone()
        .or_else(|| std::env::var("SERPAPI_API_KEY").ok())
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Web provider for `engine` (`auto`, `duckduckgo`, `serpapi`, `none`).
pub fn web_provider(
    engine: &str,
    config: &SearchConfig,
    http: &HttpFetcher,
    sleeper: Arc<dyn Sleeper>,
) -> Result<Box<dyn SearchProvider>> {
    let key = serpapi_key(config);
    let provider: Box<dyn SearchProvider> = match (engine, key) {
        ("auto", Some(key)) | ("serpapi", Some(key)) => {
            Box::new(SerpApiProvider::new(http.clone(), key, config))
        }
        ("serpapi", None) => bail!(
            "Search engine 'serpapi' requires an API key: set search.serpapi_api_key or SERPAPI_API_KEY"
        ),
        ("auto", None) => {
            tracing::warn!("no SerpApi key configured; falling back to DuckDuckGo, which rate limits aggressively");
            Box::new(DuckDuckGoProvider::new(http.clone(), sleeper, config))
        }
        ("duckduckgo", _) => Box::new(DuckDuckGoProvider::new(http.clone(), sleeper, config)),
        ("none", _) => Box::new(NoSearch),
        (other, _) => bail!(
            "Unknown search engine: '{}'. Must be auto, duckduckgo, serpapi, or none.",
            other
        ),
    };
    Ok(provider)
}

/// Counts from one SEARCH stage, for the summary line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub urls: Vec<String>,
    pub api_results: usize,
    pub web_results: usize,
    pub failed_searches: usize,
    pub total_searches: usize,
}

pub struct SearchStage {
    web: Box<dyn SearchProvider>,
    academic: Option<Box<dyn SearchProvider>>,
    sleeper: Arc<dyn Sleeper>,
    phrase_delay: Duration,
    max_sources: usize,
    web_filter: UrlFilter,
    academic_filter: UrlFilter,
}

impl SearchStage {
    /// `excluded` always applies; [`API_DOMAINS`] are also dropped from web
    /// results when an academic provider is present.
    pub fn new(
        web: Box<dyn SearchProvider>,
        academic: Option<Box<dyn SearchProvider>>,
        sleeper: Arc<dyn Sleeper>,
        config: &SearchConfig,
    ) -> Self {
        let excluded = config.excluded_domains.clone();
        let mut web_excluded = excluded.clone();
        if academic.is_some() {
            web_excluded.extend(API_DOMAINS.iter().map(|d| d.to_string()));
        }
        Self {
            web,
            academic,
            sleeper,
            phrase_delay: Duration::from_secs(config.phrase_delay_secs),
            max_sources: config.max_sources,
            web_filter: UrlFilter::new(web_excluded),
            academic_filter: UrlFilter::new(excluded),
        }
    }

    pub async fn run(&self, phrases: &[String], progress: &dyn ProgressReporter) -> SearchOutcome {
        let mut outcome = SearchOutcome::default();
        let mut all = Vec::new();
        let mut consecutive_failures = 0usize;
        let total = phrases.len();

        for (i, phrase) in phrases.iter().enumerate() {
            progress.report(ProgressEvent::Item {
                stage: Stage::Search,
                n: i as u64 + 1,
                total: total as u64,
                label: format!("\"{}\"", truncate_chars(phrase, 100)),
            });

            let mut api_urls = Vec::new();
            if let Some(academic) = &self.academic {
                api_urls = academic
                    .search(phrase)
                    .await
                    .into_iter()
                    .filter(|u| self.academic_filter.allows(u))
                    .collect();
            }
            let web_urls: Vec<String> = self
                .web
                .search(phrase)
                .await
                .into_iter()
                .filter(|u| self.web_filter.allows(u))
                .collect();

            outcome.api_results += api_urls.len();
            outcome.web_results += web_urls.len();
            outcome.total_searches += 1;

            if api_urls.is_empty() && web_urls.is_empty() {
                outcome.failed_searches += 1;
                consecutive_failures += 1;
            } else {
                consecutive_failures = 0;
            }

            all.extend(api_urls);
            all.extend(web_urls);

            let more = i + 1 < total;
            if consecutive_failures >= CONSECUTIVE_FAILURE_WARNING && more {
                let message = format!(
                    "{} consecutive searches returned nothing; {} may be blocking requests",
                    consecutive_failures,
                    self.web.name()
                );
                tracing::warn!("{}", message);
                progress.report(ProgressEvent::Note {
                    stage: Stage::Search,
                    message,
                });
                consecutive_failures = 0;
            }
            if more {
                self.sleeper.sleep(self.phrase_delay).await;
            }
        }

        let mut urls = dedup_in_order(all);
        urls.truncate(self.max_sources);
        outcome.urls = urls;

        progress.report(ProgressEvent::Note {
            stage: Stage::Search,
            message: format!(
                "found {} unique sources ({} from APIs, {} from web)",
                outcome.urls.len(),
                outcome.api_results,
                outcome.web_results
            ),
        });
        if outcome.failed_searches > 0 {
            let rate = outcome.failed_searches as f64 / outcome.total_searches as f64 * 100.0;
            progress.report(ProgressEvent::Note {
                stage: Stage::Search,
                message: format!(
                    "note: {}/{} searches returned no results ({:.0}% failure rate)",
                    outcome.failed_searches, outcome.total_searches, rate
                ),
            });
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::progress::NoProgress;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Canned(Vec<Vec<&'static str>>, Mutex<usize>);

    impl Canned {
        fn new(rounds: Vec<Vec<&'static str>>) -> Self {
            Self(rounds, Mutex::new(0))
        }
    }

    #[async_trait]
    impl SearchProvider for Canned {
        fn name(&self) -> &str {
            "canned"
        }
        async fn search(&self, _phrase: &str) -> Vec<String> {
            let mut i = self.1.lock().unwrap();
            let out = self.0.get(*i).cloned().unwrap_or_default();
            *i += 1;
            out.into_iter().map(str::to_string).collect()
        }
    }

    #[derive(Default)]
    struct RecordingSleeper(Mutex<Vec<Duration>>);

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, d: Duration) {
            self.0.lock().unwrap().push(d);
        }
    }

    fn phrases(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("phrase number {i}")).collect()
    }

    fn http() -> HttpFetcher {
        HttpFetcher::new(&RetrievalConfig::default()).unwrap()
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let f = UrlFilter::new(["youtube.com"]);
        assert!(!f.allows("https://www.YouTube.com/watch?v=1"));
        assert!(f.allows("https://example.org/"));
    }

    #[test]
    fn duckduckgo_links_are_decoded() {
        let html = r#"<div>
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.org%2Fpage%3Fa%3D1&rut=x">One</a>
            <a class="result__a" href="https://direct.example/two">Two</a>
            <a class="other" href="https://ignored.example/">No</a>
            <a class="result__a" href="/relative">Rel</a>
        </div>"#;
        assert_eq!(
            parse_duckduckgo(html, 5),
            vec!["https://example.org/page?a=1".to_string(), "https://direct.example/two".to_string()]
        );
        assert_eq!(parse_duckduckgo(html, 1).len(), 1);
    }

    #[test]
    fn query_cleaning_drops_punctuation() {
        assert_eq!(clean_query("Hello, world! (test)"), "Hello world test");
        assert_eq!(clean_query(&"a".repeat(300)).len(), 100);
    }

    #[tokio::test]
    async fn stage_dedups_truncates_and_filters() {
        let web = Canned::new(vec![
            vec!["https://a.example", "https://youtube.com/x", "https://b.example"],
            vec!["https://b.example", "https://c.example", "https://arxiv.org/abs/1"],
        ]);
        let academic = Canned::new(vec![vec!["https://doi.org/10.1/a"], vec![]]);
        let mut cfg = SearchConfig::default();
        cfg.max_sources = 4;
        let sleeper = Arc::new(RecordingSleeper::default());
        let stage = SearchStage::new(Box::new(web), Some(Box::new(academic)), sleeper.clone(), &cfg);

        let out = stage.run(&phrases(2), &NoProgress).await;
        assert_eq!(
            out.urls,
            vec!["https://doi.org/10.1/a", "https://a.example", "https://b.example", "https://c.example"]
        );
        assert_eq!(out.api_results, 1);
        assert_eq!(out.web_results, 4);
        assert_eq!(*sleeper.0.lock().unwrap(), vec![Duration::from_secs(4)]);
    }

    #[tokio::test]
    async fn api_domains_allowed_in_web_results_without_academic_search() {
        let web = Canned::new(vec![vec!["https://arxiv.org/abs/2101.00001"]]);
        let stage = SearchStage::new(
            Box::new(web),
            None,
            Arc::new(RecordingSleeper::default()),
            &SearchConfig::default(),
        );
        let out = stage.run(&phrases(1), &NoProgress).await;
        assert_eq!(out.urls, vec!["https://arxiv.org/abs/2101.00001"]);
    }

    #[tokio::test]
    async fn failures_are_counted() {
        let stage = SearchStage::new(
            Box::new(NoSearch),
            None,
            Arc::new(RecordingSleeper::default()),
            &SearchConfig::default(),
        );
        let out = stage.run(&phrases(4), &NoProgress).await;
        assert!(out.urls.is_empty());
        assert_eq!(out.failed_searches, 4);
        assert_eq!(out.total_searches, 4);
    }

    #[test]
    fn serpapi_without_key_is_fatal() {
        let mut cfg = SearchConfig::default();
        cfg.serpapi_api_key = Some("  ".into());
        // Only meaningful when the environment does not provide a key.
        if std::env::var("SERPAPI_API_KEY").is_err() {
            let err = web_provider("serpapi", &cfg, &http(), Arc::new(RecordingSleeper::default()))
                .err()
                .unwrap();
            assert!(err.to_string().contains("requires an API key"));
        }
    }

    #[test]
    fn engine_selection() {
        let mut cfg = SearchConfig::default();
        let sleeper: Arc<dyn Sleeper> = Arc::new(RecordingSleeper::default());
        assert_eq!(web_provider("none", &cfg, &http(), sleeper.clone()).unwrap().name(), "none");
        assert_eq!(
            web_provider("duckduckgo", &cfg, &http(), sleeper.clone()).unwrap().name(),
            "duckduckgo"
        );
        cfg.serpapi_api_key = Some("key".into());
        assert_eq!(web_provider("auto", &cfg, &http(), sleeper.clone()).unwrap().name(), "serpapi");
        assert!(web_provider("bing", &cfg, &http(), sleeper).is_err());
    }

    #[tokio::test]
    async fn serpapi_reads_organic_links_and_disables_on_401() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("api_key", "good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic_results": [
                    {"link": "https://one.example"},
                    {"title": "no link"},
                    {"link": "https://two.example"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("api_key", "bad"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/search", server.uri());
        let cfg = SearchConfig::default();
        let good = SerpApiProvider::with_base(http(), "good".into(), &cfg, &base);
        assert_eq!(good.search("query").await, vec!["https://one.example", "https://two.example"]);

        let bad = SerpApiProvider::with_base(http(), "bad".into(), &cfg, &base);
        assert!(bad.search("query").await.is_empty());
        assert!(bad.search("query").await.is_empty());
    }

    #[tokio::test]
    async fn duckduckgo_rate_limit_is_flagged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        let ddg = DuckDuckGoProvider::with_base(
            http(),
            Arc::new(RecordingSleeper::default()),
            &SearchConfig::default(),
            &format!("{}/html/", server.uri()),
        );
        assert!(ddg.search("some phrase").await.is_empty());
        assert!(ddg.was_rate_limited());
    }

    #[tokio::test]
    async fn academic_search_merges_crossref_and_arxiv() {
        let server = MockServer::start().await;
        Mock::given(path("/works"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"items": [{"DOI": "10.1000/x1"}, {"DOI": "10.1000/x2"}]}
            })))
            .mount(&server)
            .await;
        Mock::given(path("/api/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><id>http://arxiv.org/abs/2101.00002v1</id></entry></feed>"#,
            ))
            .mount(&server)
            .await;

        let search = AcademicSearch::with_bases(
            http(),
            &Config::default(),
            &format!("{}/works", server.uri()),
            &format!("{}/api/query", server.uri()),
        );
        assert_eq!(
            search.search("phrase").await,
            vec![
                "https://doi.org/10.1000/x1",
                "https://doi.org/10.1000/x2",
                "http://arxiv.org/abs/2101.00002v1"
            ]
        );
    }
}
