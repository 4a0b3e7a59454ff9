//! Academic API short-circuits for scholarly URLs.
//!
//! Publisher pages for papers are frequently paywalled or script-rendered,
//! but the same paper is usually reachable through an open API. For URLs on
//! a known academic host, [`AcademicApis`] asks each configured
//! [`ApiResolver`] in priority order and returns the first text produced.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde_json::Value;

use crate::config::RetrievalConfig;
use crate::fetch::{Fetcher, HttpFetcher, Strategy};

pub const ACADEMIC_DOMAINS: &[&str] = &[
    "doi.org",
    "arxiv.org",
    "semanticscholar.org",
    "pubmed",
    "ncbi.nlm.nih.gov",
    "biorxiv.org",
    "medrxiv.org",
    "ssrn.com",
    "researchgate.net",
];

const ARXIV_BASE: &str = "http://export.arxiv.org/api/query";
const UNPAYWALL_BASE: &str = "https://api.unpaywall.org/v2";
const SEMANTIC_SCHOLAR_BASE: &str = "https://api.semanticscholar.org/graph/v1/paper";

/// Lowercased host of `url`, if it parses.
pub fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Whether the URL's host contains any academic domain marker.
pub fn is_academic(url: &str) -> bool {
    match host_of(url) {
        Some(host) => ACADEMIC_DOMAINS.iter().any(|d| host.contains(d)),
        None => false,
    }
}

/// One API that can turn a scholarly URL into text.
#[async_trait]
pub trait ApiResolver: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this resolver understands the URL.
    fn applies(&self, url: &str) -> bool;

    /// Text for the URL, or `None` if the API had nothing usable.
    async fn resolve(&self, url: &str) -> Option<String>;
}

/// Ordered resolver list; first success wins.
pub struct AcademicApis {
    resolvers: Vec<Box<dyn ApiResolver>>,
}

impl AcademicApis {
    pub fn new(resolvers: Vec<Box<dyn ApiResolver>>) -> Self {
        Self { resolvers }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Resolvers named in `retrieval.academic_apis`, in that order.
    pub fn from_config(config: &RetrievalConfig, http: &HttpFetcher) -> Result<Self> {
        let mut resolvers: Vec<Box<dyn ApiResolver>> = Vec::new();
        for name in &config.academic_apis {
            let resolver: Box<dyn ApiResolver> = match name.as_str() {
                "arxiv" => Box::new(ArxivApi::new(http.clone(), config)?),
                "unpaywall" => Box::new(UnpaywallApi::new(http.clone(), config)?),
                "semantic_scholar" => Box::new(SemanticScholarApi::new(http.clone(), config)?),
                other => bail!("Unknown academic API: '{}'", other),
            };
            resolvers.push(resolver);
        }
        Ok(Self::new(resolvers))
    }

    pub fn names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Returns the resolver name and text of the first success.
    pub async fn resolve(&self, url: &str) -> Option<(String, String)> {
        for resolver in &self.resolvers {
            if !resolver.applies(url) {
                continue;
            }
            if let Some(text) = resolver.resolve(url).await {
                tracing::info!(url, api = resolver.name(), "fetched via academic API");
                return Some((resolver.name().to_string(), text));
            }
        }
        None
    }
}

fn title_abstract(title: Option<&str>, abstract_text: Option<&str>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(t) = title.map(str::trim).filter(|t| !t.is_empty()) {
        parts.push(format!("Title: {t}"));
    }
    if let Some(a) = abstract_text.map(str::trim).filter(|a| !a.is_empty()) {
        parts.push(format!("Abstract: {a}"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

fn json_str<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(Value::as_str)
}

// ── arXiv ───────────────────────────────────────────────────────────────

pub struct ArxivApi {
    http: HttpFetcher,
    base: String,
    timeout: Duration,
    id_pattern: Regex,
}

impl ArxivApi {
    pub fn new(http: HttpFetcher, config: &RetrievalConfig) -> Result<Self> {
        Self::with_base(http, config, ARXIV_BASE)
    }

    pub fn with_base(http: HttpFetcher, config: &RetrievalConfig, base: &str) -> Result<Self> {
        Ok(Self {
            http,
            base: base.to_string(),
            timeout: Duration::from_secs(config.api_timeout_secs),
            id_pattern: Regex::new(r"arxiv\.org/abs/(\d+\.\d+)")?,
        })
    }

    fn paper_id(&self, url: &str) -> Option<String> {
        self.id_pattern.captures(url).map(|c| c[1].to_string())
    }
}

#[async_trait]
impl ApiResolver for ArxivApi {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn applies(&self, url: &str) -> bool {
        host_of(url).is_some_and(|h| h.contains("arxiv.org"))
    }

    async fn resolve(&self, url: &str) -> Option<String> {
        let id = self.paper_id(url)?;
        let api_url = format!("{}?id_list={}", self.base, id);
        let response = match self.http.api_get(&api_url, self.timeout).await {
            Ok(r) if r.status == 200 => r,
            Ok(r) => {
                tracing::debug!(url, status = r.status, "arXiv API returned non-200");
                return None;
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "arXiv API failed");
                return None;
            }
        };
        let (title, summary) = parse_atom_entry(&response.text());
        title_abstract(title.as_deref(), summary.as_deref())
    }
}

/// Title and summary of the first `<entry>` in an Atom feed.
pub fn parse_atom_entry(xml: &str) -> (Option<String>, Option<String>) {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_entry = false;
    let mut field: Option<&'static str> = None;
    let mut title: Option<String> = None;
    let mut summary: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"entry" => in_entry = true,
                b"title" if in_entry => field = Some("title"),
                b"summary" if in_entry => field = Some("summary"),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Some(f) = field {
                    let text = t.unescape().map(|c| c.into_owned()).unwrap_or_default();
                    let slot = if f == "title" { &mut title } else { &mut summary };
                    if let Some(existing) = slot.as_mut() {
                        existing.push(' ');
                        existing.push_str(&text);
                    } else {
                        *slot = Some(text);
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"entry" => break,
                b"title" | b"summary" => field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!(error = %e, "malformed Atom feed");
                break;
            }
            _ => {}
        }
    }

    let clean = |s: Option<String>| s.map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "));
    (clean(title), clean(summary))
}

/// `<id>` of every `<entry>` in an Atom feed, in order.
pub fn atom_entry_ids(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut ids = Vec::new();
    let mut in_entry = false;
    let mut in_id = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"entry" => in_entry = true,
                b"id" if in_entry => in_id = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_id => {
                if let Ok(id) = t.unescape() {
                    ids.push(id.trim().to_string());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"entry" => in_entry = false,
                b"id" => in_id = false,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    ids
}

// ── Unpaywall ───────────────────────────────────────────────────────────

pub struct UnpaywallApi {
    http: HttpFetcher,
    base: String,
    email: String,
    timeout: Duration,
    pdf_timeout: Duration,
    min_chars: usize,
    doi_pattern: Regex,
}

impl UnpaywallApi {
    pub fn new(http: HttpFetcher, config: &RetrievalConfig) -> Result<Self> {
        Self::with_base(http, config, UNPAYWALL_BASE)
    }

    pub fn with_base(http: HttpFetcher, config: &RetrievalConfig, base: &str) -> Result<Self> {
        Ok(Self {
            http,
            base: base.to_string(),
            email: config.unpaywall_email.clone(),
            timeout: Duration::from_secs(config.api_timeout_secs),
            pdf_timeout: Duration::from_secs(config.pdf_timeout_secs),
            min_chars: config.min_content_chars,
            doi_pattern: Regex::new(r"10\.\d{4,}/[^\s]+")?,
        })
    }

    pub fn doi(&self, url: &str) -> Option<String> {
        self.doi_pattern
            .find(url)
            .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string())
    }

    async fn pdf_text(&self, pdf_url: &str) -> Option<String> {
        let response = self.http.get(pdf_url, Strategy::Desktop, self.pdf_timeout).await.ok()?;
        let is_pdf = response
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/pdf"));
        if response.status != 200 || !is_pdf {
            return None;
        }
        match pdf_extract::extract_text_from_mem(&response.body) {
            Ok(text) if text.chars().count() > self.min_chars => Some(text),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(pdf_url, error = %e, "open-access PDF extraction failed");
                None
            }
        }
    }
}

#[async_trait]
impl ApiResolver for UnpaywallApi {
    fn name(&self) -> &str {
        "unpaywall"
    }

    fn applies(&self, url: &str) -> bool {
        host_of(url).is_some_and(|h| h.contains("doi.org")) || url.to_lowercase().contains("/doi/")
    }

    async fn resolve(&self, url: &str) -> Option<String> {
        let doi = self.doi(url)?;
        let api_url = format!("{}/{}?email={}", self.base, doi, self.email);
        let response = match self.http.api_get(&api_url, self.timeout).await {
            Ok(r) if r.status == 200 => r,
            _ => return None,
        };
        let data: Value = serde_json::from_slice(&response.body).ok()?;

        let is_oa = data.get("is_oa").and_then(Value::as_bool).unwrap_or(false);
        if let (true, Some(location)) = (is_oa, data.get("best_oa_location")) {
            if let Some(pdf_url) = json_str(location, "url_for_pdf") {
                if let Some(text) = self.pdf_text(pdf_url).await {
                    return Some(text);
                }
            }
            if let Some(landing) = json_str(location, "url_for_landing_page") {
                if let Ok(text) = self.http.fetch(landing, Strategy::Desktop, self.timeout).await {
                    return Some(text);
                }
            }
        }

        title_abstract(json_str(&data, "title"), json_str(&data, "abstract"))
    }
}

// ── Semantic Scholar ────────────────────────────────────────────────────

pub struct SemanticScholarApi {
    http: HttpFetcher,
    base: String,
    timeout: Duration,
    id_pattern: Regex,
}

impl SemanticScholarApi {
    pub fn new(http: HttpFetcher, config: &RetrievalConfig) -> Result<Self> {
        Self::with_base(http, config, SEMANTIC_SCHOLAR_BASE)
    }

    pub fn with_base(http: HttpFetcher, config: &RetrievalConfig, base: &str) -> Result<Self> {
        Ok(Self {
            http,
            base: base.to_string(),
            timeout: Duration::from_secs(config.api_timeout_secs),
            id_pattern: Regex::new(r"semanticscholar\.org/paper/(?:[^/?#]+/)?([0-9a-f]+)(?:[/?#]|$)")?,
        })
    }

    pub fn paper_id(&self, url: &str) -> Option<String> {
        self.id_pattern.captures(url).map(|c| c[1].to_string())
    }
}

#[async_trait]
impl ApiResolver for SemanticScholarApi {
    fn name(&self) -> &str {
        "semantic_scholar"
    }

    fn applies(&self, url: &str) -> bool {
        host_of(url).is_some_and(|h| h.contains("semanticscholar.org"))
    }

    async fn resolve(&self, url: &str) -> Option<String> {
        let id = self.paper_id(url)?;
        let api_url = format!("{}/{}?fields=title,abstract", self.base, id);
        let response = match self.http.api_get(&api_url, self.timeout).await {
            Ok(r) if r.status == 200 => r,
            _ => return None,
        };
        let data: Value = serde_json::from_slice(&response.body).ok()?;
        title_abstract(json_str(&data, "title"), json_str(&data, "abstract"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query: id_list=2101.00001</title>
  <entry>
    <id>http://arxiv.org/abs/2101.00001v1</id>
    <title>Sparse Retrieval
      for Long Documents</title>
    <summary>  We study retrieval &amp; ranking over long documents.  </summary>
  </entry>
</feed>"#;

    fn http() -> HttpFetcher {
        HttpFetcher::new(&RetrievalConfig::default()).unwrap()
    }

    #[test]
    fn academic_hosts() {
        assert!(is_academic("https://doi.org/10.1000/xyz"));
        assert!(is_academic("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC1"));
        assert!(is_academic("https://pubmed.ncbi.nlm.nih.gov/123/"));
        assert!(!is_academic("https://example.com/arxiv.org/abs/1"));
        assert!(!is_academic("not a url"));
    }

    #[test]
    fn atom_entry_title_and_summary() {
        let (title, summary) = parse_atom_entry(ATOM);
        assert_eq!(title.as_deref(), Some("Sparse Retrieval for Long Documents"));
        assert_eq!(summary.as_deref(), Some("We study retrieval & ranking over long documents."));
    }

    #[test]
    fn atom_ids_from_entries() {
        assert_eq!(atom_entry_ids(ATOM), vec!["http://arxiv.org/abs/2101.00001v1".to_string()]);
    }

    #[test]
    fn title_abstract_formatting() {
        assert_eq!(
            title_abstract(Some("T"), Some("A")).as_deref(),
            Some("Title: T\n\nAbstract: A")
        );
        assert_eq!(title_abstract(Some(" "), None), None);
        assert_eq!(title_abstract(None, Some("A")).as_deref(), Some("Abstract: A"));
    }

    #[test]
    fn ids_from_urls() {
        let cfg = RetrievalConfig::default();
        let unpaywall = UnpaywallApi::new(http(), &cfg).unwrap();
        assert_eq!(
            unpaywall.doi("https://doi.org/10.1145/3368089.3409741.").as_deref(),
            Some("10.1145/3368089.3409741")
        );
        assert!(unpaywall.applies("https://dl.acm.org/doi/10.1145/1"));

        let s2 = SemanticScholarApi::new(http(), &cfg).unwrap();
        assert_eq!(
            s2.paper_id("https://www.semanticscholar.org/paper/Some-Title-Here/0123abcd").as_deref(),
            Some("0123abcd")
        );
        assert_eq!(
            s2.paper_id("https://www.semanticscholar.org/paper/0123abcd").as_deref(),
            Some("0123abcd")
        );
    }

    #[tokio::test]
    async fn arxiv_resolves_via_export_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("id_list", "2101.00001"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ATOM))
            .mount(&server)
            .await;

        let api = ArxivApi::with_base(
            http(),
            &RetrievalConfig::default(),
            &format!("{}/api/query", server.uri()),
        )
        .unwrap();
        let text = api.resolve("https://arxiv.org/abs/2101.00001").await.unwrap();
        assert!(text.starts_with("Title: Sparse Retrieval for Long Documents\n\nAbstract: "));
    }

    #[tokio::test]
    async fn unpaywall_falls_back_to_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/10.1000/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "is_oa": false,
                "title": "Closed Paper",
                "best_oa_location": null
            })))
            .mount(&server)
            .await;

        let api = UnpaywallApi::with_base(
            http(),
            &RetrievalConfig::default(),
            &format!("{}/v2", server.uri()),
        )
        .unwrap();
        let text = api.resolve("https://doi.org/10.1000/abc123").await;
        assert_eq!(text.as_deref(), Some("Title: Closed Paper"));
    }

    #[tokio::test]
    async fn unpaywall_uses_open_access_landing_page() {
        let server = MockServer::start().await;
        Mock::given(path("/landing"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>Full open access text.</p>"))
            .mount(&server)
            .await;
        Mock::given(path("/v2/10.1000/oa1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "is_oa": true,
                "title": "Open Paper",
                "best_oa_location": {
                    "url_for_pdf": null,
                    "url_for_landing_page": format!("{}/landing", server.uri())
                }
            })))
            .mount(&server)
            .await;

        let api = UnpaywallApi::with_base(
            http(),
            &RetrievalConfig::default(),
            &format!("{}/v2", server.uri()),
        )
        .unwrap();
        let text = api.resolve("https://doi.org/10.1000/oa1").await;
        assert_eq!(text.as_deref(), Some("Full open access text."));
    }

    struct Fixed(&'static str, Option<&'static str>);

    #[async_trait]
    impl ApiResolver for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        fn applies(&self, _url: &str) -> bool {
            true
        }
        async fn resolve(&self, _url: &str) -> Option<String> {
            self.1.map(str::to_string)
        }
    }

    #[tokio::test]
    async fn first_success_in_priority_order_wins() {
        let apis = AcademicApis::new(vec![
            Box::new(Fixed("first", None)),
            Box::new(Fixed("second", Some("from second"))),
            Box::new(Fixed("third", Some("from third"))),
        ]);
        let (name, text) = apis.resolve("https://doi.org/10.1/x").await.unwrap();
        assert_eq!(name, "second");
        assert_eq!(text, "from second");
    }

    #[test]
    fn config_order_is_kept() {
        let mut cfg = RetrievalConfig::default();
        cfg.academic_apis = vec!["semantic_scholar".into(), "arxiv".into()];
        let apis = AcademicApis::from_config(&cfg, &http()).unwrap();
        assert_eq!(apis.names(), vec!["semantic_scholar", "arxiv"]);
    }
}
