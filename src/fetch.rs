//! HTTP fetching strategies and the retry policy that drives them.
//!
//! A [`Strategy`] is a fixed request identity (header profile, and for
//! [`Strategy::Session`] a cookie-keeping client). A [`RetryPolicy`] is an
//! ordered list of [`Attempt`]s, each pairing a strategy with a timeout and
//! the wait that follows it when it fails. The policy runs attempts in
//! order through an injected [`Fetcher`] and [`Sleeper`] and returns the
//! first text produced, or the last error.
//!
//! [`HttpFetcher`] owns the process-wide `reqwest` clients. It is cheap to
//! clone and every network component holds a clone of the same handle.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER, USER_AGENT};

use crate::config::RetrievalConfig;
use crate::html::html_to_text;

const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const MOBILE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";
const SESSION_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const API_UA: &str = concat!("plagcheck/", env!("CARGO_PKG_VERSION"));

/// Identity used for one download attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Desktop browser headers.
    Desktop,
    /// Mobile browser headers.
    Mobile,
    /// Cookie-keeping client with a search-engine referrer.
    Session,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Desktop, Strategy::Mobile, Strategy::Session];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Desktop => "desktop",
            Strategy::Mobile => "mobile",
            Strategy::Session => "session",
        }
    }

    pub fn headers(self) -> HeaderMap {
        let mut h = HeaderMap::new();
        match self {
            Strategy::Desktop => {
                h.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_UA));
                h.insert(
                    ACCEPT,
                    HeaderValue::from_static(
                        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
                    ),
                );
                h.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
            }
            Strategy::Mobile => {
                h.insert(USER_AGENT, HeaderValue::from_static(MOBILE_UA));
                h.insert(
                    ACCEPT,
                    HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
                );
            }
            Strategy::Session => {
                h.insert(USER_AGENT, HeaderValue::from_static(SESSION_UA));
                h.insert(
                    ACCEPT,
                    HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
                );
                h.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
            }
        }
        h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        h.insert("DNT", HeaderValue::from_static("1"));
        h
    }
}

/// Why one attempt produced no text. The `Display` form is what ends up in
/// the report's failure reasons.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Timeout after {0}s")]
    Timeout(u64),
    #[error("Connection failed")]
    Connection,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("Content unreadable or empty")]
    Unreadable,
    #[error("{0}")]
    Request(String),
}

impl FetchError {
    fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(timeout.as_secs())
        } else if e.is_connect() {
            FetchError::Connection
        } else {
            FetchError::Request(e.without_url().to_string())
        }
    }
}

/// One strategy attempt for one URL, returning extracted text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, strategy: Strategy, timeout: Duration) -> Result<String, FetchError>;
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A response body with the bits callers inspect.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    session: reqwest::Client,
    min_ascii_ratio: f64,
}

impl HttpFetcher {
    pub fn new(config: &RetrievalConfig) -> Result<Self> {
        let redirects = reqwest::redirect::Policy::limited(config.max_redirects);
        let client = reqwest::Client::builder()
            .redirect(redirects)
            .build()?;
        let session = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .cookie_store(true)
            .build()?;
        Ok(Self {
            client,
            session,
            min_ascii_ratio: config.min_ascii_ratio,
        })
    }

    /// GET with the given strategy's identity; any status is returned.
    pub async fn get(&self, url: &str, strategy: Strategy, timeout: Duration) -> Result<RawResponse, FetchError> {
        let client = match strategy {
            Strategy::Session => &self.session,
            _ => &self.client,
        };
        execute(client.get(url).headers(strategy.headers()), timeout).await
    }

    /// GET for JSON and XML APIs, identified as this tool rather than a browser.
    pub async fn api_get(&self, url: &str, timeout: Duration) -> Result<RawResponse, FetchError> {
        let request = self
            .client
            .get(url)
            .header(USER_AGENT, API_UA)
            .header(ACCEPT, "application/json, application/atom+xml;q=0.9, */*;q=0.5");
        execute(request, timeout).await
    }
}

async fn execute(request: reqwest::RequestBuilder, timeout: Duration) -> Result<RawResponse, FetchError> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(e, timeout))?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response
        .bytes()
        .await
        .map_err(|e| FetchError::from_reqwest(e, timeout))?
        .to_vec();

    Ok(RawResponse {
        status,
        content_type,
        body,
    })
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, strategy: Strategy, timeout: Duration) -> Result<String, FetchError> {
        let response = self.get(url, strategy, timeout).await?;
        if response.status != 200 {
            return Err(FetchError::Status(response.status));
        }
        html_to_text(&response.text(), self.min_ascii_ratio).ok_or(FetchError::Unreadable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: Strategy,
    pub timeout: Duration,
    /// Wait after this attempt fails, when another attempt follows.
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: Vec<Attempt>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let secs = Duration::from_secs;
        Self {
            attempts: vec![
                Attempt { strategy: Strategy::Desktop, timeout: secs(15), delay: secs(2) },
                Attempt { strategy: Strategy::Mobile, timeout: secs(25), delay: secs(5) },
                Attempt { strategy: Strategy::Session, timeout: secs(35), delay: secs(10) },
            ],
        }
    }
}

impl RetryPolicy {
    /// Timeouts and delays must both be strictly increasing.
    pub fn new(attempts: Vec<Attempt>) -> Result<Self> {
        if attempts.is_empty() {
            bail!("retry policy needs at least one attempt");
        }
        if !attempts.windows(2).all(|w| w[0].timeout < w[1].timeout) {
            bail!("retry timeouts must be strictly increasing");
        }
        if !attempts.windows(2).all(|w| w[0].delay < w[1].delay) {
            bail!("retry delays must be strictly increasing");
        }
        Ok(Self { attempts })
    }

    /// Strategies are assigned in order: desktop, mobile, session.
    pub fn from_config(config: &RetrievalConfig) -> Result<Self> {
        if config.timeouts_secs.len() > Strategy::ALL.len() {
            bail!("at most {} retry attempts are supported", Strategy::ALL.len());
        }
        if config.delays_secs.len() != config.timeouts_secs.len() {
            bail!("retry delays and timeouts must have the same length");
        }
        let attempts = Strategy::ALL
            .iter()
            .zip(config.timeouts_secs.iter().zip(config.delays_secs.iter()))
            .map(|(&strategy, (&t, &d))| Attempt {
                strategy,
                timeout: Duration::from_secs(t),
                delay: Duration::from_secs(d),
            })
            .collect();
        Self::new(attempts)
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// Run attempts in order; the first text wins.
    pub async fn run(&self, url: &str, fetcher: &dyn Fetcher, sleeper: &dyn Sleeper) -> Result<String, FetchError> {
        let total = self.attempts.len();
        let mut last_error = FetchError::Request("Unknown error".to_string());

        for (i, attempt) in self.attempts.iter().enumerate() {
            match fetcher.fetch(url, attempt.strategy, attempt.timeout).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::info!(
                        url,
                        strategy = attempt.strategy.name(),
                        "attempt {}/{} failed: {}",
                        i + 1,
                        total,
                        e
                    );
                    last_error = e;
                }
            }
            if i + 1 < total {
                sleeper.sleep(attempt.delay).await;
            }
        }
        Err(last_error)
    }
}
