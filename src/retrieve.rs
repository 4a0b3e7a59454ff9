//! Retrieval engine: URL to source text, cache first.
//!
//! For each URL, in order:
//!
//! 1. Cache hit: return it, no network.
//! 2. Academic host: try the [`AcademicApis`] in priority order.
//! 3. Run the [`RetryPolicy`] through the [`Fetcher`].
//!
//! Text from steps 2 and 3 is cached before it is returned. A URL whose
//! text is not longer than the minimum length, or that produced no text at
//! all, becomes a [`DownloadFailure`]. Consecutive URLs are separated by a
//! fixed delay.

use std::sync::Arc;
use std::time::Duration;

use plagcheck_core::models::{DownloadFailure, Source};

use crate::academic::{is_academic, AcademicApis};
use crate::cache::{key_for, CacheStore};
use crate::fetch::{Fetcher, RetryPolicy, Sleeper};
use crate::progress::{ProgressEvent, ProgressReporter, Stage};

pub const TOO_SHORT: &str = "Content too short or corrupted (< 200 readable characters)";
pub const NOT_IN_CACHE: &str = "Not in cache (cache-only mode)";

/// Usable sources and failures from one retrieval pass, both in URL order.
#[derive(Debug, Default)]
pub struct RetrievalBatch {
    pub sources: Vec<Source>,
    pub failures: Vec<DownloadFailure>,
}

/// Sources found in the cache and URLs that were not.
#[derive(Debug, Default)]
pub struct CachedBatch {
    pub sources: Vec<Source>,
    pub missing: Vec<String>,
}

pub struct Retriever {
    cache: CacheStore,
    fetcher: Arc<dyn Fetcher>,
    sleeper: Arc<dyn Sleeper>,
    apis: AcademicApis,
    policy: RetryPolicy,
    min_chars: usize,
    url_delay: Duration,
}

impl Retriever {
    pub fn new(
        cache: CacheStore,
        fetcher: Arc<dyn Fetcher>,
        sleeper: Arc<dyn Sleeper>,
        apis: AcademicApis,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            cache,
            fetcher,
            sleeper,
            apis,
            policy,
            min_chars: 200,
            url_delay: Duration::from_secs(1),
        }
    }

    pub fn min_content_chars(mut self, chars: usize) -> Self {
        self.min_chars = chars;
        self
    }

    pub fn url_delay(mut self, delay: Duration) -> Self {
        self.url_delay = delay;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn too_short_reason(&self) -> String {
        if self.min_chars == 200 {
            TOO_SHORT.to_string()
        } else {
            format!(
                "Content too short or corrupted (< {} readable characters)",
                self.min_chars
            )
        }
    }

    fn long_enough(&self, text: &str) -> bool {
        text.chars().count() > self.min_chars
    }

    /// Text for one URL, or the reason it could not be obtained.
    pub async fn retrieve(&self, url: &str) -> Result<String, String> {
        let key = key_for(url);
        if let Some(text) = self.cache.get(&key) {
            tracing::debug!(url, "cache hit");
            return Ok(text);
        }

        if is_academic(url) {
            if let Some((_, text)) = self.apis.resolve(url).await {
                self.store(&key, url, &text);
                return Ok(text);
            }
        }

        match self.policy.run(url, self.fetcher.as_ref(), self.sleeper.as_ref()).await {
            Ok(text) => {
                self.store(&key, url, &text);
                Ok(text)
            }
            Err(e) => Err(e.to_string()),
        }
    }

    fn store(&self, key: &str, url: &str, text: &str) {
        if let Err(e) = self.cache.put(key, text) {
            tracing::warn!(url, error = %e, "failed to cache downloaded content");
        }
    }

    /// Retrieve every URL in order.
    pub async fn retrieve_all(&self, urls: &[String], progress: &dyn ProgressReporter) -> RetrievalBatch {
        let mut batch = RetrievalBatch::default();
        let total = urls.len() as u64;

        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                self.sleeper.sleep(self.url_delay).await;
            }
            progress.report(ProgressEvent::Item {
                stage: Stage::Retrieve,
                n: i as u64 + 1,
                total,
                label: url.clone(),
            });

            match self.retrieve(url).await {
                Ok(text) if self.long_enough(&text) => batch.sources.push(Source::online(url.clone(), text)),
                Ok(_) => {
                    tracing::info!(url, "skipped: content too short or binary");
                    batch.failures.push(DownloadFailure::new(url.clone(), self.too_short_reason()));
                }
                Err(reason) => {
                    tracing::info!(url, reason = %reason, "download failed");
                    batch.failures.push(DownloadFailure::new(url.clone(), reason));
                }
            }
        }

        progress.report(ProgressEvent::Note {
            stage: Stage::Retrieve,
            message: format!(
                "{} downloaded, {} failed",
                batch.sources.len(),
                batch.failures.len()
            ),
        });
        batch
    }

    /// Cache-only lookup: no network and no delays.
    pub fn cached_sources(&self, urls: &[String]) -> CachedBatch {
        let mut batch = CachedBatch::default();
        for url in urls {
            match self.cache.get_url(url) {
                Some(text) if self.long_enough(&text) => batch.sources.push(Source::online(url.clone(), text)),
                _ => batch.missing.push(url.clone()),
            }
        }
        batch
    }
}
