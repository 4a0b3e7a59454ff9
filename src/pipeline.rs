//! The check pipeline: EXTRACT → SELECT_PHRASES → SEARCH → RETRIEVE →
//! ANALYZE → REPORT.
//!
//! Stages run once each, in order. A stage that leaves nothing to work with
//! ends the run with a [`Termination`] instead of an error; only setup and
//! I/O problems on the input document or report file are errors.
//!
//! Cache-only runs skip SEARCH and read the URL list persisted by the last
//! full run (the [`SearchManifest`]), then look each URL up in the cache.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use plagcheck_core::models::{DownloadFailure, MatchResult, Source};
use plagcheck_core::report::{render_report, ReportInput};
use plagcheck_core::similarity::SimilarityEngine;

use crate::academic::AcademicApis;
use crate::cache::CacheStore;
use crate::config::Config;
use crate::extract::{FileExtractor, PageWindow};
use crate::fetch::{HttpFetcher, RetryPolicy, Sleeper, TokioSleeper};
use crate::local_refs::load_local_references;
use crate::phrases::TfidfPhraseSelector;
use crate::progress::{ProgressEvent, ProgressReporter, Stage};
use crate::retrieve::{Retriever, NOT_IN_CACHE};
use crate::search::{web_provider, AcademicSearch, SearchStage};
use crate::traits::{PhraseSelector, SearchProvider, TextExtractor};

/// URLs found by the last search of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchManifest {
    pub document: String,
    pub generated_at: chrono::NaiveDateTime,
    pub urls: Vec<String>,
}

impl SearchManifest {
    pub fn path_for(output_dir: &Path, document: &Path) -> PathBuf {
        output_dir.join(format!("{}_sources.json", file_stem(document)))
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read search manifest: {}", path.display()))?;
        let manifest = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse search manifest: {}", path.display()))?;
        Ok(Some(manifest))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write search manifest: {}", path.display()))
    }
}

/// Why a run stopped before producing a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    DocumentTooShort { chars: usize, min_chars: usize },
    NoSourcesFound,
    NoSourcesAccessible { failed: usize },
    NoCachedSources,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::DocumentTooShort { chars, min_chars } => write!(
                f,
                "Document is too short for meaningful analysis ({} characters, need at least {})",
                chars, min_chars
            ),
            Termination::NoSourcesFound => write!(
                f,
                "No sources were found for the extracted phrases. Try --use-apis, --use-local, \
                 a SerpApi key, or a different section with --pages and --position."
            ),
            Termination::NoSourcesAccessible { failed } => {
                write!(f, "Could not access any sources; cannot perform comparison.")?;
                if *failed > 0 {
                    write!(f, " All {} online sources failed to download.", failed)?;
                }
                Ok(())
            }
            Termination::NoCachedSources => write!(
                f,
                "No cached sources found. Run without --cache-only to download sources first."
            ),
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub report: String,
    pub report_path: PathBuf,
    pub results: Vec<MatchResult>,
    pub failures: Vec<DownloadFailure>,
    pub local_sources: usize,
    pub online_sources: usize,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunSummary),
    Terminated(Termination),
}

/// Per-run switches and locations.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub document: PathBuf,
    pub cache_only: bool,
    /// Directory of local reference files; `None` disables them.
    pub local_references: Option<PathBuf>,
    /// Where the report and search manifest are written.
    pub output_dir: PathBuf,
    pub min_document_chars: usize,
    pub min_source_chars: usize,
}

impl RunOptions {
    /// Options for `document`, resolving relative directories against the
    /// document's parent.
    pub fn from_config(config: &Config, document: &Path, cache_only: bool) -> Self {
        let parent = document
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            document: document.to_path_buf(),
            cache_only,
            local_references: config
                .search
                .use_local
                .then(|| parent.join(&config.document.local_references_dir)),
            output_dir: config.report.output_dir.clone().unwrap_or(parent),
            min_document_chars: config.document.min_chars,
            min_source_chars: config.retrieval.min_content_chars,
        }
    }
}

pub struct Pipeline {
    extractor: Box<dyn TextExtractor>,
    reference_extractor: Box<dyn TextExtractor>,
    selector: Box<dyn PhraseSelector>,
    search: SearchStage,
    retriever: Retriever,
    engine: SimilarityEngine,
}

impl Pipeline {
    pub fn new(
        extractor: Box<dyn TextExtractor>,
        selector: Box<dyn PhraseSelector>,
        search: SearchStage,
        retriever: Retriever,
        engine: SimilarityEngine,
    ) -> Self {
        Self {
            extractor,
            reference_extractor: Box::new(FileExtractor::new()),
            selector,
            search,
            retriever,
            engine,
        }
    }

    /// Default collaborators wired from configuration.
    ///
    /// Builds the one HTTP pool shared by search, academic APIs and
    /// retrieval. Fails on an unknown search engine or a missing SerpApi key
    /// when `serpapi` is requested.
    pub fn from_config(config: &Config, window: Option<PageWindow>) -> Result<Self> {
        let http = HttpFetcher::new(&config.retrieval)?;
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);

        let web = web_provider(&config.search.engine, &config.search, &http, sleeper.clone())?;
        let academic: Option<Box<dyn SearchProvider>> = if config.search.use_apis {
            Some(Box::new(AcademicSearch::new(http.clone(), config)))
        } else {
            None
        };
        let search = SearchStage::new(web, academic, sleeper.clone(), &config.search);

        let cache = CacheStore::open(&config.cache.dir)?;
        let apis = AcademicApis::from_config(&config.retrieval, &http)?;
        let retriever = Retriever::new(
            cache,
            Arc::new(http),
            sleeper,
            apis,
            RetryPolicy::from_config(&config.retrieval)?,
        )
        .min_content_chars(config.retrieval.min_content_chars)
        .url_delay(Duration::from_secs(config.retrieval.url_delay_secs));

        Ok(Self::new(
            Box::new(FileExtractor::with_window(window)),
            Box::new(TfidfPhraseSelector::new(&config.phrases)),
            search,
            retriever,
            SimilarityEngine::new(config.similarity.to_engine_config()),
        ))
    }

    pub async fn run(&self, options: &RunOptions, progress: &dyn ProgressReporter) -> Result<RunOutcome> {
        let document = &options.document;

        // EXTRACT
        progress.report(ProgressEvent::Started { stage: Stage::Extract });
        let text = self
            .extractor
            .extract(document)
            .with_context(|| format!("Failed to extract text from {}", document.display()))?;
        let chars = text.chars().count();
        tracing::info!(document = %document.display(), chars, "extracted document text");
        if chars < options.min_document_chars {
            return Ok(RunOutcome::Terminated(Termination::DocumentTooShort {
                chars,
                min_chars: options.min_document_chars,
            }));
        }

        // SELECT_PHRASES
        progress.report(ProgressEvent::Started { stage: Stage::SelectPhrases });
        let phrases = self.selector.select(&text);
        progress.report(ProgressEvent::Note {
            stage: Stage::SelectPhrases,
            message: format!("selected {} key phrases", phrases.len()),
        });

        let local = match &options.local_references {
            Some(dir) => load_local_references(dir, self.reference_extractor.as_ref(), options.min_source_chars)?,
            None => Vec::new(),
        };

        // SEARCH
        progress.report(ProgressEvent::Started { stage: Stage::Search });
        let manifest_path = SearchManifest::path_for(&options.output_dir, document);
        let urls = if options.cache_only {
            progress.report(ProgressEvent::Note {
                stage: Stage::Search,
                message: "skipped (cache-only mode)".to_string(),
            });
            match SearchManifest::load(&manifest_path) {
                Ok(Some(manifest)) => manifest.urls,
                Ok(None) => Vec::new(),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unreadable search manifest");
                    Vec::new()
                }
            }
        } else {
            let outcome = self.search.run(&phrases, progress).await;
            if outcome.urls.is_empty() && local.is_empty() {
                return Ok(RunOutcome::Terminated(Termination::NoSourcesFound));
            }
            if !outcome.urls.is_empty() {
                std::fs::create_dir_all(&options.output_dir).with_context(|| {
                    format!("Failed to create output directory: {}", options.output_dir.display())
                })?;
                let manifest = SearchManifest {
                    document: document.display().to_string(),
                    generated_at: chrono::Local::now().naive_local(),
                    urls: outcome.urls.clone(),
                };
                if let Err(e) = manifest.save(&manifest_path) {
                    tracing::warn!(error = %e, "failed to persist search manifest");
                }
            }
            outcome.urls
        };

        // RETRIEVE
        progress.report(ProgressEvent::Started { stage: Stage::Retrieve });
        let (online, failures) = if options.cache_only {
            let batch = self.retriever.cached_sources(&urls);
            progress.report(ProgressEvent::Note {
                stage: Stage::Retrieve,
                message: format!(
                    "{} cached, {} not in cache",
                    batch.sources.len(),
                    batch.missing.len()
                ),
            });
            if !batch.missing.is_empty() {
                tracing::warn!(
                    count = batch.missing.len(),
                    urls = ?batch.missing,
                    "sources not in cache are left out of this run"
                );
            }
            let missing = batch
                .missing
                .into_iter()
                .map(|url| DownloadFailure::new(url, NOT_IN_CACHE))
                .collect();
            (batch.sources, missing)
        } else {
            let batch = self.retriever.retrieve_all(&urls, progress).await;
            (batch.sources, batch.failures)
        };

        let local_count = local.len();
        let online_count = online.len();
        let mut sources: Vec<Source> = local;
        sources.extend(online);
        if sources.is_empty() {
            let termination = if options.cache_only {
                Termination::NoCachedSources
            } else {
                Termination::NoSourcesAccessible { failed: failures.len() }
            };
            return Ok(RunOutcome::Terminated(termination));
        }
        progress.report(ProgressEvent::Note {
            stage: Stage::Retrieve,
            message: format!(
                "total sources to analyze: {} ({} local, {} online)",
                sources.len(),
                local_count,
                online_count
            ),
        });

        // ANALYZE
        progress.report(ProgressEvent::Started { stage: Stage::Analyze });
        let total = sources.len() as u64;
        let results = self.engine.analyze_with(&text, &sources, |i, source| {
            progress.report(ProgressEvent::Item {
                stage: Stage::Analyze,
                n: i as u64 + 1,
                total,
                label: source.title.clone(),
            });
        });

        // REPORT
        progress.report(ProgressEvent::Started { stage: Stage::Report });
        let document_name = document
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| document.display().to_string());
        let report = render_report(&ReportInput {
            document_name: &document_name,
            generated_at: chrono::Local::now().naive_local(),
            document_chars: chars,
            results: &results,
            failures: &failures,
            attempts_per_url: self.retriever.policy().attempts().len(),
        });

        std::fs::create_dir_all(&options.output_dir).with_context(|| {
            format!("Failed to create output directory: {}", options.output_dir.display())
        })?;
        let report_path = options
            .output_dir
            .join(format!("{}_plagiarism_report.txt", file_stem(document)));
        std::fs::write(&report_path, &report)
            .with_context(|| format!("Failed to write report: {}", report_path.display()))?;
        progress.report(ProgressEvent::Note {
            stage: Stage::Report,
            message: format!("report saved to {}", report_path.display()),
        });

        Ok(RunOutcome::Completed(RunSummary {
            report,
            report_path,
            results,
            failures,
            local_sources: local_count,
            online_sources: online_count,
        }))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_roundtrips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = SearchManifest::path_for(dir.path(), Path::new("/docs/thesis.docx"));
        assert!(path.ends_with("thesis_sources.json"));
        assert_eq!(SearchManifest::load(&path).unwrap(), None);

        let manifest = SearchManifest {
            document: "thesis.docx".into(),
            generated_at: chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            urls: vec!["https://a.example".into(), "https://b.example".into()],
        };
        manifest.save(&path).unwrap();
        assert_eq!(SearchManifest::load(&path).unwrap(), Some(manifest));
    }

    #[test]
    fn options_resolve_against_document_dir() {
        let mut config = Config::default();
        config.search.use_local = true;
        let opts = RunOptions::from_config(&config, Path::new("/work/paper.txt"), false);
        assert_eq!(opts.output_dir, PathBuf::from("/work"));
        assert_eq!(opts.local_references, Some(PathBuf::from("/work/local_references")));

        config.search.use_local = false;
        config.report.output_dir = Some(PathBuf::from("/reports"));
        let opts = RunOptions::from_config(&config, Path::new("paper.txt"), true);
        assert_eq!(opts.output_dir, PathBuf::from("/reports"));
        assert_eq!(opts.local_references, None);
    }

    #[test]
    fn termination_messages() {
        let msg = Termination::NoSourcesAccessible { failed: 3 }.to_string();
        assert!(msg.contains("All 3 online sources failed"));
        assert!(!Termination::NoSourcesAccessible { failed: 0 }
            .to_string()
            .contains("All"));
        assert!(Termination::NoCachedSources.to_string().contains("--cache-only"));
    }
}
