//! End-to-end pipeline runs with in-memory search, fetch and sleep.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use plagcheck::academic::AcademicApis;
use plagcheck::cache::CacheStore;
use plagcheck::config::{PhraseConfig, SearchConfig};
use plagcheck::extract::FileExtractor;
use plagcheck::fetch::{FetchError, Fetcher, RetryPolicy, Sleeper, Strategy};
use plagcheck::phrases::TfidfPhraseSelector;
use plagcheck::pipeline::{Pipeline, RunOptions, RunOutcome, Termination};
use plagcheck::progress::NoProgress;
use plagcheck::retrieve::{Retriever, NOT_IN_CACHE};
use plagcheck::search::SearchStage;
use plagcheck::traits::SearchProvider;
use plagcheck_core::models::DownloadFailure;
use plagcheck_core::similarity::SimilarityEngine;

const DOCUMENT: &str = "Photosynthesis converts sunlight, water and carbon dioxide into glucose and oxygen inside chloroplasts. \
Chlorophyll pigments absorb red and blue wavelengths while reflecting green light back to our eyes. \
The Calvin cycle fixes atmospheric carbon into three-carbon sugars using ATP and NADPH. \
Stomata regulate gas exchange and transpiration through tiny pores on leaf surfaces.";

const COPIED: &str = "Botany lecture notes for the fourth week of the semester. \
Photosynthesis converts sunlight, water and carbon dioxide into glucose and oxygen inside chloroplasts. \
The Calvin cycle fixes atmospheric carbon into three-carbon sugars using ATP and NADPH. \
Students should memorize both stages before the midterm examination next month.";

const UNRELATED: &str = "Medieval castles featured thick stone walls, moats, drawbridges and narrow arrow slits. \
Knights trained daily with swords, lances and shields within fortified courtyards. \
Feudal lords collected taxes from peasants who farmed surrounding villages. \
Siege engines such as trebuchets hurled boulders at battlements during prolonged wars.";

const COPIED_URL: &str = "https://notes.example/botany";
const UNRELATED_URL: &str = "https://history.example/castles";
const SLOW_URL: &str = "https://slow.example/paper";

struct FixedResults(Vec<String>);

#[async_trait]
impl SearchProvider for FixedResults {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn search(&self, _phrase: &str) -> Vec<String> {
        self.0.clone()
    }
}

/// Serves known pages; every other URL times out on every strategy.
#[derive(Default)]
struct FakeWeb {
    pages: HashMap<String, String>,
    calls: Mutex<Vec<(String, Strategy)>>,
}

impl FakeWeb {
    fn with_pages(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages.iter().map(|(u, t)| (u.to_string(), t.to_string())).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls_for(&self, url: &str) -> Vec<Strategy> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, s)| *s)
            .collect()
    }
}

#[async_trait]
impl Fetcher for FakeWeb {
    async fn fetch(&self, url: &str, strategy: Strategy, timeout: Duration) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push((url.to_string(), strategy));
        self.pages
            .get(url)
            .cloned()
            .ok_or(FetchError::Timeout(timeout.as_secs()))
    }
}

#[derive(Default)]
struct InstantSleeper(Mutex<Vec<Duration>>);

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.0.lock().unwrap().push(duration);
    }
}

struct Harness {
    tmp: TempDir,
    document: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let document = tmp.path().join("essay.txt");
        std::fs::write(&document, DOCUMENT).unwrap();
        Self { tmp, document }
    }

    fn cache_dir(&self) -> PathBuf {
        self.tmp.path().join("cache")
    }

    fn options(&self, cache_only: bool) -> RunOptions {
        RunOptions {
            document: self.document.clone(),
            cache_only,
            local_references: None,
            output_dir: self.tmp.path().to_path_buf(),
            min_document_chars: 100,
            min_source_chars: 200,
        }
    }

    fn pipeline(&self, urls: &[&str], web: Arc<FakeWeb>, sleeper: Arc<InstantSleeper>) -> Pipeline {
        let search = SearchStage::new(
            Box::new(FixedResults(urls.iter().map(|u| u.to_string()).collect())),
            None,
            sleeper.clone(),
            &SearchConfig::default(),
        );
        let retriever = Retriever::new(
            CacheStore::open(self.cache_dir()).unwrap(),
            web,
            sleeper,
            AcademicApis::empty(),
            RetryPolicy::default(),
        );
        Pipeline::new(
            Box::new(FileExtractor::new()),
            Box::new(TfidfPhraseSelector::new(&PhraseConfig::default())),
            search,
            retriever,
            SimilarityEngine::default(),
        )
    }
}

fn report_path(dir: &Path) -> PathBuf {
    dir.join("essay_plagiarism_report.txt")
}

#[tokio::test]
async fn three_sources_one_match_one_unrelated_one_unreachable() {
    let h = Harness::new();
    let web = Arc::new(FakeWeb::with_pages(&[(COPIED_URL, COPIED), (UNRELATED_URL, UNRELATED)]));
    let sleeper = Arc::new(InstantSleeper::default());
    let pipeline = h.pipeline(&[COPIED_URL, UNRELATED_URL, SLOW_URL], web.clone(), sleeper);

    let outcome = pipeline.run(&h.options(false), &NoProgress).await.unwrap();
    let summary = match outcome {
        RunOutcome::Completed(s) => s,
        other => panic!("expected a report, got {:?}", other),
    };

    assert_eq!(summary.online_sources, 2);
    assert_eq!(summary.local_sources, 0);
    assert_eq!(summary.results.len(), 1, "unrelated source must be excluded");
    let hit = &summary.results[0];
    assert_eq!(hit.source.id, COPIED_URL);
    assert_eq!(hit.matches.len(), 2);
    assert!(hit.score > 0.0 && hit.score <= 1.0);

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].url, SLOW_URL);
    assert_eq!(summary.failures[0].reason, "Timeout after 35s");
    assert_eq!(
        web.calls_for(SLOW_URL),
        vec![Strategy::Desktop, Strategy::Mobile, Strategy::Session]
    );

    assert!(summary.report.contains("ONLINE SOURCES"));
    assert!(summary.report.contains("SOURCES NOT DOWNLOADED"));
    assert!(summary.report.contains(SLOW_URL));
    assert_eq!(std::fs::read_to_string(report_path(h.tmp.path())).unwrap(), summary.report);
    assert!(h.tmp.path().join("essay_sources.json").exists());
}

#[tokio::test]
async fn all_sources_timing_out_terminates_without_report() {
    let h = Harness::new();
    let web = Arc::new(FakeWeb::default());
    let sleeper = Arc::new(InstantSleeper::default());
    let urls = ["https://a.example/", "https://b.example/", "https://c.example/"];
    let pipeline = h.pipeline(&urls, web.clone(), sleeper);

    let outcome = pipeline.run(&h.options(false), &NoProgress).await.unwrap();
    assert!(matches!(
        outcome,
        RunOutcome::Terminated(Termination::NoSourcesAccessible { failed: 3 })
    ));
    assert_eq!(web.calls.lock().unwrap().len(), 9);
    assert!(!report_path(h.tmp.path()).exists());
}

#[tokio::test]
async fn cache_only_rerun_uses_manifest_and_cache() {
    let h = Harness::new();
    let web = Arc::new(FakeWeb::with_pages(&[(COPIED_URL, COPIED), (UNRELATED_URL, UNRELATED)]));
    let urls = [COPIED_URL, UNRELATED_URL, SLOW_URL];
    h.pipeline(&urls, web, Arc::new(InstantSleeper::default()))
        .run(&h.options(false), &NoProgress)
        .await
        .unwrap();

    let offline = Arc::new(FakeWeb::default());
    let sleeper = Arc::new(InstantSleeper::default());
    let outcome = h
        .pipeline(&[], offline.clone(), sleeper.clone())
        .run(&h.options(true), &NoProgress)
        .await
        .unwrap();

    let summary = match outcome {
        RunOutcome::Completed(s) => s,
        other => panic!("expected a report, got {:?}", other),
    };
    assert_eq!(summary.online_sources, 2);
    assert_eq!(summary.failures, vec![DownloadFailure::new(SLOW_URL, NOT_IN_CACHE)]);
    assert!(summary.report.contains("SOURCES NOT DOWNLOADED"));
    assert!(summary.report.contains(SLOW_URL));
    assert!(summary.report.contains(NOT_IN_CACHE));
    assert_eq!(summary.results[0].source.id, COPIED_URL);
    assert!(offline.calls.lock().unwrap().is_empty());
    assert!(sleeper.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cache_only_with_empty_cache_yields_no_sources() {
    let h = Harness::new();
    let web = Arc::new(FakeWeb::default());
    let outcome = h
        .pipeline(&[COPIED_URL], web.clone(), Arc::new(InstantSleeper::default()))
        .run(&h.options(true), &NoProgress)
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Terminated(Termination::NoCachedSources)));
    assert!(web.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn local_references_are_analyzed_without_online_results() {
    let h = Harness::new();
    let refs = h.tmp.path().join("local_references");
    std::fs::create_dir_all(&refs).unwrap();
    std::fs::write(refs.join("lecture.txt"), COPIED).unwrap();

    let mut options = h.options(false);
    options.local_references = Some(refs);
    let outcome = h
        .pipeline(&[], Arc::new(FakeWeb::default()), Arc::new(InstantSleeper::default()))
        .run(&options, &NoProgress)
        .await
        .unwrap();

    let summary = match outcome {
        RunOutcome::Completed(s) => s,
        other => panic!("expected a report, got {:?}", other),
    };
    assert_eq!(summary.local_sources, 1);
    assert!(summary.results[0].is_local());
    assert!(summary.report.contains("LOCAL REFERENCE FILES"));
}

#[tokio::test]
async fn short_document_stops_before_search() {
    let h = Harness::new();
    std::fs::write(&h.document, "Too short to analyze.").unwrap();
    let web = Arc::new(FakeWeb::default());
    let outcome = h
        .pipeline(&[COPIED_URL], web.clone(), Arc::new(InstantSleeper::default()))
        .run(&h.options(false), &NoProgress)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        RunOutcome::Terminated(Termination::DocumentTooShort { .. })
    ));
    assert!(web.calls.lock().unwrap().is_empty());
}
