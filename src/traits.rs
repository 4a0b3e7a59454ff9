//! Collaborator traits for the pipeline stages that sit outside retrieval
//! and analysis.
//!
//! The orchestrator depends only on these traits, so any stage can be
//! replaced: a different document reader, a different phrase heuristic, or
//! another search backend.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐  ┌────────────────┐  ┌────────────────┐
//! │ TextExtractor │─▶│ PhraseSelector │─▶│ SearchProvider │──▶ URLs
//! │ txt/pdf/docx  │  │  TF-IDF ranked │  │ SerpApi / DDG  │
//! └───────────────┘  └────────────────┘  │ CrossRef/arXiv │
//!                                        └────────────────┘
//! ```
//!
//! Default implementations: [`FileExtractor`](crate::extract::FileExtractor),
//! [`TfidfPhraseSelector`](crate::phrases::TfidfPhraseSelector), and the
//! providers in [`search`](crate::search).

use std::path::Path;

use async_trait::async_trait;

use crate::extract::ExtractError;

/// Reads a document file into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Picks the phrases of a document worth searching for.
pub trait PhraseSelector: Send + Sync {
    /// Phrases in document order. Never empty for non-empty text.
    fn select(&self, text: &str) -> Vec<String>;
}

/// A search backend.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use plagcheck::traits::SearchProvider;
///
/// pub struct FixedResults(Vec<String>);
///
/// #[async_trait]
/// impl SearchProvider for FixedResults {
///     fn name(&self) -> &str { "fixed" }
///
///     async fn search(&self, _phrase: &str) -> Vec<String> {
///         self.0.clone()
///     }
/// }
/// ```
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short identifier used in logs and progress output.
    fn name(&self) -> &str;

    /// Candidate URLs for a phrase, best first.
    ///
    /// Never fails: network and parse errors are logged and yield an empty
    /// list, which is also a normal "no results" answer.
    async fn search(&self, phrase: &str) -> Vec<String>;
}
