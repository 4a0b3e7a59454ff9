//! Core data models shared by retrieval, analysis, and reporting.
//!
//! These types represent the sources, scores, and failures that flow through
//! a single plagiarism-check run.

use serde::{Deserialize, Serialize};

use crate::text::extract_title;

/// Where a [`Source`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// A file from the local reference directory.
    Local,
    /// Content downloaded from (or cached for) a URL.
    Online,
}

/// A unit of comparison content.
///
/// Built once by the retrieval layer or the local reference loader and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Source {
    /// URL for online sources, filesystem path for local ones.
    pub id: String,
    /// Display name: derived title for online sources, file name for local ones.
    pub title: String,
    pub origin: Origin,
    pub content: String,
}

impl Source {
    /// An online source; the title is derived from the opening sentence.
    pub fn online(url: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: url.into(),
            title: extract_title(&content),
            origin: Origin::Online,
            content,
        }
    }

    /// A local reference file.
    pub fn local(
        path: impl Into<String>,
        file_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: path.into(),
            title: file_name.into(),
            origin: Origin::Local,
            content: content.into(),
        }
    }

    /// Metadata carried into a [`MatchResult`].
    pub fn meta(&self) -> SourceMeta {
        SourceMeta {
            id: self.id.clone(),
            title: self.title.clone(),
            origin: self.origin,
        }
    }

    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }
}

/// Identifying metadata of a source, without its content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceMeta {
    pub id: String,
    pub title: String,
    pub origin: Origin,
}

/// The best source sentence found for one document sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentenceMatch {
    pub document_sentence: String,
    pub source_sentence: String,
    /// Cosine similarity in `[0.0, 1.0]`.
    pub similarity: f64,
}

/// One scored comparison between the document and a source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub source: SourceMeta,
    /// Document-level cosine similarity in `[0.0, 1.0]`.
    pub score: f64,
    /// At most one entry per document sentence, in document order.
    pub matches: Vec<SentenceMatch>,
}

impl MatchResult {
    pub fn is_local(&self) -> bool {
        self.source.origin == Origin::Local
    }
}

/// A URL that yielded no usable text: every strategy failed, the content
/// was too short, or (in cache-only runs) it was not in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadFailure {
    pub url: String,
    pub reason: String,
}

impl DownloadFailure {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
