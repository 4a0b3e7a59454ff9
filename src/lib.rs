//! # plagcheck
//!
//! Source acquisition and TF-IDF similarity analysis for plagiarism checking.
//!
//! A document is reduced to a handful of distinctive phrases, the phrases
//! are searched on the web and in academic indexes, every candidate source
//! is downloaded (cache first, several request strategies with escalating
//! timeouts), and each source is scored against the document at document
//! and sentence level. The result is a ranked plain-text report.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌─────────┐   ┌────────┐   ┌──────────┐   ┌─────────┐   ┌────────┐
//! │ EXTRACT │──▶│ PHRASES │──▶│ SEARCH │──▶│ RETRIEVE │──▶│ ANALYZE │──▶│ REPORT │
//! │txt/pdf/ │   │ TF-IDF  │   │SerpApi │   │ cache +  │   │ TF-IDF  │   │  .txt  │
//! │  docx   │   │ ranked  │   │DDG/APIs│   │ retries  │   │ cosine  │   │ stdout │
//! └─────────┘   └─────────┘   └────────┘   └──────────┘   └─────────┘   └────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! plagcheck check thesis.docx --pages 3 --position middle
//! plagcheck check essay.txt --use-apis --use-local
//! plagcheck check essay.txt --cache-only
//! plagcheck cache stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`cache`] | Gzip on-disk content cache |
//! | [`html`] | HTML to plain text |
//! | [`fetch`] | Request strategies, retry policy, shared HTTP pool |
//! | [`academic`] | arXiv, Unpaywall and Semantic Scholar fetchers |
//! | [`retrieve`] | Retrieval engine |
//! | [`search`] | Search providers and the search stage |
//! | [`phrases`] | Key phrase selection |
//! | [`extract`] | Document text extraction |
//! | [`local_refs`] | Local reference files |
//! | [`pipeline`] | Run orchestration |
//! | [`progress`] | Stage progress on stderr |
//! | [`traits`] | Collaborator traits |
//!
//! Pure computation (data model, TF-IDF, scoring, report rendering) lives in
//! the `plagcheck-core` crate.

pub mod academic;
pub mod cache;
pub mod cache_cmd;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod local_refs;
pub mod phrases;
pub mod pipeline;
pub mod progress;
pub mod retrieve;
pub mod search;
pub mod traits;
