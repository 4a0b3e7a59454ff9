//! # plagcheck core
//!
//! Pure analysis logic for plagcheck: the source data model, sentence
//! splitting, TF-IDF vectorization, the similarity engine, and report
//! rendering.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! side-effecting dependencies. Everything here is deterministic for a given
//! input, which is what the retrieval layer in the `plagcheck` crate relies
//! on when it feeds downloaded and cached text through the analysis.

pub mod models;
pub mod report;
pub mod similarity;
pub mod stopwords;
pub mod text;
pub mod tfidf;
