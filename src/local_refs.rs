//! Local reference files.
//!
//! Walks a directory recursively, extracts every `.txt`, `.pdf` and `.docx`
//! it finds, and turns files with enough text into local [`Source`]s.

use std::path::Path;

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use plagcheck_core::models::Source;

use crate::traits::TextExtractor;

const INCLUDE_GLOBS: &[&str] = &["**/*.txt", "**/*.pdf", "**/*.docx"];

/// Load reference files under `root`, sorted by path.
///
/// A missing directory yields no sources. Symlinks are followed. Entries the
/// walk cannot read, files that fail extraction, and files with `min_chars`
/// characters or fewer are skipped with a warning.
pub fn load_local_references(
    root: &Path,
    extractor: &dyn TextExtractor,
    min_chars: usize,
) -> Result<Vec<Source>> {
    if !root.is_dir() {
        tracing::warn!(dir = %root.display(), "local references directory not found");
        return Ok(Vec::new());
    }

    let include = build_globset(INCLUDE_GLOBS)?;
    let mut paths = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %root.display(), error = %e, "skipping unreadable reference entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        // globset matching is case-sensitive; extensions are not
        let rel_str = relative.to_string_lossy().to_lowercase();
        if include.is_match(&rel_str) {
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();

    let mut sources = Vec::new();
    for path in paths {
        let text = match extractor.extract(&path) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping unreadable reference file");
                continue;
            }
        };
        if text.chars().count() <= min_chars {
            tracing::warn!(file = %path.display(), "skipping reference file with too little text");
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        sources.push(Source::local(path.display().to_string(), name, text));
    }

    tracing::info!(count = sources.len(), dir = %root.display(), "loaded local references");
    Ok(sources)
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
