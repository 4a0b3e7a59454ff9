//! Plain-text report rendering.
//!
//! The renderer is a pure function of its input: the caller supplies the
//! timestamp, which keeps the output reproducible in tests. Results are
//! expected in ranked order (as returned by
//! [`SimilarityEngine::analyze`](crate::similarity::SimilarityEngine::analyze));
//! they are split into a local and an online section without reordering.

use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::models::{DownloadFailure, MatchResult, SentenceMatch};
use crate::text::truncate_chars;

const RULE_WIDTH: usize = 80;
const SAMPLE_MATCHES: usize = 3;
const SAMPLE_CHARS: usize = 150;

/// Overall label derived from the highest score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityLevel {
    High,
    Moderate,
    Low,
}

impl SimilarityLevel {
    /// `> 0.5` is high, `> 0.3` moderate, anything else low.
    pub fn from_score(score: f64) -> Self {
        if score > 0.5 {
            SimilarityLevel::High
        } else if score > 0.3 {
            SimilarityLevel::Moderate
        } else {
            SimilarityLevel::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SimilarityLevel::High => "HIGH SIMILARITY DETECTED",
            SimilarityLevel::Moderate => "MODERATE SIMILARITY DETECTED",
            SimilarityLevel::Low => "LOW SIMILARITY",
        }
    }
}

/// Everything the report needs about one run.
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    pub document_name: &'a str,
    pub generated_at: NaiveDateTime,
    /// Length of the analyzed text in characters.
    pub document_chars: usize,
    pub results: &'a [MatchResult],
    pub failures: &'a [DownloadFailure],
    /// Strategies tried per URL before it was recorded as a failure.
    pub attempts_per_url: usize,
}

pub fn render_report(input: &ReportInput<'_>) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let local: Vec<&MatchResult> = input.results.iter().filter(|r| r.is_local()).collect();
    let online: Vec<&MatchResult> = input.results.iter().filter(|r| !r.is_local()).collect();

    let mut out = String::new();
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "PLAGIARISM CHECK REPORT");
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "Document: {}", input.document_name);
    let _ = writeln!(out, "Date: {}", input.generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Document length: {} characters", input.document_chars);
    let _ = writeln!(
        out,
        "Sources analyzed: {} ({} local, {} online)",
        input.results.len(),
        local.len(),
        online.len()
    );
    if !input.failures.is_empty() {
        let _ = writeln!(
            out,
            "Online sources failed to download: {}",
            input.failures.len()
        );
    }
    let _ = writeln!(out, "{heavy}");

    if input.results.is_empty() {
        let _ = writeln!(out, "\nNO SIGNIFICANT MATCHES FOUND");
        let _ = writeln!(
            out,
            "\nThe document appears to be original or no similar sources were found."
        );
    } else {
        let highest = input
            .results
            .iter()
            .map(|r| r.score)
            .fold(0.0f64, f64::max);
        let segments: usize = input.results.iter().map(|r| r.matches.len()).sum();

        let _ = writeln!(out, "\nOVERALL ASSESSMENT:");
        let _ = writeln!(out, "  Highest similarity score: {}", percent(highest));
        let _ = writeln!(out, "  Total matching segments found: {segments}");
        let _ = writeln!(out, "  Status: {}", SimilarityLevel::from_score(highest).label());

        let _ = writeln!(out, "\n{heavy}");
        let _ = writeln!(out, "DETAILED RESULTS");
        let _ = writeln!(out, "{heavy}");

        if !local.is_empty() {
            let _ = writeln!(out, "\n{light}");
            let _ = writeln!(out, "LOCAL REFERENCE FILES");
            let _ = writeln!(out, "{light}");
            for (i, r) in local.iter().enumerate() {
                let _ = writeln!(out, "\nLOCAL SOURCE #{}", i + 1);
                let _ = writeln!(out, "  File: {}", r.source.title);
                let _ = writeln!(out, "  Path: {}", r.source.id);
                write_result_body(&mut out, r);
                let _ = writeln!(out, "\n{light}");
            }
        }

        if !online.is_empty() {
            let _ = writeln!(out, "\n{light}");
            let _ = writeln!(out, "ONLINE SOURCES");
            let _ = writeln!(out, "{light}");
            for (i, r) in online.iter().enumerate() {
                let _ = writeln!(out, "\nONLINE SOURCE #{}", i + 1);
                let _ = writeln!(out, "  URL: {}", r.source.id);
                let _ = writeln!(out, "  Title: {}", r.source.title);
                write_result_body(&mut out, r);
                let _ = writeln!(out, "\n{light}");
            }
        }
    }

    if !input.failures.is_empty() {
        let _ = writeln!(out, "\n{heavy}");
        let _ = writeln!(out, "SOURCES NOT DOWNLOADED");
        let _ = writeln!(out, "{heavy}");
        let _ = writeln!(
            out,
            "\nThe following sources could not be downloaded after {} attempts.",
            input.attempts_per_url
        );
        let _ = writeln!(out, "Please verify these sources manually:");
        for (i, f) in input.failures.iter().enumerate() {
            let _ = writeln!(out, "\nFAILED SOURCE #{}", i + 1);
            let _ = writeln!(out, "  URL: {}", f.url);
            let _ = writeln!(out, "  Reason: {}", f.reason);
            let _ = writeln!(out, "{light}");
        }
    }

    let _ = writeln!(out, "\n{heavy}");
    let _ = writeln!(out, "LIMITATIONS");
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "- Detects textual similarity only");
    let _ = writeln!(out, "- Does NOT detect paraphrasing or semantic rewording");
    let _ = writeln!(out, "- Only searches publicly accessible web content");
    let _ = writeln!(
        out,
        "- Academic coverage is limited to open metadata and open-access copies"
    );
    let _ = write!(out, "{heavy}");
    out
}

fn write_result_body(out: &mut String, r: &MatchResult) {
    let _ = writeln!(out, "  Overall Similarity: {}", percent(r.score));
    let _ = writeln!(out, "  Matching Segments: {}", r.matches.len());
    if r.matches.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n  Sample Matches:");
    for (j, m) in r.matches.iter().take(SAMPLE_MATCHES).enumerate() {
        write_sample(out, j + 1, m);
    }
}

fn write_sample(out: &mut String, n: usize, m: &SentenceMatch) {
    let _ = writeln!(out, "\n  Match {} (Similarity: {}):", n, percent(m.similarity));
    let _ = writeln!(out, "    Document: \"{}\"", excerpt(&m.document_sentence));
    let _ = writeln!(out, "    Source:   \"{}\"", excerpt(&m.source_sentence));
}

fn excerpt(sentence: &str) -> String {
    let cut = truncate_chars(sentence, SAMPLE_CHARS);
    if cut.len() < sentence.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}

fn percent(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}
