//! Run progress reporting.
//!
//! Reports which pipeline stage is running and how far through its items it
//! is. Progress is emitted on **stderr** so stdout carries only the report.

use std::io::Write;

/// Pipeline stage, in execution order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    Extract,
    SelectPhrases,
    Search,
    Retrieve,
    Analyze,
    Report,
}

impl Stage {
    pub const COUNT: usize = 6;

    /// 1-based position in the pipeline.
    pub fn position(self) -> usize {
        match self {
            Stage::Extract => 1,
            Stage::SelectPhrases => 2,
            Stage::Search => 3,
            Stage::Retrieve => 4,
            Stage::Analyze => 5,
            Stage::Report => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::SelectPhrases => "select_phrases",
            Stage::Search => "search",
            Stage::Retrieve => "retrieve",
            Stage::Analyze => "analyze",
            Stage::Report => "report",
        }
    }
}

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    Started { stage: Stage },
    /// Item `n` of `total` is being processed.
    Item {
        stage: Stage,
        n: u64,
        total: u64,
        label: String,
    },
    /// Free-form status line (a warning or a result count).
    Note { stage: Stage, message: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "[4/6] retrieve  3 / 10  https://...".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Started { stage } => {
                format!("[{}/{}] {}...\n", stage.position(), Stage::COUNT, stage.name())
            }
            ProgressEvent::Item {
                stage,
                n,
                total,
                label,
            } => format!(
                "[{}/{}] {}  {} / {}  {}\n",
                stage.position(),
                Stage::COUNT,
                stage.name(),
                format_number(*n),
                format_number(*total),
                label
            ),
            ProgressEvent::Note { stage, message } => {
                format!("[{}/{}] {}  {}\n", stage.position(), Stage::COUNT, stage.name(), message)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Started { stage } => serde_json::json!({
                "event": "stage",
                "stage": stage.name(),
                "position": stage.position(),
            }),
            ProgressEvent::Item {
                stage,
                n,
                total,
                label,
            } => serde_json::json!({
                "event": "progress",
                "stage": stage.name(),
                "n": n,
                "total": total,
                "item": label,
            }),
            ProgressEvent::Note { stage, message } => serde_json::json!({
                "event": "note",
                "stage": stage.name(),
                "message": message,
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn stages_are_numbered_in_order() {
        let stages = [
            Stage::Extract,
            Stage::SelectPhrases,
            Stage::Search,
            Stage::Retrieve,
            Stage::Analyze,
            Stage::Report,
        ];
        for (i, s) in stages.iter().enumerate() {
            assert_eq!(s.position(), i + 1);
        }
        assert_eq!(Stage::COUNT, stages.len());
    }
}
