//! # plagcheck CLI
//!
//! ## Usage
//!
//! ```bash
//! plagcheck [--config plagcheck.toml] [--progress human] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `plagcheck check <file>` | Run the full check on a `.txt`, `.pdf` or `.docx` file |
//! | `plagcheck cache stats` | Show cache entry counts and sizes |
//! | `plagcheck cache migrate` | Compress legacy uncompressed cache entries |
//!
//! The report is printed on stdout and saved next to the document (or in
//! `--output-dir`). Progress and logs go to stderr; set `RUST_LOG` to
//! change the log level.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use plagcheck::config::{self, Config};
use plagcheck::extract::{PagePosition, PageWindow, SUPPORTED_EXTENSIONS};
use plagcheck::pipeline::{Pipeline, RunOptions, RunOutcome};
use plagcheck::progress::ProgressMode;

const LARGE_FILE_BYTES: u64 = 100 * 1024 * 1024;

/// plagcheck: find online and local sources similar to a document.
#[derive(Parser)]
#[command(
    name = "plagcheck",
    about = "Find sources similar to a document and report TF-IDF similarity",
    version,
    long_about = "plagcheck extracts key phrases from a document, searches the web and academic \
    indexes for them, downloads the candidate sources with caching and retries, and scores every \
    source against the document at document and sentence level."
)]
struct Cli {
    /// Path to a configuration file (TOML). Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Progress output on stderr. Defaults to `human` on a terminal, `off` otherwise.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a document for plagiarism.
    Check {
        /// Document to check (.txt, .pdf or .docx).
        file: PathBuf,

        /// Number of pages to analyze (default: all). A page is 3000 characters.
        #[arg(long)]
        pages: Option<usize>,

        /// Where the analyzed pages are taken from.
        #[arg(long, value_enum, default_value_t = PagePosition::Middle)]
        position: PagePosition,

        /// Maximum number of online sources to download.
        #[arg(long)]
        max_sources: Option<usize>,

        /// Number of phrases to search; 0 searches every candidate phrase.
        #[arg(long)]
        num_phrases: Option<usize>,

        /// Also search CrossRef and arXiv.
        #[arg(long)]
        use_apis: bool,

        /// Also compare against files in `local_references/` next to the document.
        #[arg(long)]
        use_local: bool,

        /// Web search engine.
        #[arg(long, value_parser = ["auto", "duckduckgo", "serpapi", "none"])]
        search_engine: Option<String>,

        /// Skip searching and downloading; analyze cached sources from the last run.
        #[arg(long)]
        cache_only: bool,

        /// Directory for the report and the search manifest.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Inspect or maintain the download cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry counts and on-disk sizes.
    Stats,
    /// Rewrite legacy uncompressed entries as gzip.
    Migrate,
}

fn validate_input(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }
    if !path.is_file() {
        bail!("Path is not a file: {}", path.display());
    }
    let size = std::fs::metadata(path)?.len();
    if size == 0 {
        bail!("File is empty: {}", path.display());
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        bail!(
            "Unsupported file format: {} (supported: .txt, .pdf, .docx)",
            path.display()
        );
    }
    if size > LARGE_FILE_BYTES {
        tracing::warn!(
            size_mb = %format!("{:.1}", size as f64 / 1024.0 / 1024.0),
            "file is very large; processing may take a long time"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = config::load_or_default(cli.config.as_deref())?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty).reporter();

    match cli.command {
        Commands::Check {
            file,
            pages,
            position,
            max_sources,
            num_phrases,
            use_apis,
            use_local,
            search_engine,
            cache_only,
            output_dir,
        } => {
            validate_input(&file)?;
            if pages == Some(0) {
                bail!("--pages must be at least 1");
            }
            apply_overrides(
                &mut config,
                Overrides {
                    max_sources,
                    num_phrases,
                    use_apis,
                    use_local,
                    search_engine,
                    cache_only,
                    output_dir,
                },
            )?;

            let window = pages.map(|pages| PageWindow {
                pages,
                position,
                chars_per_page: config.document.chars_per_page,
            });
            if window.is_none() {
                tracing::warn!(
                    "analyzing the entire document; consider --pages N --position start|middle|end for more focused phrases"
                );
            }
            if cache_only {
                tracing::info!("cache-only mode: no searches or downloads will be performed");
            }

            let pipeline = Pipeline::from_config(&config, window)?;
            let options = RunOptions::from_config(&config, &file, cache_only);
            match pipeline.run(&options, progress.as_ref()).await? {
                RunOutcome::Completed(summary) => {
                    print!("{}", summary.report);
                    eprintln!("Report saved to: {}", summary.report_path.display());
                }
                RunOutcome::Terminated(reason) => {
                    eprintln!("{}", reason);
                }
            }
        }
        Commands::Cache { action } => match action {
            CacheAction::Stats => plagcheck::cache_cmd::run_stats(&config)?,
            CacheAction::Migrate => plagcheck::cache_cmd::run_migrate(&config)?,
        },
    }

    Ok(())
}

struct Overrides {
    max_sources: Option<usize>,
    num_phrases: Option<usize>,
    use_apis: bool,
    use_local: bool,
    search_engine: Option<String>,
    cache_only: bool,
    output_dir: Option<PathBuf>,
}

fn apply_overrides(config: &mut Config, o: Overrides) -> Result<()> {
    if let Some(n) = o.max_sources {
        config.search.max_sources = n;
    }
    if o.num_phrases.is_some() {
        config.phrases.count = o.num_phrases;
    }
    config.search.use_apis |= o.use_apis;
    config.search.use_local |= o.use_local;
    if let Some(engine) = o.search_engine {
        config.search.engine = engine;
    }
    if o.cache_only {
        // nothing is searched, so no provider (or SerpApi key) is needed
        config.search.engine = "none".to_string();
    }
    if o.output_dir.is_some() {
        config.report.output_dir = o.output_dir;
    }
    config.validate()
}
