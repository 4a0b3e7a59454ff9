//! Document text extraction for `.txt`, `.pdf` and `.docx`.
//!
//! [`FileExtractor`] dispatches on the file extension and optionally narrows
//! the result to a window of "pages" (fixed-size character blocks) taken from
//! the start, middle or end of the text.

use std::io::Read;
use std::path::Path;

use crate::traits::TextExtractor;

/// Extensions accepted for input documents and local references.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "pdf", "docx"];

/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb bound).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported file format: {0} (supported: .txt, .pdf, .docx)")]
    UnsupportedFormat(String),
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Where a page window sits in the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PagePosition {
    Start,
    #[default]
    Middle,
    End,
}

impl PagePosition {
    pub fn name(self) -> &'static str {
        match self {
            PagePosition::Start => "start",
            PagePosition::Middle => "middle",
            PagePosition::End => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub pages: usize,
    pub position: PagePosition,
    pub chars_per_page: usize,
}

impl PageWindow {
    /// The `pages * chars_per_page` characters at `position`.
    pub fn apply<'a>(&self, text: &'a str) -> &'a str {
        let total = text.chars().count();
        let wanted = self.pages.saturating_mul(self.chars_per_page);
        let start = match self.position {
            PagePosition::Start => 0,
            PagePosition::End => total.saturating_sub(wanted),
            PagePosition::Middle => total.saturating_sub(wanted) / 2,
        };
        let end = start.saturating_add(wanted).min(total);
        let byte_at = |n: usize| text.char_indices().nth(n).map_or(text.len(), |(i, _)| i);
        &text[byte_at(start)..byte_at(end)]
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileExtractor {
    window: Option<PageWindow>,
}

impl FileExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window: Option<PageWindow>) -> Self {
        Self { window }
    }
}

impl TextExtractor for FileExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ExtractError::UnsupportedFormat(format!(".{ext}")));
        }

        let bytes = std::fs::read(path).map_err(|source| ExtractError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let text = match ext.as_str() {
            "pdf" => extract_pdf(&bytes)?,
            "docx" => extract_docx(&bytes)?,
            _ => String::from_utf8_lossy(&bytes).into_owned(),
        };

        Ok(match &self.window {
            Some(window) => {
                let narrowed = window.apply(&text).to_string();
                tracing::info!(
                    chars = narrowed.chars().count(),
                    pages = window.pages,
                    position = window.position.name(),
                    total_pages = (text.chars().count() / window.chars_per_page.max(1)).max(1),
                    "extracted page window"
                );
                narrowed
            }
            None => text,
        })
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;
    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    docx_paragraphs(&xml)
}

/// Text of every non-blank `w:p`, one paragraph per line.
fn docx_paragraphs(xml: &[u8]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if !current.trim().is_empty() {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"tab" => current.push('\t'),
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(|e| ExtractError::Docx(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    if !current.trim().is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs.join("\n"))
}
