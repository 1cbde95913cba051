use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Document decode error: {0}")]
    Decode(String),
    #[error("Document contains no text")]
    Empty,
    #[error("PDF input needs the `pdf` feature")]
    PdfNotAvailable,
}

/// Abstraction over whatever turns a statement file into per-page text.
/// Implementations return one string per page, first page first.
pub trait PageSource: Send + Sync {
    fn pages(&self, data: &[u8]) -> Result<Vec<String>, SourceError>;
}

/// Form feed, the page break emitted by `pdftotext` and `pdf-extract`.
const PAGE_BREAK: char = '\u{000C}';

/// Split on page breaks. Blank pages stay in place so numbering matches the
/// original document.
fn split_pages(text: &str) -> Result<Vec<String>, SourceError> {
    if text.trim().is_empty() {
        return Err(SourceError::Empty);
    }
    let mut pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
    // A trailing break does not open a new page.
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    Ok(pages)
}

// ── Plain text ────────────────────────────────────────────────────────────────

/// Already-extracted text (e.g. `pdftotext` output). Invalid UTF-8 is replaced.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextSource;

impl PageSource for PlainTextSource {
    fn pages(&self, data: &[u8]) -> Result<Vec<String>, SourceError> {
        split_pages(&String::from_utf8_lossy(data))
    }
}

// ── Mock (tests) ──────────────────────────────────────────────────────────────

/// Returns preset pages regardless of input.
pub struct MockSource {
    pub pages: Vec<String>,
}

impl MockSource {
    pub fn new<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { pages: pages.into_iter().map(Into::into).collect() }
    }
}

impl PageSource for MockSource {
    fn pages(&self, _data: &[u8]) -> Result<Vec<String>, SourceError> {
        Ok(self.pages.clone())
    }
}

// ── Auto-detecting source ─────────────────────────────────────────────────────

/// Picks PDF or plain text by sniffing the `%PDF` magic bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentSource;

impl PageSource for DocumentSource {
    fn pages(&self, data: &[u8]) -> Result<Vec<String>, SourceError> {
        if data.starts_with(b"%PDF") {
            pdf_pages(data)
        } else {
            PlainTextSource.pages(data)
        }
    }
}

#[cfg(feature = "pdf")]
fn pdf_pages(data: &[u8]) -> Result<Vec<String>, SourceError> {
    let text = pdf_extract::extract_text_from_mem(data)
        .map_err(|e| SourceError::Decode(e.to_string()))?;
    split_pages(&text)
}

#[cfg(not(feature = "pdf"))]
fn pdf_pages(_data: &[u8]) -> Result<Vec<String>, SourceError> {
    Err(SourceError::PdfNotAvailable)
}
