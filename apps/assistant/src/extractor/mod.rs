//! Document Extractor — turns an uploaded PDF CV into plain text for the prompt.
//!
//! `pdf-extract` is CPU-bound and can panic on malformed input, so async callers go
//! through `extract_text_blocking`, which runs on the blocking pool.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[cfg(test)]
pub mod fixtures;

/// Any failure to read or parse the document. Never carries partial text.
#[derive(Debug, Error)]
#[error("Error reading PDF file: {0}")]
pub struct ExtractionError(pub String);

/// Extracts text page by page, joining non-empty pages with newlines.
/// Returns an empty string when the document has no extractable text.
pub fn extract_text(path: &Path) -> Result<String, ExtractionError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ExtractionError(format!("{}: {e}", path.display())))?;

    let pages = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    }))
    .map_err(|_| ExtractionError("PDF parser aborted on malformed input".to_string()))?
    .map_err(|e| ExtractionError(e.to_string()))?;

    let page_count = pages.len();
    let text = join_pages(pages);

    debug!(
        "Extracted {} chars from {} pages of {}",
        text.len(),
        page_count,
        path.display()
    );

    Ok(text)
}

/// Runs `extract_text` on the blocking pool.
pub async fn extract_text_blocking(path: PathBuf) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract_text(&path))
        .await
        .map_err(|e| ExtractionError(format!("extraction task failed: {e}")))?
}

fn join_pages(pages: Vec<String>) -> String {
    pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
