//! Text Extractor — reads a persisted PDF and returns the text of every page
//! in page order.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::errors::EvaluationError;

#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Returns the concatenated page text. An unreadable document is an
    /// `Extraction` error; a readable document without text is `Ok("")`.
    async fn extract(&self, path: &Path) -> Result<String, EvaluationError>;
}

/// `pdf-extract` backed extractor. Parsing runs on the blocking pool.
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String, EvaluationError> {
        let owned: PathBuf = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_by_pages(&owned).map_err(|e| e.to_string())
        })
        .await
        // A panic inside the parser surfaces as a JoinError.
        .map_err(|e| EvaluationError::Extraction(format!("PDF parser aborted: {e}")))?
        .map_err(|e| {
            EvaluationError::Extraction(format!(
                "Failed to extract text from PDF '{}': {e}",
                path.display()
            ))
        })?;

        let text = pages.concat();
        info!(
            "Extracted {} chars from {} page(s)",
            text.chars().count(),
            pages.len()
        );
        Ok(text)
    }
}
