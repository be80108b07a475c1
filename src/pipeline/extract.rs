//! Text extraction: document bytes in, plain text out.
//!
//! [`TextExtractor`] is the seam the pipeline depends on; [`PdfTextExtractor`]
//! is the production implementation backed by `pdf-extract`.
//!
//! `pdf-extract` is synchronous and CPU-bound, so it runs on the blocking
//! pool. It is also known to panic on some malformed files; the panic stays
//! inside the blocking task and comes back as a `JoinError`, which we report
//! as an ordinary extraction failure.

use crate::error::ExplainError;
use async_trait::async_trait;
use tracing::debug;

/// Turns an uploaded document into text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract all text from `bytes`. `file_name` is for error messages only.
    async fn extract(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ExplainError>;
}

/// PDF text extraction via `pdf-extract` (pure Rust, no native libs).
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ExplainError> {
        extract_blocking(file_name, bytes, pdf_extract::extract_text_from_mem).await
    }
}

/// Run `parse` over `bytes` on the blocking pool, folding parse errors and
/// panics into [`ExplainError::Extraction`].
async fn extract_blocking<F, E>(
    file_name: &str,
    bytes: Vec<u8>,
    parse: F,
) -> Result<String, ExplainError>
where
    F: FnOnce(&[u8]) -> Result<String, E> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let len = bytes.len();
    let result = tokio::task::spawn_blocking(move || parse(&bytes)).await;

    match result {
        Ok(Ok(text)) => {
            debug!(
                "Extracted {} chars from '{}' ({} bytes)",
                text.len(),
                file_name,
                len
            );
            Ok(text)
        }
        Ok(Err(e)) => Err(ExplainError::Extraction {
            filename: file_name.to_string(),
            detail: e.to_string(),
        }),
        Err(join_err) => Err(ExplainError::Extraction {
            filename: file_name.to_string(),
            detail: if join_err.is_panic() {
                "PDF parser panicked (malformed PDF)".to_string()
            } else {
                format!("extraction task failed: {join_err}")
            },
        }),
    }
}
