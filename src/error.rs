//! Error types for the bedrock-explain service.
//!
//! Every failure inside a request is an [`ExplainError`]. The HTTP layer only
//! cares about one question, answered by [`ExplainError::kind`]: was the
//! request itself malformed ([`ErrorKind::BadRequest`], HTTP 400), or did
//! something go wrong on our side or at a collaborator
//! ([`ErrorKind::Internal`], HTTP 500)?
//!
//! Internal errors carry full detail for the server log. Callers never see
//! that detail; they get one generic message (see [`GENERIC_ERROR_MESSAGE`]).

use std::path::PathBuf;
use thiserror::Error;

/// Body text returned to callers for every internal failure.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Coarse classification used to pick the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent an unusable request (400).
    BadRequest,
    /// Extraction, inference or local I/O failed (500).
    Internal,
}

/// All errors produced while serving an explain request.
#[derive(Debug, Error)]
pub enum ExplainError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The multipart body had no part named `field`.
    #[error("No file uploaded: expected a multipart part named '{field}'")]
    MissingFile { field: String },

    /// The file part was present but contained zero bytes.
    #[error("Uploaded file '{filename}' is empty")]
    EmptyFile { filename: String },

    /// The multipart body could not be read (malformed, too large, aborted).
    #[error("Failed to read upload: {reason}")]
    Upload { reason: String },

    // ── Local I/O ─────────────────────────────────────────────────────────
    /// Creating, writing or reading the request's temporary file failed.
    #[error("Temporary file error at '{path}': {source}")]
    TempFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Collaborator errors ───────────────────────────────────────────────
    /// The document could not be turned into text (corrupt, encrypted, not a PDF).
    #[error("Text extraction failed for '{filename}': {detail}")]
    Extraction { filename: String, detail: String },

    /// The model endpoint returned an error (network, auth, service-side).
    #[error("Inference call to model '{model_id}' failed: {detail}")]
    Inference { model_id: String, detail: String },

    /// The model endpoint did not answer before the deadline.
    #[error("Inference call to model '{model_id}' timed out after {timeout_ms}ms")]
    InferenceTimeout { model_id: String, timeout_ms: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExplainError {
    /// Classify this error for the HTTP layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExplainError::MissingFile { .. }
            | ExplainError::EmptyFile { .. }
            | ExplainError::Upload { .. } => ErrorKind::BadRequest,
            ExplainError::TempFile { .. }
            | ExplainError::Extraction { .. }
            | ExplainError::Inference { .. }
            | ExplainError::InferenceTimeout { .. }
            | ExplainError::InvalidConfig(_)
            | ExplainError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The message that is safe to show to the caller.
    ///
    /// Bad requests explain themselves; everything else collapses to
    /// [`GENERIC_ERROR_MESSAGE`].
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::BadRequest => self.to_string(),
            ErrorKind::Internal => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}
