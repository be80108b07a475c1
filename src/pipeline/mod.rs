//! The explain pipeline: one uploaded document in, one explanation out.
//!
//! Each submodule implements one stage; [`ExplainPipeline`] sequences them.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ extract ──▶ prompt ──▶ inference ──▶ cleanup ──▶ respond
//! (temp file) (pdf-extract) (prefix)  (Bedrock)    (unlink)    (JSON)
//! ```
//!
//! 1. [`upload`]: stage the multipart file part in a scoped temp file
//! 2. [`extract`]: read the file and pull its text out on the blocking pool
//! 3. [`crate::prompts`]: wrap the text in the fixed instruction
//! 4. [`inference`]: call the model under a deadline; the only network stage
//! 5. cleanup: unlink the temp file on every exit path
//!
//! Stages 2–4 run strictly in order within a request. Requests share nothing
//! but the read-only collaborators held by the pipeline.

pub mod extract;
pub mod inference;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod upload;

use crate::config::ServerConfig;
use crate::error::ExplainError;
use crate::prompts::{build_prompt, PROMPT_CONTENT_TYPE};
use extract::TextExtractor;
use inference::{InvokeRequest, ModelInvoker};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use upload::UploadedDocument;

/// Successful response body: `{"explanation": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub explanation: String,
}

/// Sequences extraction, prompting and inference for one document.
///
/// Built once at startup and shared by all requests; it holds no per-request
/// state.
#[derive(Clone)]
pub struct ExplainPipeline {
    extractor: Arc<dyn TextExtractor>,
    invoker: Arc<dyn ModelInvoker>,
    model_id: String,
    inference_timeout: Duration,
}

impl fmt::Debug for ExplainPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplainPipeline")
            .field("extractor", &"<dyn TextExtractor>")
            .field("invoker", &"<dyn ModelInvoker>")
            .field("model_id", &self.model_id)
            .field("inference_timeout", &self.inference_timeout)
            .finish()
    }
}

impl ExplainPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        invoker: Arc<dyn ModelInvoker>,
        model_id: impl Into<String>,
        inference_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            invoker,
            model_id: model_id.into(),
            inference_timeout,
        }
    }

    /// Build a pipeline using the model id and deadline from `config`.
    pub fn from_config(
        config: &ServerConfig,
        extractor: Arc<dyn TextExtractor>,
        invoker: Arc<dyn ModelInvoker>,
    ) -> Self {
        Self::new(
            extractor,
            invoker,
            config.model_id.clone(),
            Duration::from_secs(config.inference_timeout_secs),
        )
    }

    /// Explain `document`, consuming it.
    ///
    /// The staged file is deleted before this returns, whatever the outcome.
    /// A failed deletion is logged and does not change the result. If the
    /// returned future is dropped mid-flight, dropping `document` deletes the
    /// file instead.
    pub async fn run(&self, document: UploadedDocument) -> Result<Explanation, ExplainError> {
        let start = Instant::now();
        let result = self.explain(&document).await;

        let file_name = document.file_name().to_string();
        if let Err(e) = document.cleanup() {
            warn!("Failed to remove staged upload '{}': {}", file_name, e);
        }

        if result.is_ok() {
            info!(
                "Explained '{}' in {}ms",
                file_name,
                start.elapsed().as_millis()
            );
        }
        result
    }

    async fn explain(&self, document: &UploadedDocument) -> Result<Explanation, ExplainError> {
        // ── Step 1: Extract text ─────────────────────────────────────────
        let bytes = document.read_bytes().await?;
        let text = self.extractor.extract(document.file_name(), bytes).await?;

        // ── Step 2: Build prompt ─────────────────────────────────────────
        let prompt = build_prompt(&text);
        debug!("Prompt for '{}': {} bytes", document.file_name(), prompt.len());

        // ── Step 3: Invoke model under a deadline ────────────────────────
        let request = InvokeRequest {
            model_id: self.model_id.clone(),
            body: prompt,
            content_type: PROMPT_CONTENT_TYPE,
        };
        let response = tokio::time::timeout(self.inference_timeout, self.invoker.invoke(request))
            .await
            .map_err(|_| ExplainError::InferenceTimeout {
                model_id: self.model_id.clone(),
                timeout_ms: self.inference_timeout.as_millis() as u64,
            })??;

        Ok(Explanation {
            explanation: String::from_utf8_lossy(&response).into_owned(),
        })
    }
}
