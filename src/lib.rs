//! # bedrock-explain
//!
//! An HTTP service that explains uploaded medical records in plain language.
//!
//! A client posts a PDF as `multipart/form-data`; the service pulls the text
//! out, asks a hosted LLM to explain it to a layman, and answers with
//! `{"explanation": "..."}`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /upload (multipart, part "file")
//!  │
//!  ├─ 1. Upload    stream the part into a scoped temp file
//!  ├─ 2. Extract   PDF → text via pdf-extract (spawn_blocking)
//!  ├─ 3. Prompt    "Explain this medical record to a layman:\n" + text
//!  ├─ 4. Infer     AWS Bedrock InvokeModel (text/plain), under a deadline
//!  ├─ 5. Cleanup   temp file removed on every exit path
//!  └─ 6. Respond   200 {"explanation"} | 400 {"error": reason} | 500 {"error": "Something went wrong"}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bedrock_explain::pipeline::extract::PdfTextExtractor;
//! use bedrock_explain::pipeline::inference::BedrockInvoker;
//! use bedrock_explain::{server, AppState, ExplainPipeline, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder().region("us-east-1").build()?;
//!     let invoker = BedrockInvoker::from_config(&config).await;
//!     let pipeline =
//!         ExplainPipeline::from_config(&config, Arc::new(PdfTextExtractor), Arc::new(invoker));
//!     let state = Arc::new(AppState::new(pipeline, config.upload_dir()));
//!     server::run(&config, state).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `explain-server` binary (clap + anyhow + tracing-subscriber + dotenvy) |
//! | `test-util` | off | Exposes `pipeline::mock` stub collaborators for integration tests |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AwsCredentials, InferenceBackend, ServerConfig, ServerConfigBuilder};
pub use error::{ErrorKind, ExplainError, GENERIC_ERROR_MESSAGE};
pub use pipeline::{ExplainPipeline, Explanation};
pub use server::{router, AppState};
