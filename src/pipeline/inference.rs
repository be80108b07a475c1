//! Model inference: prompt in, model response bytes out.
//!
//! [`ModelInvoker`] is the seam the pipeline calls. Two implementations ship:
//!
//! * [`BedrockInvoker`]: AWS Bedrock Runtime `InvokeModel`. The prompt is
//!   the entire request body, sent as `text/plain`, and the raw response
//!   body is handed back untouched.
//! * [`ProviderInvoker`]: any edgequake-llm provider (OpenAI, Anthropic,
//!   Gemini, Ollama, ...). The prompt becomes a single user message and the
//!   completion text is returned as bytes.
//!
//! Both are built once at startup and shared by every request. Neither
//! retries; a failed call fails the request. The deadline is applied by the
//! pipeline, not here.

use crate::config::ServerConfig;
use crate::error::ExplainError;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use edgequake_llm::{ChatMessage, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One inference call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    /// Model identifier, fixed for the process.
    pub model_id: String,
    /// Full request body (the prompt).
    pub body: String,
    /// MIME type of `body`.
    pub content_type: &'static str,
}

/// Sends a prompt to a model and returns the raw response body.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, request: InvokeRequest) -> Result<Vec<u8>, ExplainError>;
}

// ── Bedrock ──────────────────────────────────────────────────────────────

/// AWS Bedrock Runtime client.
#[derive(Debug, Clone)]
pub struct BedrockInvoker {
    client: Client,
}

impl BedrockInvoker {
    /// Wrap an already configured SDK client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the service configuration.
    ///
    /// Static credentials and region are used when present; anything left
    /// unset is resolved through the SDK's default provider chains.
    pub async fn from_config(config: &ServerConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(creds) = &config.credentials {
            loader = loader.credentials_provider(creds.to_sdk());
        }
        if let Some(endpoint) = &config.bedrock_endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config))
    }
}

#[async_trait]
impl ModelInvoker for BedrockInvoker {
    async fn invoke(&self, request: InvokeRequest) -> Result<Vec<u8>, ExplainError> {
        debug!(
            "Bedrock InvokeModel: model={} body={} bytes",
            request.model_id,
            request.body.len()
        );
        let output = self
            .client
            .invoke_model()
            .model_id(request.model_id.clone())
            .content_type(request.content_type)
            .body(Blob::new(request.body.into_bytes()))
            .send()
            .await
            .map_err(|e| ExplainError::Inference {
                model_id: request.model_id.clone(),
                detail: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(output.body.into_inner())
    }
}

// ── edgequake-llm providers ──────────────────────────────────────────────

/// Inference through an edgequake-llm provider.
///
/// The provider carries its own model, so `InvokeRequest::model_id` and
/// `content_type` are informational here.
#[derive(Clone)]
pub struct ProviderInvoker {
    provider: Arc<dyn LLMProvider>,
}

impl fmt::Debug for ProviderInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderInvoker")
            .field("provider", &"<dyn LLMProvider>")
            .finish()
    }
}

impl ProviderInvoker {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Instantiate a named provider (`openai`, `anthropic`, `gemini`, `ollama`, ...).
    ///
    /// The provider reads its API key from the environment.
    pub fn from_name(name: &str, model: &str) -> Result<Self, ExplainError> {
        ProviderFactory::create_llm_provider(name, model)
            .map(Self::new)
            .map_err(|e| ExplainError::InvalidConfig(format!("LLM provider '{name}': {e}")))
    }
}

#[async_trait]
impl ModelInvoker for ProviderInvoker {
    async fn invoke(&self, request: InvokeRequest) -> Result<Vec<u8>, ExplainError> {
        let messages = vec![ChatMessage::user(request.body)];
        let response = self
            .provider
            .chat(&messages, None)
            .await
            .map_err(|e| ExplainError::Inference {
                model_id: request.model_id.clone(),
                detail: e.to_string(),
            })?;
        debug!(
            "Provider completion: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content.into_bytes())
    }
}
