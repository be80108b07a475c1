//! Configuration for the explain service.
//!
//! Everything the process reads at startup (listen address, AWS region and
//! credentials, model identifier, deadlines, upload limits) lives in one
//! [`ServerConfig`], built through [`ServerConfigBuilder`]. The binary maps
//! its CLI flags and environment variables onto the builder; tests build a
//! config directly.
//!
//! The config is constructed once and then only read. Request handlers never
//! see it; they get the pieces they need through [`crate::server::AppState`].

use crate::error::ExplainError;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Model identifier sent to Bedrock unless overridden at startup.
pub const DEFAULT_MODEL_ID: &str = "llama-maveric";

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Static AWS credentials, as read from `AWS_ACCESS_KEY_ID`,
/// `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: Option<SecretString>,
}

impl AwsCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
            session_token: session_token.map(SecretString::from),
        }
    }

    /// Convert to the credential type the AWS SDK expects.
    pub fn to_sdk(&self) -> aws_credential_types::Credentials {
        aws_credential_types::Credentials::new(
            self.access_key_id.clone(),
            self.secret_access_key.expose_secret().to_string(),
            self.session_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            None,
            "bedrock-explain",
        )
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Which collaborator answers inference calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InferenceBackend {
    /// AWS Bedrock Runtime `InvokeModel` with a plain-text body. (default)
    #[default]
    Bedrock,
    /// Any edgequake-llm provider, e.g. `openai` / `gpt-4.1-nano`.
    Provider { name: String, model: String },
}

/// Process-wide configuration for the explain service.
///
/// # Example
/// ```rust
/// use bedrock_explain::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .port(8080)
///     .region("us-east-1")
///     .inference_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.port, 8080);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind. Default: `0.0.0.0`.
    pub host: IpAddr,

    /// TCP port to listen on. Default: 3000. Port 0 asks the OS for a free port.
    pub port: u16,

    /// AWS region for the Bedrock client. If None, the SDK's region chain decides.
    pub region: Option<String>,

    /// Static credentials. If None, the SDK's default credential chain is used.
    pub credentials: Option<AwsCredentials>,

    /// Override for the Bedrock Runtime endpoint (VPC endpoints, local mocks).
    pub bedrock_endpoint: Option<String>,

    /// Model identifier passed to every inference call. Fixed for the process.
    pub model_id: String,

    /// Inference backend. Default: [`InferenceBackend::Bedrock`].
    pub backend: InferenceBackend,

    /// Deadline for a single inference call in seconds. Default: 60.
    ///
    /// A hung model call would otherwise hold the request open forever.
    pub inference_timeout_secs: u64,

    /// Largest accepted request body in bytes. Default: 25 MiB.
    pub max_upload_bytes: usize,

    /// Directory for per-request temporary files. If None, the system temp dir.
    pub upload_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            region: None,
            credentials: None,
            bedrock_endpoint: None,
            model_id: DEFAULT_MODEL_ID.to_string(),
            backend: InferenceBackend::default(),
            inference_timeout_secs: 60,
            max_upload_bytes: 25 * 1024 * 1024,
            upload_dir: None,
        }
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    /// The address the listener binds to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Directory where uploads are staged.
    pub fn upload_dir(&self) -> PathBuf {
        self.upload_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    pub fn credentials(mut self, credentials: AwsCredentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn bedrock_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.bedrock_endpoint = Some(url.into());
        self
    }

    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.config.model_id = model_id.into();
        self
    }

    pub fn backend(mut self, backend: InferenceBackend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn inference_timeout_secs(mut self, secs: u64) -> Self {
        self.config.inference_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, ExplainError> {
        let c = &self.config;
        if c.model_id.trim().is_empty() {
            return Err(ExplainError::InvalidConfig(
                "Model id must not be empty".into(),
            ));
        }
        if c.inference_timeout_secs == 0 {
            return Err(ExplainError::InvalidConfig(
                "Inference timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(ExplainError::InvalidConfig(
                "Max upload size must be ≥ 1 byte".into(),
            ));
        }
        if let Some(region) = &c.region {
            if region.trim().is_empty() {
                return Err(ExplainError::InvalidConfig(
                    "AWS region must not be empty when set".into(),
                ));
            }
        }
        if let InferenceBackend::Provider { name, model } = &c.backend {
            if name.is_empty() || model.is_empty() {
                return Err(ExplainError::InvalidConfig(format!(
                    "Provider backend needs a provider name and model, got '{name}' / '{model}'"
                )));
            }
        }
        Ok(self.config)
    }
}
