//! HTTP server binary for bedrock-explain.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `ServerConfig`, builds the collaborators and serves.

use anyhow::{Context, Result};
use bedrock_explain::pipeline::extract::PdfTextExtractor;
use bedrock_explain::pipeline::inference::{BedrockInvoker, ModelInvoker, ProviderInvoker};
use bedrock_explain::{
    server, AppState, AwsCredentials, ExplainPipeline, InferenceBackend, ServerConfig,
};
use clap::Parser;
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default port with credentials from the environment / .env
  explain-server

  # Custom port and region
  explain-server --port 8080 --region us-west-2

  # Use an OpenAI model instead of Bedrock
  explain-server --backend provider --provider openai --provider-model gpt-4.1-nano

  # Explain a record
  curl -F file=@record.pdf http://localhost:3000/upload

ENVIRONMENT VARIABLES:
  PORT                       Listening port (default 3000)
  EXPLAIN_HOST               Interface to bind (default 0.0.0.0)
  AWS_REGION                 Bedrock region
  AWS_ACCESS_KEY_ID          Static credentials (falls back to the AWS default chain)
  AWS_SECRET_ACCESS_KEY
  AWS_SESSION_TOKEN
  RUST_LOG                   Overrides --verbose / --quiet

  A .env file in the working directory is loaded before parsing.
"#;

/// Explain uploaded medical records in plain language using a hosted LLM.
#[derive(Parser, Debug)]
#[command(
    name = "explain-server",
    version,
    about = "HTTP service: upload a PDF medical record, get a plain-language explanation",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// TCP port to listen on.
    #[arg(long, env = "PORT", default_value_t = bedrock_explain::config::DEFAULT_PORT)]
    port: u16,

    /// Interface to bind (an IP address, not a hostname).
    #[arg(long, env = "EXPLAIN_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// AWS region for Bedrock.
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// AWS access key id.
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: Option<String>,

    /// AWS secret access key.
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,

    /// AWS session token (temporary credentials).
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,

    /// Override the Bedrock Runtime endpoint URL.
    #[arg(long, env = "EXPLAIN_BEDROCK_ENDPOINT")]
    bedrock_endpoint: Option<String>,

    /// Model identifier sent with every inference call.
    #[arg(
        long,
        env = "EXPLAIN_MODEL_ID",
        default_value = bedrock_explain::config::DEFAULT_MODEL_ID
    )]
    model_id: String,

    /// Inference backend: bedrock or provider.
    #[arg(long, env = "EXPLAIN_BACKEND", value_enum, default_value = "bedrock")]
    backend: BackendArg,

    /// edgequake-llm provider name (openai, anthropic, gemini, ollama, ...).
    #[arg(long, env = "EXPLAIN_PROVIDER", required_if_eq("backend", "provider"))]
    provider: Option<String>,

    /// Model for the provider backend.
    #[arg(
        long,
        env = "EXPLAIN_PROVIDER_MODEL",
        required_if_eq("backend", "provider")
    )]
    provider_model: Option<String>,

    /// Per-call inference deadline in seconds.
    #[arg(long, env = "EXPLAIN_INFERENCE_TIMEOUT", default_value_t = 60)]
    inference_timeout: u64,

    /// Maximum upload size in MiB.
    #[arg(long, env = "EXPLAIN_MAX_UPLOAD_MB", default_value_t = 25)]
    max_upload_mb: usize,

    /// Directory for temporary upload files (default: system temp dir).
    #[arg(long, env = "EXPLAIN_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EXPLAIN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EXPLAIN_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Eq)]
enum BackendArg {
    Bedrock,
    Provider,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli).context("Invalid configuration")?;

    // ── Collaborators ────────────────────────────────────────────────────
    let invoker: Arc<dyn ModelInvoker> = match &config.backend {
        InferenceBackend::Bedrock => {
            if config.credentials.is_none() {
                info!("No static AWS credentials set; using the default credential chain");
            }
            Arc::new(BedrockInvoker::from_config(&config).await)
        }
        InferenceBackend::Provider { name, model } => Arc::new(
            ProviderInvoker::from_name(name, model)
                .with_context(|| format!("Failed to create LLM provider '{name}'"))?,
        ),
    };
    let pipeline = ExplainPipeline::from_config(&config, Arc::new(PdfTextExtractor), invoker);

    let upload_dir = config.upload_dir();
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", upload_dir.display()))?;

    info!(
        "Model '{}' via {:?}, inference timeout {}s, uploads in {}",
        config.model_id,
        config.backend,
        config.inference_timeout_secs,
        upload_dir.display()
    );

    // ── Serve ────────────────────────────────────────────────────────────
    let state = Arc::new(AppState::new(pipeline, upload_dir));
    server::run(&config, state).await.context("Server failed")?;
    Ok(())
}

/// Map CLI args to `ServerConfig`.
fn build_config(cli: &Cli) -> Result<ServerConfig> {
    let mut builder = ServerConfig::builder()
        .host(cli.host)
        .port(cli.port)
        .model_id(cli.model_id.clone())
        .inference_timeout_secs(cli.inference_timeout)
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024));

    if let Some(ref region) = cli.region {
        builder = builder.region(region.clone());
    }

    match (&cli.access_key_id, &cli.secret_access_key) {
        (Some(key), Some(secret)) => {
            builder = builder.credentials(AwsCredentials::new(
                key.clone(),
                secret.clone(),
                cli.session_token.clone(),
            ));
        }
        (None, None) => {}
        _ => warn!(
            "Only one of AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY is set; \
             ignoring both and using the default credential chain"
        ),
    }

    if let Some(ref endpoint) = cli.bedrock_endpoint {
        builder = builder.bedrock_endpoint(endpoint.clone());
    }

    if cli.backend == BackendArg::Provider {
        builder = builder.backend(InferenceBackend::Provider {
            name: cli.provider.clone().unwrap_or_default(),
            model: cli.provider_model.clone().unwrap_or_default(),
        });
    }

    if let Some(ref dir) = cli.upload_dir {
        builder = builder.upload_dir(dir.clone());
    }

    Ok(builder.build()?)
}
