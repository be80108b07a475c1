//! HTTP surface: `POST /upload`.
//!
//! The handler is a thin shim: stage the upload, hand it to the
//! [`ExplainPipeline`], serialise the result. All failure handling funnels
//! through the [`IntoResponse`] impl for [`ExplainError`], which decides the
//! status code and keeps internal detail out of the response body.

use crate::config::ServerConfig;
use crate::error::{ErrorKind, ExplainError};
use crate::pipeline::upload::receive_upload;
use crate::pipeline::{ExplainPipeline, Explanation};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared state handed to every request. Read-only after startup.
#[derive(Debug)]
pub struct AppState {
    pub pipeline: ExplainPipeline,
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(pipeline: ExplainPipeline, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            upload_dir: upload_dir.into(),
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C / SIGTERM.
pub async fn run(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ExplainError> {
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ExplainError::Internal(format!("Failed to bind {addr}: {e}")))?;
    serve(listener, router(state, config.max_upload_bytes)).await
}

/// Serve `app` on an already bound listener until a shutdown signal arrives.
pub async fn serve(listener: TcpListener, app: Router) -> Result<(), ExplainError> {
    let addr = listener
        .local_addr()
        .map_err(|e| ExplainError::Internal(format!("Listener has no local address: {e}")))?;
    info!("Explain API running on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ExplainError::Internal(format!("Server error: {e}")))?;

    info!("Server stopped");
    Ok(())
}

async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Explanation>, ExplainError> {
    let multipart = multipart.map_err(|e| ExplainError::Upload {
        reason: e.body_text(),
    })?;
    let document = receive_upload(multipart, &state.upload_dir).await?;
    let explanation = state.pipeline.run(document).await?;
    Ok(Json(explanation))
}

impl IntoResponse for ExplainError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::BadRequest => {
                warn!("Rejected upload: {}", self);
                StatusCode::BAD_REQUEST
            }
            ErrorKind::Internal => {
                error!("Request failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
