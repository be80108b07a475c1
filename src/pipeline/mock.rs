//! Mock collaborators for testing.
//!
//! [`MockExtractor`] and [`MockInvoker`] stand in for the PDF parser and the
//! model endpoint so the pipeline and the HTTP layer can be exercised without
//! real documents or cloud credentials. Both record what they were called
//! with.

use super::extract::TextExtractor;
use super::inference::{InvokeRequest, ModelInvoker};
use crate::error::ExplainError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Canned outcome for a mock call.
#[derive(Clone, Debug)]
pub enum MockOutcome {
    /// Succeed with this text.
    Ok(String),
    /// Fail with this detail.
    Fail(String),
}

/// A [`TextExtractor`] that returns a fixed result.
#[derive(Debug)]
pub struct MockExtractor {
    outcome: MockOutcome,
    inputs: Mutex<Vec<Vec<u8>>>,
}

impl MockExtractor {
    /// Always extract `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::Ok(text.into()))
    }

    /// Always fail as if the document were unreadable.
    pub fn failing(detail: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::Fail(detail.into()))
    }

    fn with_outcome(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Every byte buffer received so far, in call order.
    pub fn inputs(&self) -> Vec<Vec<u8>> {
        self.inputs
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextExtractor for MockExtractor {
    async fn extract(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ExplainError> {
        if let Ok(mut inputs) = self.inputs.lock() {
            inputs.push(bytes);
        }
        match &self.outcome {
            MockOutcome::Ok(text) => Ok(text.clone()),
            MockOutcome::Fail(detail) => Err(ExplainError::Extraction {
                filename: file_name.to_string(),
                detail: detail.clone(),
            }),
        }
    }
}

/// A [`ModelInvoker`] that returns a fixed response.
///
/// Supports optional per-call latency (for deadline tests) and records every
/// request it receives.
#[derive(Debug)]
pub struct MockInvoker {
    outcome: MockOutcome,
    delay: Option<Duration>,
    requests: Mutex<Vec<InvokeRequest>>,
    call_count: AtomicUsize,
}

impl MockInvoker {
    /// Always answer with `response`.
    pub fn responding(response: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::Ok(response.into()))
    }

    /// Always fail as if the endpoint rejected the call.
    pub fn failing(detail: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::Fail(detail.into()))
    }

    fn with_outcome(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            delay: None,
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<InvokeRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ModelInvoker for MockInvoker {
    async fn invoke(&self, request: InvokeRequest) -> Result<Vec<u8>, ExplainError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let model_id = request.model_id.clone();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.outcome {
            MockOutcome::Ok(text) => Ok(text.clone().into_bytes()),
            MockOutcome::Fail(detail) => Err(ExplainError::Inference {
                model_id,
                detail: detail.clone(),
            }),
        }
    }
}
