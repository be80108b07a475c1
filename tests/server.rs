//! HTTP integration tests for the explain service.
//!
//! Each test starts the real router on an ephemeral port with its own upload
//! directory, then talks to it over TCP with reqwest. Inference is always the
//! in-process mock, so no AWS credentials or network access are needed.
//!
//! Run with:
//!   cargo test --test server -- --nocapture

use bedrock_explain::pipeline::extract::{PdfTextExtractor, TextExtractor};
use bedrock_explain::pipeline::mock::{MockExtractor, MockInvoker};
use bedrock_explain::{router, AppState, ExplainPipeline, Explanation};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

const MAX_UPLOAD: usize = 1024 * 1024;

struct TestServer {
    addr: SocketAddr,
    upload_dir: TempDir,
    client: reqwest::Client,
}

impl TestServer {
    async fn start(extractor: Arc<dyn TextExtractor>, invoker: Arc<MockInvoker>) -> Self {
        Self::start_with_limit(extractor, invoker, MAX_UPLOAD).await
    }

    async fn start_with_limit(
        extractor: Arc<dyn TextExtractor>,
        invoker: Arc<MockInvoker>,
        max_upload_bytes: usize,
    ) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let pipeline =
            ExplainPipeline::new(extractor, invoker, "llama-maveric", Duration::from_secs(5));
        let state = Arc::new(AppState::new(pipeline, upload_dir.path()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state, max_upload_bytes);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            upload_dir,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self) -> String {
        format!("http://{}/upload", self.addr)
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> (StatusCode, Value) {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .unwrap();
        self.send(Form::new().part("file", part)).await
    }

    async fn send(&self, form: Form) -> (StatusCode, Value) {
        let resp = self.client.post(self.url()).multipart(form).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    fn assert_no_leftovers(&self) {
        assert_dir_empty(self.upload_dir.path());
    }
}

fn assert_dir_empty(dir: &Path) {
    let left: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert!(left.is_empty(), "temp files left behind: {left:?}");
}

fn generic_error() -> Value {
    json!({ "error": "Something went wrong" })
}

/// One-page PDF with `text` drawn in Courier.
fn one_page_pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

// ── Success path ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn explains_uploaded_record() {
    let invoker = Arc::new(MockInvoker::responding(
        "This means your blood pressure is a little high.",
    ));
    let server = TestServer::start(
        Arc::new(MockExtractor::text("Patient has mild hypertension.")),
        Arc::clone(&invoker),
    )
    .await;

    let (status, body) = server.upload("record.pdf", b"%PDF-1.4 stub".to_vec()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "explanation": "This means your blood pressure is a little high." })
    );
    let requests = invoker.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].body,
        "Explain this medical record to a layman:\nPatient has mild hypertension."
    );
    assert_eq!(requests[0].model_id, "llama-maveric");
    server.assert_no_leftovers();
}

#[tokio::test]
async fn real_pdf_text_reaches_the_model() {
    let invoker = Arc::new(MockInvoker::responding("Your cholesterol is fine."));
    let server = TestServer::start(Arc::new(PdfTextExtractor), Arc::clone(&invoker)).await;

    let (status, body) = server
        .upload("labs.pdf", one_page_pdf("LDL 95 mg/dL within range"))
        .await;

    assert_eq!(status, StatusCode::OK);
    let explanation: Explanation = serde_json::from_value(body).unwrap();
    assert_eq!(explanation.explanation, "Your cholesterol is fine.");

    let prompt = &invoker.requests()[0].body;
    assert!(prompt.starts_with("Explain this medical record to a layman:\n"));
    assert!(prompt.contains("LDL 95 mg/dL within range"), "got: {prompt:?}");
    server.assert_no_leftovers();
}

#[tokio::test]
async fn repeated_uploads_get_identical_answers() {
    let invoker = Arc::new(MockInvoker::responding("same answer"));
    let server =
        TestServer::start(Arc::new(MockExtractor::text("same text")), Arc::clone(&invoker)).await;

    let first = server.upload("a.pdf", b"%PDF-1.4 a".to_vec()).await;
    let second = server.upload("a.pdf", b"%PDF-1.4 a".to_vec()).await;

    assert_eq!(first, second);
    assert_eq!(invoker.call_count(), 2);
    server.assert_no_leftovers();
}

#[tokio::test]
async fn concurrent_uploads_are_independent() {
    let invoker = Arc::new(MockInvoker::responding("ok").with_delay(Duration::from_millis(50)));
    let server =
        TestServer::start(Arc::new(MockExtractor::text("text")), Arc::clone(&invoker)).await;

    let (a, b, c) = tokio::join!(
        server.upload("a.pdf", b"%PDF a".to_vec()),
        server.upload("b.pdf", b"%PDF b".to_vec()),
        server.upload("c.pdf", b"%PDF c".to_vec()),
    );

    for (status, body) in [a, b, c] {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "explanation": "ok" }));
    }
    assert_eq!(invoker.call_count(), 3);
    server.assert_no_leftovers();
}

#[tokio::test]
async fn extra_form_fields_are_ignored() {
    let invoker = Arc::new(MockInvoker::responding("fine"));
    let server =
        TestServer::start(Arc::new(MockExtractor::text("text")), Arc::clone(&invoker)).await;

    let form = Form::new()
        .text("patient", "anonymous")
        .part("file", Part::bytes(b"%PDF x".to_vec()).file_name("x.pdf"))
        .text("note", "after the file");
    let (status, body) = server.send(form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "explanation": "fine" }));
    server.assert_no_leftovers();
}

// ── Collaborator failures → 500 ──────────────────────────────────────────────

#[tokio::test]
async fn extraction_failure_returns_generic_500() {
    let invoker = Arc::new(MockInvoker::responding("unused"));
    let server = TestServer::start(
        Arc::new(MockExtractor::failing("not a PDF")),
        Arc::clone(&invoker),
    )
    .await;

    let (status, body) = server.upload("notes.txt", b"plain text".to_vec()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, generic_error());
    assert_eq!(invoker.call_count(), 0);
    server.assert_no_leftovers();
}

#[tokio::test]
async fn non_pdf_bytes_with_real_extractor_return_500() {
    let invoker = Arc::new(MockInvoker::responding("unused"));
    let server = TestServer::start(Arc::new(PdfTextExtractor), Arc::clone(&invoker)).await;

    let (status, body) = server
        .upload("photo.pdf", vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a])
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, generic_error());
    assert_eq!(invoker.call_count(), 0);
    server.assert_no_leftovers();
}

#[tokio::test]
async fn inference_failure_returns_generic_500() {
    let server = TestServer::start(
        Arc::new(MockExtractor::text("text")),
        Arc::new(MockInvoker::failing(
            "AccessDeniedException: not authorized to invoke model",
        )),
    )
    .await;

    let (status, body) = server.upload("record.pdf", b"%PDF-1.4".to_vec()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, generic_error());
    let text = body.to_string();
    assert!(!text.contains("AccessDenied"), "leaked detail: {text}");
    server.assert_no_leftovers();
}

// ── Bad requests → 400 ───────────────────────────────────────────────────────

#[tokio::test]
async fn missing_file_part_returns_400() {
    let invoker = Arc::new(MockInvoker::responding("unused"));
    let server =
        TestServer::start(Arc::new(MockExtractor::text("text")), Arc::clone(&invoker)).await;

    let (status, body) = server.send(Form::new().text("document", "oops")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let msg = body["error"].as_str().unwrap();
    assert!(msg.contains("No file uploaded"), "got: {msg}");
    assert_eq!(invoker.call_count(), 0);
    server.assert_no_leftovers();
}

#[tokio::test]
async fn empty_file_returns_400() {
    let invoker = Arc::new(MockInvoker::responding("unused"));
    let server =
        TestServer::start(Arc::new(MockExtractor::text("text")), Arc::clone(&invoker)).await;

    let (status, body) = server.upload("empty.pdf", Vec::new()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty.pdf"));
    assert_eq!(invoker.call_count(), 0);
    server.assert_no_leftovers();
}

#[tokio::test]
async fn non_multipart_body_returns_400() {
    let server = TestServer::start(
        Arc::new(MockExtractor::text("text")),
        Arc::new(MockInvoker::responding("unused")),
    )
    .await;

    let resp = server
        .client
        .post(server.url())
        .header("content-type", "text/plain")
        .body("just some text")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
    server.assert_no_leftovers();
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let invoker = Arc::new(MockInvoker::responding("unused"));
    let server = TestServer::start_with_limit(
        Arc::new(MockExtractor::text("text")),
        Arc::clone(&invoker),
        1024,
    )
    .await;

    let (status, body) = server.upload("big.pdf", vec![b'x'; 8 * 1024]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(invoker.call_count(), 0);
    server.assert_no_leftovers();
}

#[tokio::test]
async fn get_is_not_routed() {
    let server = TestServer::start(
        Arc::new(MockExtractor::text("text")),
        Arc::new(MockInvoker::responding("unused")),
    )
    .await;

    let resp = server.client.get(server.url()).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}
