use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use meridian_core::Config;
use meridian_core::bootstrap::build_orchestrator;
use meridian_gateway::{AppState, build_router};
use meridian_index::{LocalVectorStore, VectorStore};
use meridian_llm::AnyProvider;
use meridian_llm::mock::MockProvider;
use tower::ServiceExt;

struct Gateway {
    app: Router,
    llm: MockProvider,
    _dir: tempfile::TempDir,
}

fn gateway(replies: &[&str]) -> Gateway {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.index.root = dir.path().display().to_string();
    config.index.summarize = false;
    config.index.chunk_size = 200;
    config.index.chunk_overlap = 20;

    let llm = MockProvider::with_responses(replies.iter().map(|r| (*r).to_owned()).collect())
        .with_hashed_embeddings(32);
    let store: Arc<dyn VectorStore> = Arc::new(LocalVectorStore::open(dir.path()));
    let orchestrator = build_orchestrator(&config, AnyProvider::Mock(llm.clone()), store).unwrap();
    let app = build_router(
        AppState::new(Arc::new(orchestrator)),
        Some("token".into()),
        0,
        1_048_576,
    );
    Gateway {
        app,
        llm,
        _dir: dir,
    }
}

fn upload(name: &str, body: &'static [u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/upload?name={name}"))
        .header("authorization", "Bearer token")
        .header("content-type", "application/octet-stream")
        .body(Body::from(body))
        .unwrap()
}

fn query(question: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/query")
        .header("authorization", "Bearer token")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&serde_json::json!({ "question": question })).unwrap(),
        ))
        .unwrap()
}

async fn json(resp: axum::response::Response) -> serde_json::Value {
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn upload_then_query_answers_from_document() {
    let gw = gateway(&["document", "The sky is blue."]);

    let resp = gw
        .app
        .clone()
        .oneshot(upload("sample.txt", b"The sky is blue."))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(body["status"], "indexed");
    assert_eq!(body["source"], "sample.txt");
    assert_eq!(body["chunks"], 1);
    assert_eq!(body["cached"], false);

    let resp = gw
        .app
        .clone()
        .oneshot(query("What color is the sky?"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(body["branch"], "document");
    assert!(body["answer"].as_str().unwrap().contains("blue"));
    assert_eq!(body["steps"][0], "routed:document:llm");

    let resp = gw
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(json(resp).await["document"], "sample.txt");
    assert_eq!(gw.llm.chat_calls(), 2);
}

#[tokio::test]
async fn broken_pdf_is_unprocessable() {
    let gw = gateway(&[]);
    let resp = gw
        .app
        .oneshot(upload("broken.pdf", b"%PDF-1.4 truncated"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("valid PDF"));
}

#[tokio::test]
async fn empty_upload_is_bad_request() {
    let gw = gateway(&[]);
    let resp = gw.app.oneshot(upload("empty.pdf", b"")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_question_is_bad_request() {
    let gw = gateway(&[]);
    let resp = gw.app.oneshot(query("   ")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(gw.llm.chat_calls(), 0);
}

#[tokio::test]
async fn document_question_without_upload_returns_sentinel() {
    let gw = gateway(&["document"]);
    let resp = gw.app.oneshot(query("Summarise the report")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(
        body["answer"],
        meridian_core::error::NO_DOCUMENT_MESSAGE
    );
    assert_eq!(body["steps"][1], "document:no_document");
}
