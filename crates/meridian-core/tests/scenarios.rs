use std::sync::Arc;

use meridian_core::bootstrap::build_orchestrator;
use meridian_core::error::NO_DOCUMENT_MESSAGE;
use meridian_core::{Config, Orchestrator, Route, Secret};
use meridian_index::{LocalVectorStore, VectorStore};
use meridian_llm::AnyProvider;
use meridian_llm::mock::MockProvider;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    orchestrator: Orchestrator<AnyProvider>,
    llm: MockProvider,
    weather: MockServer,
    _dir: tempfile::TempDir,
}

async fn fixture(replies: &[&str]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let weather = MockServer::start().await;

    let mut config = Config::default();
    config.index.root = dir.path().display().to_string();
    config.index.summarize = false;
    config.index.chunk_size = 200;
    config.index.chunk_overlap = 20;
    config.weather.base_url = weather.uri();
    config.secrets.openweather_api_key = Some(Secret::new("test-key"));

    let llm = MockProvider::with_responses(replies.iter().map(|r| (*r).to_owned()).collect())
        .with_hashed_embeddings(64);
    let store: Arc<dyn VectorStore> = Arc::new(LocalVectorStore::open(dir.path()));
    let orchestrator =
        build_orchestrator(&config, AnyProvider::Mock(llm.clone()), store).unwrap();

    Fixture {
        orchestrator,
        llm,
        weather,
        _dir: dir,
    }
}

async fn mount_paris(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Paris",
            "main": {"temp": 18, "feels_like": 17, "humidity": 65},
            "weather": [{"id": 804, "description": "cloudy"}],
            "wind": {"speed": 4.1}
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn weather_query_runs_only_weather_branch() {
    let f = fixture(&[r#"{"city": "Paris", "state": null}"#]).await;
    mount_paris(&f.weather, 1).await;

    let turn = f
        .orchestrator
        .handle("What's the weather like in Paris right now?")
        .await;

    assert_eq!(turn.branch, Route::Weather);
    assert!(turn.answer.contains("18"));
    assert!(turn.answer.to_lowercase().contains("cloudy"));
    assert_eq!(turn.steps, ["routed:weather:keyword", "weather:answered"]);
    assert_eq!(f.llm.embed_calls(), 0);
    assert_eq!(f.llm.chat_calls(), 1);
}

#[tokio::test]
async fn document_query_runs_only_document_branch() {
    let f = fixture(&["document", "The sky is blue."]).await;
    mount_paris(&f.weather, 0).await;

    f.orchestrator
        .upload(b"The sky is blue.".to_vec(), "sample.txt", false)
        .await
        .unwrap();
    let turn = f.orchestrator.handle("What color is the sky?").await;

    assert_eq!(turn.branch, Route::Document);
    assert!(turn.answer.contains("blue"));
    assert_eq!(turn.steps, ["routed:document:llm", "document:answered"]);
    let prompt = &f.llm.history()[1][1].content;
    assert!(prompt.contains("The sky is blue."));
}

#[tokio::test]
async fn document_query_without_document_returns_sentinel() {
    let f = fixture(&["document"]).await;

    let turn = f.orchestrator.handle("Summarise chapter one").await;

    assert_eq!(turn.branch, Route::Document);
    assert_eq!(turn.answer, NO_DOCUMENT_MESSAGE);
    assert_eq!(turn.steps, ["routed:document:llm", "document:no_document"]);
    assert_eq!(f.llm.chat_calls(), 1);
    assert_eq!(f.llm.embed_calls(), 0);
}

#[tokio::test]
async fn reupload_answers_from_new_document_only() {
    let f = fixture(&["document", "Submarines."]).await;

    f.orchestrator
        .upload(
            b"Apples grow in the orchard every autumn.".to_vec(),
            "apples.txt",
            false,
        )
        .await
        .unwrap();
    f.orchestrator
        .upload(
            b"Submarines dive beneath the ocean.".to_vec(),
            "subs.txt",
            false,
        )
        .await
        .unwrap();

    let turn = f.orchestrator.handle("Where do apples grow?").await;
    assert_eq!(turn.branch, Route::Document);
    let prompt = &f.llm.history()[1][1].content;
    assert!(prompt.contains("Submarines"));
    assert!(!prompt.contains("Apples"));
    assert_eq!(
        f.orchestrator.active_document().unwrap().source,
        "subs.txt"
    );
}

#[tokio::test]
async fn gibberish_gets_fallback_with_single_llm_call() {
    let f = fixture(&["unknown"]).await;
    mount_paris(&f.weather, 0).await;

    let turn = f.orchestrator.handle("blorp zx qq").await;

    assert_eq!(turn.branch, Route::Unknown);
    assert!(turn.answer.contains("PDF"));
    assert!(turn.answer.contains("No document is loaded"));
    assert_eq!(turn.steps, ["routed:unknown:llm", "unknown:answered"]);
    assert_eq!(f.llm.chat_calls(), 1);
    assert_eq!(f.llm.embed_calls(), 0);
}

#[tokio::test]
async fn unparseable_classifier_reply_falls_back() {
    let f = fixture(&["hmm, hard to say"]).await;
    let turn = f.orchestrator.handle("tell me something").await;
    assert_eq!(turn.branch, Route::Unknown);
    assert_eq!(turn.steps[0], "routed:unknown:fallback");
}

#[tokio::test]
async fn weather_outage_is_reported_not_raised() {
    let f = fixture(&[r#"{"city": "Paris"}"#]).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&f.weather)
        .await;

    let turn = f.orchestrator.handle("forecast for Paris").await;

    assert_eq!(turn.branch, Route::Weather);
    assert!(turn.answer.contains("temporarily unavailable"));
    assert_eq!(turn.steps[1], "weather:transient_service");
}

#[tokio::test]
async fn invalid_upload_keeps_previous_document() {
    let f = fixture(&[]).await;
    f.orchestrator
        .upload(b"Valid notes.".to_vec(), "notes.txt", false)
        .await
        .unwrap();

    let err = f
        .orchestrator
        .upload(b"%PDF-1.4 truncated".to_vec(), "broken.pdf", false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        meridian_core::AssistantError::DocumentParse(_)
    ));
    assert_eq!(
        f.orchestrator.active_document().unwrap().source,
        "notes.txt"
    );
}
