use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use meridian_core::TurnOutcome;

use super::error::GatewayError;
use super::server::AppState;

const DEFAULT_UPLOAD_NAME: &str = "upload.pdf";

#[derive(serde::Deserialize)]
pub(crate) struct UploadParams {
    pub name: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub(crate) struct UploadResponse {
    pub status: String,
    pub source: String,
    pub chunks: usize,
    pub cached: bool,
}

#[derive(serde::Deserialize)]
pub(crate) struct QueryRequest {
    pub question: String,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    document: Option<String>,
}

pub(crate) async fn upload_handler(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<UploadResponse>, GatewayError> {
    if body.is_empty() {
        return Err(GatewayError::BadRequest("request body is empty".into()));
    }
    let name = params
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_UPLOAD_NAME);

    tracing::info!(name, bytes = body.len(), "upload received");
    let outcome = state
        .orchestrator
        .upload(body.to_vec(), name, params.force)
        .await?;

    Ok(Json(UploadResponse {
        status: if outcome.cached { "cached" } else { "indexed" }.to_owned(),
        source: outcome.index.source,
        chunks: outcome.index.chunk_count,
        cached: outcome.cached,
    }))
}

pub(crate) async fn query_handler(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<TurnOutcome>, GatewayError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(GatewayError::BadRequest("question must not be empty".into()));
    }
    Ok(Json(state.orchestrator.handle(question).await))
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        document: state
            .orchestrator
            .active_document()
            .map(|index| index.source.clone()),
    })
}
