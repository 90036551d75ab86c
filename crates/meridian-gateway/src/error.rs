use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use meridian_core::AssistantError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),
    #[error("server error: {0}")]
    Server(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Assistant(#[from] AssistantError),
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Assistant(AssistantError::DocumentParse(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Assistant(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Assistant(_) | Self::Bind(..) | Self::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            Self::Assistant(e) => e.user_message(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(%status, "request failed: {self}");
        }
        (status, Json(ErrorBody { error })).into_response()
    }
}
