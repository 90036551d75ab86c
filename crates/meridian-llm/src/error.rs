#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited")]
    RateLimited,

    #[error("provider unavailable")]
    Unavailable,

    #[error("{provider} API request failed (status {status})")]
    Status { provider: String, status: u16 },

    #[error("empty response from {provider}")]
    EmptyResponse { provider: String },

    #[error("embedding not supported by {provider}")]
    EmbedUnsupported { provider: String },

    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Whether retrying the same request later may succeed.
    ///
    /// Client-side failures (4xx other than 429, unsupported embeddings) are permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited | Self::Unavailable | Self::EmptyResponse { .. } => {
                true
            }
            Self::Status { status, .. } => *status >= 500,
            Self::Json(_) | Self::EmbedUnsupported { .. } => false,
            Self::Other(_) => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_transient() {
        assert!(LlmError::RateLimited.is_transient());
        assert!(LlmError::Unavailable.is_transient());
    }

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        let server = LlmError::Status {
            provider: "openai".into(),
            status: 503,
        };
        let client = LlmError::Status {
            provider: "openai".into(),
            status: 400,
        };
        assert!(server.is_transient());
        assert!(!client.is_transient());
    }

    #[test]
    fn embed_unsupported_is_permanent() {
        let err = LlmError::EmbedUnsupported {
            provider: "mock".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "embedding not supported by mock");
    }
}
