#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather API key is not configured")]
    MissingApiKey,

    #[error("no location found in the question")]
    MissingLocation,

    #[error("city not found: {0}")]
    UnknownCity(String),

    #[error("weather API rejected the API key")]
    InvalidApiKey,

    #[error("weather API rate limit exceeded")]
    RateLimited,

    /// Transport failure. Built through [`WeatherError::network`], which drops the request
    /// URL because it carries the API key.
    #[error("weather API request failed: {0}")]
    Network(reqwest::Error),

    #[error("weather API returned HTTP {0}")]
    Status(u16),

    #[error("malformed weather payload: {0}")]
    Parse(String),
}

impl WeatherError {
    #[must_use]
    pub fn network(e: reqwest::Error) -> Self {
        Self::Network(e.without_url())
    }

    /// Whether retrying the same request later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited | Self::Network(_) => true,
            Self::Status(code) => *code >= 500,
            _ => false,
        }
    }
}
