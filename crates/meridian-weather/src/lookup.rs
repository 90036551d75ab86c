use meridian_llm::LlmProvider;

use crate::client::WeatherClient;
use crate::error::WeatherError;
use crate::format::format_snapshot;
use crate::location::extract_location;
use crate::types::{Units, WeatherSnapshot};

/// Question-to-conditions pipeline: extract location, call the API.
#[derive(Debug)]
pub struct WeatherService {
    client: WeatherClient,
    default_units: Units,
}

impl WeatherService {
    #[must_use]
    pub fn new(client: WeatherClient, default_units: Units) -> Self {
        Self {
            client,
            default_units,
        }
    }

    /// Current conditions for the place named in `question`.
    ///
    /// # Errors
    ///
    /// `MissingApiKey` before any call when no key is configured, `MissingLocation` when
    /// no city can be identified, otherwise the client's error.
    pub async fn lookup<P: LlmProvider>(
        &self,
        llm: &P,
        question: &str,
    ) -> Result<WeatherSnapshot, WeatherError> {
        if !self.client.has_api_key() {
            return Err(WeatherError::MissingApiKey);
        }
        let query = extract_location(llm, question, self.default_units)
            .await
            .ok_or(WeatherError::MissingLocation)?;
        tracing::info!(location = %query.location(), "weather lookup");
        self.client.current(&query).await
    }

    /// [`lookup`](Self::lookup) rendered as answer text.
    ///
    /// # Errors
    ///
    /// See [`lookup`](Self::lookup).
    pub async fn answer<P: LlmProvider>(
        &self,
        llm: &P,
        question: &str,
    ) -> Result<String, WeatherError> {
        self.lookup(llm, question)
            .await
            .map(|snapshot| format_snapshot(&snapshot))
    }
}
