use std::time::Duration;

use serde::Deserialize;

use crate::error::WeatherError;
use crate::types::{WeatherQuery, WeatherSnapshot};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// Client for the `OpenWeather` current-weather endpoint.
pub struct WeatherClient {
    http: reqwest::Client,
    api_key: Option<String>,
    /// Base URL of the API. Configurable for testing.
    base_url: String,
}

impl std::fmt::Debug for WeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct CurrentWeather {
    name: String,
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Option<Wind>,
}

#[derive(Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    humidity: u32,
}

#[derive(Deserialize)]
struct Condition {
    id: u32,
    description: String,
}

#[derive(Deserialize)]
struct Wind {
    speed: f64,
}

impl WeatherClient {
    #[must_use]
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            http: meridian_llm::http::default_client(timeout),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch current conditions for `query`.
    ///
    /// # Errors
    ///
    /// Returns a [`WeatherError`] describing the HTTP status or transport failure.
    pub async fn current(&self, query: &WeatherQuery) -> Result<WeatherSnapshot, WeatherError> {
        let Some(api_key) = &self.api_key else {
            return Err(WeatherError::MissingApiKey);
        };
        let location = query.location();
        let url = reqwest::Url::parse_with_params(
            &format!("{}/data/2.5/weather", self.base_url.trim_end_matches('/')),
            &[
                ("q", location.as_str()),
                ("appid", api_key.as_str()),
                ("units", query.units.as_str()),
            ],
        )
        .map_err(|e| WeatherError::Parse(format!("invalid weather API URL: {e}")))?;

        tracing::debug!(location, units = %query.units, "requesting current weather");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(WeatherError::network)?;

        let status = resp.status();
        match status.as_u16() {
            401 => return Err(WeatherError::InvalidApiKey),
            404 => return Err(WeatherError::UnknownCity(location)),
            429 => return Err(WeatherError::RateLimited),
            _ if !status.is_success() => return Err(WeatherError::Status(status.as_u16())),
            _ => {}
        }

        let bytes = read_capped(resp, MAX_RESPONSE_BYTES).await?;
        let body: CurrentWeather =
            serde_json::from_slice(&bytes).map_err(|e| WeatherError::Parse(e.to_string()))?;

        let (condition_code, description) = body
            .weather
            .into_iter()
            .next()
            .map_or((0, String::new()), |c| (c.id, c.description));

        Ok(WeatherSnapshot {
            city: body.name,
            temperature: body.main.temp,
            feels_like: body.main.feels_like,
            humidity: body.main.humidity,
            description,
            condition_code,
            wind_speed: body.wind.map_or(0.0, |w| w.speed),
            units: query.units,
        })
    }
}

async fn read_capped(
    mut resp: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, WeatherError> {
    let too_large = |len: u64| WeatherError::Parse(format!("response body too large ({len} bytes)"));
    if let Some(len) = resp.content_length()
        && len > limit as u64
    {
        return Err(too_large(len));
    }

    let mut body = Vec::new();
    while let Some(chunk) = resp.chunk().await.map_err(WeatherError::network)? {
        if body.len() + chunk.len() > limit {
            return Err(too_large((body.len() + chunk.len()) as u64));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
