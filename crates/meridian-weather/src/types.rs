use serde::{Deserialize, Serialize};

/// Unit system understood by the `OpenWeather` API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
            Self::Standard => "standard",
        }
    }

    #[must_use]
    pub fn temperature_symbol(self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
            Self::Standard => "K",
        }
    }

    #[must_use]
    pub fn speed_symbol(self) -> &'static str {
        match self {
            Self::Imperial => "mph",
            Self::Metric | Self::Standard => "m/s",
        }
    }

    /// Units explicitly requested in `text`, if any.
    #[must_use]
    pub fn mentioned_in(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if ["fahrenheit", "imperial", "°f"]
            .iter()
            .any(|k| lower.contains(k))
        {
            Some(Self::Imperial)
        } else if lower.contains("kelvin") {
            Some(Self::Standard)
        } else if ["celsius", "metric", "°c"].iter().any(|k| lower.contains(k)) {
            Some(Self::Metric)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    pub city: String,
    pub state: Option<String>,
    pub units: Units,
}

impl WeatherQuery {
    /// Value of the API `q` parameter: `city` or `city,state`.
    #[must_use]
    pub fn location(&self) -> String {
        match &self.state {
            Some(state) => format!("{},{state}", self.city),
            None => self.city.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u32,
    pub description: String,
    pub condition_code: u32,
    pub wind_speed: f64,
    pub units: Units,
}
