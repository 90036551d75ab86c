use meridian_index::IndexError;
use meridian_weather::WeatherError;

pub const NO_DOCUMENT_MESSAGE: &str =
    "No document loaded. Upload a PDF first, then ask about its contents.";

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("document could not be parsed: {0}")]
    DocumentParse(String),

    #[error("service temporarily unavailable: {0}")]
    TransientService(String),

    #[error("classifier reply did not match a known route: {0:?}")]
    ClassificationAmbiguous(String),

    #[error("no document indexed")]
    NoDocumentIndexed,

    #[error("weather lookup failed: {0}")]
    Weather(WeatherError),
}

impl From<IndexError> for AssistantError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::NoDocumentIndexed => Self::NoDocumentIndexed,
            e if e.is_parse() => Self::DocumentParse(e.to_string()),
            e => Self::TransientService(e.to_string()),
        }
    }
}

impl From<WeatherError> for AssistantError {
    fn from(e: WeatherError) -> Self {
        if e.is_transient() {
            Self::TransientService(e.to_string())
        } else {
            Self::Weather(e)
        }
    }
}

impl AssistantError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientService(_))
    }

    /// Short label used in turn step notes and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DocumentParse(_) => "document_parse",
            Self::TransientService(_) => "transient_service",
            Self::ClassificationAmbiguous(_) => "classification_ambiguous",
            Self::NoDocumentIndexed => "no_document",
            Self::Weather(_) => "weather",
        }
    }

    /// Text shown to the user in place of an answer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::DocumentParse(detail) => {
                format!("The document could not be read ({detail}). Please upload a valid PDF.")
            }
            Self::TransientService(_) => {
                "A backing service is temporarily unavailable. Please try again shortly.".into()
            }
            Self::ClassificationAmbiguous(_) => {
                "I couldn't tell what you are asking about. Please rephrase your question.".into()
            }
            Self::NoDocumentIndexed => NO_DOCUMENT_MESSAGE.into(),
            Self::Weather(e) => match e {
                WeatherError::MissingApiKey => {
                    "Weather lookup is not configured: the OpenWeather API key is missing.".into()
                }
                WeatherError::MissingLocation => {
                    "Which city would you like the weather for?".into()
                }
                WeatherError::UnknownCity(city) => {
                    format!("I couldn't find a city named \"{city}\". Please check the spelling.")
                }
                WeatherError::InvalidApiKey => {
                    "The weather service rejected the configured API key.".into()
                }
                _ => "The weather service returned an unexpected response.".into(),
            },
        }
    }
}
