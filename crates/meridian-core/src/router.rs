//! Query classification into a handling branch.

use meridian_index::summary::truncate_chars;
use meridian_llm::{LlmProvider, Message};
use serde::Serialize;

use crate::error::AssistantError;

pub const WEATHER_KEYWORDS: &[&str] = &[
    "weather",
    "temperature",
    "rain",
    "climate",
    "humidity",
    "forecast",
];

const CLASSIFIER_PROMPT: &str = "You are a query classifier. Decide which handler should answer \
the user's question. Reply with exactly one word:\n\
- document: the question is about the uploaded document\n\
- weather: the question asks about current weather or temperature somewhere\n\
- unknown: anything else";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Document,
    Weather,
    Unknown,
}

impl Route {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Weather => "weather",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a [`RouteDecision`] was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMethod {
    Keyword,
    Llm,
    Fallback,
}

impl std::fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Keyword => "keyword",
            Self::Llm => "llm",
            Self::Fallback => "fallback",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub route: Route,
    pub query: String,
    pub method: RouteMethod,
}

/// Map a free-form classifier reply to a route.
#[must_use]
pub fn parse_label(reply: &str) -> Option<Route> {
    let label = reply
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    match label.as_str() {
        "document" | "rag" | "doc" | "pdf" => Some(Route::Document),
        "weather" => Some(Route::Weather),
        "unknown" => Some(Route::Unknown),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct QueryRouter {
    keyword_shortcut: bool,
    summary_chars: usize,
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::new(true, 3000)
    }
}

impl QueryRouter {
    #[must_use]
    pub fn new(keyword_shortcut: bool, summary_chars: usize) -> Self {
        Self {
            keyword_shortcut,
            summary_chars,
        }
    }

    fn keyword_match(&self, query: &str) -> bool {
        if !self.keyword_shortcut {
            return false;
        }
        let lower = query.to_lowercase();
        WEATHER_KEYWORDS.iter().any(|k| lower.contains(k))
    }

    fn prompt(&self, summary: Option<&str>) -> String {
        match summary.filter(|s| !s.trim().is_empty()) {
            Some(summary) => format!(
                "{CLASSIFIER_PROMPT}\n\nThe uploaded document is about:\n{}",
                truncate_chars(summary, self.summary_chars)
            ),
            None => CLASSIFIER_PROMPT.to_owned(),
        }
    }

    /// Ask the model for a label.
    ///
    /// # Errors
    ///
    /// `TransientService` when the model call fails, `ClassificationAmbiguous` when the
    /// reply is not a known label.
    pub async fn classify<P: LlmProvider>(
        &self,
        llm: &P,
        query: &str,
        summary: Option<&str>,
    ) -> Result<Route, AssistantError> {
        let messages = [Message::system(self.prompt(summary)), Message::user(query)];
        let reply = llm
            .chat(&messages)
            .await
            .map_err(|e| AssistantError::TransientService(e.to_string()))?;
        parse_label(&reply).ok_or(AssistantError::ClassificationAmbiguous(reply))
    }

    /// Classify `query`. Never fails: unusable replies and model errors become `Unknown`.
    pub async fn route<P: LlmProvider>(
        &self,
        llm: &P,
        query: &str,
        summary: Option<&str>,
    ) -> RouteDecision {
        let (route, method) = if self.keyword_match(query) {
            (Route::Weather, RouteMethod::Keyword)
        } else {
            match self.classify(llm, query, summary).await {
                Ok(route) => (route, RouteMethod::Llm),
                Err(e) => {
                    tracing::warn!("routing degraded to unknown: {e}");
                    (Route::Unknown, RouteMethod::Fallback)
                }
            }
        };
        tracing::debug!(%route, %method, "query routed");
        RouteDecision {
            route,
            query: query.to_owned(),
            method,
        }
    }
}
