//! Per-turn state machine: route the query, run exactly one branch, render the answer.
//!
//! `Start -> Routed -> {DocumentAnswer | WeatherAnswer | FallbackAnswer} -> End`, one pass
//! per turn, no retries across states. Branch failures are rendered as user-facing text.

use std::sync::Arc;

use meridian_index::{ActiveIndex, DocumentSession, IndexOutcome, Retriever};
use meridian_llm::LlmProvider;
use meridian_weather::WeatherService;
use serde::Serialize;

use crate::error::AssistantError;
use crate::router::{QueryRouter, Route};

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub answer: String,
    pub branch: Route,
    /// Ordered notes recorded while the turn ran.
    pub steps: Vec<String>,
}

pub struct Orchestrator<P> {
    llm: P,
    router: QueryRouter,
    session: DocumentSession,
    retriever: Retriever,
    weather: WeatherService,
}

impl<P: LlmProvider> Orchestrator<P> {
    #[must_use]
    pub fn new(
        llm: P,
        router: QueryRouter,
        session: DocumentSession,
        retriever: Retriever,
        weather: WeatherService,
    ) -> Self {
        Self {
            llm,
            router,
            session,
            retriever,
            weather,
        }
    }

    #[must_use]
    pub fn active_document(&self) -> Option<Arc<ActiveIndex>> {
        self.session.active()
    }

    /// Reload the last-used document index, if still valid.
    pub async fn restore(&self) -> Option<Arc<ActiveIndex>> {
        self.session.restore().await
    }

    /// Index a document and make it the active one.
    ///
    /// # Errors
    ///
    /// `DocumentParse` for unreadable input, `TransientService` for embedding or store
    /// failures. The previous document stays active on error.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        name: &str,
        force_rebuild: bool,
    ) -> Result<IndexOutcome, AssistantError> {
        let outcome = self.session.upload(bytes, name, force_rebuild).await?;
        Ok(outcome)
    }

    /// Handle one user turn.
    pub async fn handle(&self, query: &str) -> TurnOutcome {
        let active = self.session.active();
        let mut steps = Vec::with_capacity(2);

        let decision = self
            .router
            .route(
                &self.llm,
                query,
                active.as_ref().and_then(|i| i.summary.as_deref()),
            )
            .await;
        steps.push(format!("routed:{}:{}", decision.route, decision.method));

        let result = match decision.route {
            Route::Document => self.document_answer(active.as_deref(), query).await,
            Route::Weather => self.weather_answer(query).await,
            Route::Unknown => Ok(fallback_message(active.as_deref())),
        };

        let answer = match result {
            Ok(answer) => {
                steps.push(format!("{}:answered", decision.route));
                answer
            }
            Err(e) => {
                if e.is_transient() {
                    tracing::warn!(branch = %decision.route, "turn failed: {e}");
                } else {
                    tracing::info!(branch = %decision.route, "turn ended without answer: {e}");
                }
                steps.push(format!("{}:{}", decision.route, e.kind()));
                e.user_message()
            }
        };

        tracing::info!(branch = %decision.route, steps = ?steps, "turn complete");
        TurnOutcome {
            answer,
            branch: decision.route,
            steps,
        }
    }

    async fn document_answer(
        &self,
        index: Option<&ActiveIndex>,
        query: &str,
    ) -> Result<String, AssistantError> {
        let answer = self.retriever.answer(&self.llm, index, query).await?;
        Ok(answer)
    }

    async fn weather_answer(&self, query: &str) -> Result<String, AssistantError> {
        let answer = self.weather.answer(&self.llm, query).await?;
        Ok(answer)
    }
}

/// Clarifying reply for queries neither branch handles.
#[must_use]
pub fn fallback_message(active: Option<&ActiveIndex>) -> String {
    let document = match active {
        Some(index) => format!("The document \"{}\" is loaded.", index.source),
        None => "No document is loaded yet.".to_owned(),
    };
    format!(
        "I can answer questions about an uploaded PDF document or report the current weather \
         for a city. {document} Please rephrase your question."
    )
}
