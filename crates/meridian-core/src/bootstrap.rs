//! Application bootstrap: config resolution, provider, store and orchestrator construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use meridian_index::document::SplitterConfig;
use meridian_index::{
    DocumentSession, Indexer, IndexerConfig, LlmSummarizer, LocalVectorStore, QdrantOps,
    Retriever, VectorStore,
};
use meridian_llm::any::AnyProvider;
use meridian_llm::ollama::OllamaProvider;
use meridian_llm::openai::OpenAiProvider;
use meridian_llm::provider::LlmProvider;
use meridian_weather::{WeatherClient, WeatherService};

use crate::config::{Config, ProviderKind, StoreKind};
use crate::orchestrator::Orchestrator;
use crate::router::QueryRouter;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Priority: explicit path (`--config`) > `MERIDIAN_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("MERIDIAN_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

pub struct AppBuilder {
    config: Config,
    config_path: PathBuf,
}

impl AppBuilder {
    /// Resolve and load config.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or invalid.
    pub fn from_cli(cli_path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = resolve_config_path(cli_path);
        let config = Config::load(&config_path)?;
        tracing::debug!(path = %config_path.display(), "configuration loaded");
        Ok(Self {
            config,
            config_path,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Build the provider, store and orchestrator, then restore the last document.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider or store cannot be constructed.
    pub async fn build(&self) -> anyhow::Result<Orchestrator<AnyProvider>> {
        let provider = create_provider(&self.config)?;
        health_check(&provider).await;
        let store = create_store(&self.config)?;
        let orchestrator = build_orchestrator(&self.config, provider, store)?;
        if let Some(index) = orchestrator.restore().await {
            tracing::info!(source = %index.source, chunks = index.chunk_count, "document restored");
        }
        Ok(orchestrator)
    }
}

/// # Errors
///
/// Returns an error if the selected provider is missing its config section or API key.
pub fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let timeout = Duration::from_secs(config.timeouts.llm_seconds);
    match config.llm.provider {
        ProviderKind::Ollama => Ok(AnyProvider::Ollama(OllamaProvider::new(
            &config.llm.base_url,
            config.llm.model.clone(),
            config.llm.embedding_model.clone(),
        ))),
        ProviderKind::OpenAi => {
            let openai = config
                .llm
                .openai
                .as_ref()
                .context("llm.openai config section required for openai provider")?;
            let api_key = config
                .secrets
                .openai_api_key
                .as_ref()
                .context("MERIDIAN_OPENAI_API_KEY is not set")?
                .expose()
                .to_owned();
            let provider = OpenAiProvider::new(
                api_key,
                openai.base_url.clone(),
                openai.model.clone(),
                openai.max_tokens,
                openai.embedding_model.clone(),
            )
            .with_client(meridian_llm::http::default_client(timeout))
            .with_temperature(openai.temperature);
            Ok(AnyProvider::OpenAi(provider))
        }
    }
}

pub async fn health_check(provider: &AnyProvider) {
    if let AnyProvider::Ollama(ollama) = provider {
        match ollama.health_check().await {
            Ok(()) => tracing::info!("ollama health check passed"),
            Err(e) => tracing::warn!("ollama health check failed: {e:#}"),
        }
    }
}

/// # Errors
///
/// Returns an error if the Qdrant client cannot be created.
pub fn create_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    match config.index.store {
        StoreKind::Local => {
            tracing::info!(root = %config.index.root, "using local vector store");
            Ok(Arc::new(LocalVectorStore::open(&config.index.root)))
        }
        StoreKind::Qdrant => {
            tracing::info!(url = %config.index.qdrant_url, "using qdrant vector store");
            let ops = QdrantOps::new(&config.index.qdrant_url)
                .map_err(|e| anyhow!("failed to create Qdrant client: {e}"))?;
            Ok(Arc::new(ops))
        }
    }
}

/// Wire the routing, document and weather components around `provider`.
///
/// # Errors
///
/// Returns an error if the provider cannot produce embeddings.
pub fn build_orchestrator(
    config: &Config,
    provider: AnyProvider,
    store: Arc<dyn VectorStore>,
) -> anyhow::Result<Orchestrator<AnyProvider>> {
    if !provider.supports_embeddings() {
        bail!(
            "provider {} has no embedding model configured; document answers need one",
            provider.name()
        );
    }

    let indexer = Indexer::new(
        Arc::clone(&store),
        Box::new(provider.embed_fn()),
        IndexerConfig {
            splitter: SplitterConfig {
                chunk_size: config.index.chunk_size,
                chunk_overlap: config.index.chunk_overlap,
            },
            max_file_size: config.index.max_file_size,
            embedding_model: config.effective_embedding_model(),
            index_root: Some(PathBuf::from(&config.index.root)),
        },
    );
    let mut session = DocumentSession::new(indexer);
    if config.index.summarize {
        session = session.with_summarizer(Box::new(LlmSummarizer::new(provider.clone())));
    }

    let retriever = Retriever::new(
        store,
        Box::new(provider.embed_fn()),
        config.retrieval.top_k,
    );

    let weather_client = WeatherClient::new(
        config
            .secrets
            .openweather_api_key
            .as_ref()
            .map(|s| s.expose().to_owned()),
        Duration::from_secs(config.timeouts.weather_seconds),
    )
    .with_base_url(config.weather.base_url.clone());
    if !weather_client.has_api_key() {
        tracing::warn!("MERIDIAN_OPENWEATHER_API_KEY is not set; weather answers are disabled");
    }
    let weather = WeatherService::new(weather_client, config.weather.units);

    let router = QueryRouter::new(config.router.keyword_shortcut, config.router.summary_chars);
    Ok(Orchestrator::new(
        provider, router, session, retriever, weather,
    ))
}
