use std::sync::Arc;

use meridian_llm::{EmbedFn, LlmProvider, Message};

use crate::error::IndexError;
use crate::indexer::ActiveIndex;
use crate::vector_store::{ScoredVectorPoint, VectorStore};

pub const DEFAULT_TOP_K: u64 = 4;

pub const ANSWER_SYSTEM_PROMPT: &str = "Answer ONLY from the provided context. If the answer \
cannot be found in the context, clearly state that you don't know.";

/// Retrieval-augmented answering over the active document index.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embed_fn: EmbedFn,
    top_k: u64,
}

impl Retriever {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, embed_fn: EmbedFn, top_k: u64) -> Self {
        Self {
            store,
            embed_fn,
            top_k: top_k.max(1),
        }
    }

    /// Nearest chunks to `query`, best first.
    ///
    /// # Errors
    ///
    /// Embedding and store failures are returned as transient errors.
    pub async fn retrieve(
        &self,
        index: &ActiveIndex,
        query: &str,
    ) -> Result<Vec<ScoredVectorPoint>, IndexError> {
        let vector = (self.embed_fn)(query)
            .await
            .map_err(IndexError::Embedding)?;
        let hits = self
            .store
            .search(&index.collection, vector, self.top_k)
            .await?;
        tracing::debug!(collection = %index.collection, hits = hits.len(), "retrieved chunks");
        Ok(hits)
    }

    /// Answer `query` strictly from the retrieved context.
    ///
    /// The LLM is not called when there is no index or nothing was retrieved.
    ///
    /// # Errors
    ///
    /// `NoDocumentIndexed` without usable context; transient errors for service failures.
    pub async fn answer<P: LlmProvider>(
        &self,
        llm: &P,
        index: Option<&ActiveIndex>,
        query: &str,
    ) -> Result<String, IndexError> {
        let Some(index) = index else {
            return Err(IndexError::NoDocumentIndexed);
        };
        let hits = self.retrieve(index, query).await?;
        let context = format_context(&hits);
        if context.is_empty() {
            return Err(IndexError::NoDocumentIndexed);
        }

        let messages = [
            Message::system(ANSWER_SYSTEM_PROMPT),
            Message::user(format!("Context:\n{context}\n\nQuestion: {query}")),
        ];
        llm.chat(&messages).await.map_err(IndexError::Llm)
    }
}

/// Join chunk texts with blank lines.
#[must_use]
pub fn format_context(hits: &[ScoredVectorPoint]) -> String {
    hits.iter()
        .filter_map(|h| h.text("content"))
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
