use meridian_llm::LlmError;

use crate::document::DocumentError;
use crate::vector_store::VectorStoreError;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    #[error("embedding failed: {0}")]
    Embedding(#[source] LlmError),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("vector store error: {0}")]
    Store(#[from] VectorStoreError),

    #[error("answer generation failed: {0}")]
    Llm(#[source] LlmError),

    #[error("no document indexed")]
    NoDocumentIndexed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IndexError {
    /// The uploaded document itself is at fault; retrying will not help.
    #[must_use]
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Document(_))
    }

    /// An external service (embeddings, LLM, vector store) failed; the caller may retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Embedding(_) | Self::Dimension { .. } | Self::Store(_) | Self::Llm(_)
        )
    }
}
