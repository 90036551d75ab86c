//! Document indexing, vector stores and retrieval-augmented answering.

pub mod document;
pub mod error;
pub mod indexer;
pub mod local_store;
pub mod qdrant_ops;
pub mod retriever;
pub mod session;
pub mod summary;
pub mod vector_store;

pub use error::IndexError;
pub use indexer::{ActiveIndex, IndexOutcome, Indexer, IndexerConfig};
pub use local_store::LocalVectorStore;
pub use qdrant_ops::QdrantOps;
pub use retriever::Retriever;
pub use session::DocumentSession;
pub use summary::{DocumentSummarizer, LlmSummarizer};
pub use vector_store::{ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};
