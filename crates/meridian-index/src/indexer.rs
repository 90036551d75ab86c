use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use meridian_llm::EmbedFn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{
    self, Chunk, DEFAULT_MAX_FILE_SIZE, Document, SplitterConfig, TextSplitter,
};
use crate::error::IndexError;
use crate::local_store::write_atomic;
use crate::summary::DocumentSummarizer;
use crate::vector_store::{VectorPoint, VectorStore};

pub const META_FILE: &str = "meta.json";
pub const INDEX_FORMAT: &str = "v2";
const COLLECTION_PREFIX: &str = "doc_";
const COLLECTION_HASH_LEN: usize = 24;
const ALTERNATE_SUFFIX: &str = "_b";

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub splitter: SplitterConfig,
    pub max_file_size: u64,
    pub embedding_model: String,
    /// Directory holding `<collection>/meta.json`. `None` disables index reuse.
    pub index_root: Option<PathBuf>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            splitter: SplitterConfig::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            embedding_model: String::new(),
            index_root: None,
        }
    }
}

/// Description of a built collection; persisted as `meta.json` next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveIndex {
    pub collection: String,
    pub fingerprint: String,
    pub source: String,
    pub size: u64,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_model: String,
    pub format: String,
    pub chunk_count: usize,
    pub dimension: usize,
    #[serde(default)]
    pub summary: Option<String>,
}

impl ActiveIndex {
    pub(crate) fn reusable_for(&self, fingerprint: &str, config: &IndexerConfig) -> bool {
        self.format == INDEX_FORMAT
            && self.fingerprint == fingerprint
            && self.chunk_size == config.splitter.chunk_size
            && self.chunk_overlap == config.splitter.chunk_overlap
            && self.embedding_model == config.embedding_model
    }
}

#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub index: ActiveIndex,
    /// True when an existing collection was reused without re-embedding.
    pub cached: bool,
}

/// Collection name for a document: `doc_` plus the first 24 hex chars of its fingerprint.
#[must_use]
pub fn collection_name(fingerprint: &str) -> String {
    let end = fingerprint.len().min(COLLECTION_HASH_LEN);
    format!("{COLLECTION_PREFIX}{}", &fingerprint[..end])
}

/// Both collection names a document may occupy. A rebuild of the document that is
/// currently being served goes to the slot it does not use.
fn collection_slots(fingerprint: &str) -> [String; 2] {
    let primary = collection_name(fingerprint);
    let alternate = format!("{primary}{ALTERNATE_SUFFIX}");
    [primary, alternate]
}

/// Deterministic point id for chunk `index` of the document with `fingerprint`.
#[must_use]
pub fn chunk_id(fingerprint: &str, index: usize) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{fingerprint}:{index}").as_bytes(),
    )
    .to_string()
}

/// Load -> split -> embed -> store pipeline with `meta.json` reuse.
pub struct Indexer {
    store: Arc<dyn VectorStore>,
    embed_fn: EmbedFn,
    splitter: TextSplitter,
    config: IndexerConfig,
}

impl Indexer {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, embed_fn: EmbedFn, config: IndexerConfig) -> Self {
        Self {
            store,
            embed_fn,
            splitter: TextSplitter::new(config.splitter),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Index a document, reusing a matching existing collection unless `force_rebuild`.
    ///
    /// # Errors
    ///
    /// `Document` errors for unreadable input; embedding and store errors are transient.
    pub async fn index(
        &self,
        bytes: Vec<u8>,
        source: &str,
        force_rebuild: bool,
        summarizer: Option<&dyn DocumentSummarizer>,
    ) -> Result<IndexOutcome, IndexError> {
        self.index_beside(bytes, source, force_rebuild, summarizer, None)
            .await
    }

    /// Like [`Indexer::index`], but never deletes or writes `in_use`. A rebuild that
    /// would target `in_use` is built into the document's other collection slot.
    ///
    /// # Errors
    ///
    /// `Document` errors for unreadable input; embedding and store errors are transient.
    /// A partially built collection is dropped before the error is returned.
    pub async fn index_beside(
        &self,
        bytes: Vec<u8>,
        source: &str,
        force_rebuild: bool,
        summarizer: Option<&dyn DocumentSummarizer>,
        in_use: Option<&str>,
    ) -> Result<IndexOutcome, IndexError> {
        let size = bytes.len() as u64;
        if size > self.config.max_file_size {
            return Err(document::DocumentError::FileTooLarge(size).into());
        }
        let fingerprint = document::fingerprint(&bytes);
        let slots = collection_slots(&fingerprint);

        if !force_rebuild {
            for slot in &slots {
                if let Some(index) = self.reusable(&fingerprint, slot).await? {
                    tracing::info!(
                        collection = %index.collection,
                        chunks = index.chunk_count,
                        "reusing existing index"
                    );
                    let index = ActiveIndex {
                        source: source.to_owned(),
                        ..index
                    };
                    return Ok(IndexOutcome {
                        index,
                        cached: true,
                    });
                }
            }
        }

        let document = document::load_document(source, bytes, self.config.max_file_size).await?;
        let chunks = self.splitter.split(&document);
        if chunks.is_empty() {
            return Err(document::DocumentError::NoText.into());
        }
        tracing::info!(source, chunks = chunks.len(), "indexing document");

        let points = self.embed_chunks(&document, &chunks).await?;
        let dimension = points.first().map_or(0, |p| p.vector.len());

        let [primary, alternate] = slots;
        let collection = if in_use == Some(primary.as_str()) {
            alternate
        } else {
            primary
        };

        let built = self
            .build_collection(&collection, dimension, points, &document, summarizer)
            .await;
        let summary = match built {
            Ok(summary) => summary,
            Err(e) => {
                self.drop_partial(&collection).await;
                return Err(e);
            }
        };

        let index = ActiveIndex {
            collection,
            fingerprint,
            source: source.to_owned(),
            size,
            chunk_size: self.config.splitter.chunk_size,
            chunk_overlap: self.config.splitter.chunk_overlap,
            embedding_model: self.config.embedding_model.clone(),
            format: INDEX_FORMAT.to_owned(),
            chunk_count: chunks.len(),
            dimension,
            summary,
        };
        if let Err(e) = self.save_metadata(&index).await {
            self.drop_partial(&index.collection).await;
            return Err(e);
        }

        Ok(IndexOutcome {
            index,
            cached: false,
        })
    }

    async fn build_collection(
        &self,
        collection: &str,
        dimension: usize,
        points: Vec<VectorPoint>,
        document: &Document,
        summarizer: Option<&dyn DocumentSummarizer>,
    ) -> Result<Option<String>, IndexError> {
        self.store.delete_collection(collection).await?;
        self.store
            .ensure_collection(collection, dimension as u64)
            .await?;
        self.store.upsert(collection, points).await?;

        Ok(match summarizer {
            Some(s) => s.summarize(&document.content).await,
            None => None,
        })
    }

    async fn drop_partial(&self, collection: &str) {
        if let Err(e) = self.store.delete_collection(collection).await {
            tracing::warn!(collection, "failed to drop partially built index: {e}");
        }
    }

    async fn embed_chunks(
        &self,
        document: &Document,
        chunks: &[Chunk],
    ) -> Result<Vec<VectorPoint>, IndexError> {
        let mut points = Vec::with_capacity(chunks.len());
        let mut expected: Option<usize> = None;

        for chunk in chunks {
            let vector = (self.embed_fn)(&chunk.content)
                .await
                .map_err(IndexError::Embedding)?;
            match expected {
                None if vector.is_empty() => {
                    return Err(IndexError::Dimension {
                        expected: 1,
                        actual: 0,
                    });
                }
                None => expected = Some(vector.len()),
                Some(dim) if dim != vector.len() => {
                    return Err(IndexError::Dimension {
                        expected: dim,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
            }

            let payload = HashMap::from([
                ("content".to_owned(), serde_json::json!(chunk.content)),
                ("chunk_index".to_owned(), serde_json::json!(chunk.chunk_index)),
                ("fingerprint".to_owned(), serde_json::json!(chunk.document)),
                (
                    "source".to_owned(),
                    serde_json::json!(document.metadata.source),
                ),
            ]);
            points.push(VectorPoint {
                id: chunk_id(&chunk.document, chunk.chunk_index),
                vector,
                payload,
            });
        }
        Ok(points)
    }

    async fn reusable(
        &self,
        fingerprint: &str,
        collection: &str,
    ) -> Result<Option<ActiveIndex>, IndexError> {
        let Some(meta) = self.load_metadata(collection).await else {
            return Ok(None);
        };
        if !meta.reusable_for(fingerprint, &self.config) {
            tracing::debug!(collection, "index parameters changed, rebuilding");
            return Ok(None);
        }
        if !self.store.collection_exists(collection).await? {
            tracing::debug!(collection, "metadata present but collection missing");
            return Ok(None);
        }
        Ok(Some(meta))
    }

    /// Read `meta.json` for `collection`. Missing or unreadable metadata yields `None`.
    pub async fn load_metadata(&self, collection: &str) -> Option<ActiveIndex> {
        let path = self
            .config
            .index_root
            .as_ref()?
            .join(collection)
            .join(META_FILE);
        let bytes = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring invalid index metadata: {e}");
                None
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the metadata file cannot be written.
    pub async fn save_metadata(&self, index: &ActiveIndex) -> Result<(), IndexError> {
        let Some(root) = &self.config.index_root else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(index)?;
        write_atomic(&root.join(&index.collection), META_FILE, &bytes).await?;
        Ok(())
    }
}
