//! Active document state shared across turns and restarts.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::indexer::{ActiveIndex, IndexOutcome, Indexer};
use crate::local_store::write_atomic;
use crate::summary::DocumentSummarizer;

pub const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SessionState {
    collection: String,
    source: String,
    fingerprint: String,
}

/// Holds the active index.
///
/// Readers take an `Arc` snapshot and never hold the lock across an await.
/// Uploads are serialised; a new index is built completely before it is swapped in,
/// so a query sees either the old document or the new one, never a mix.
pub struct DocumentSession {
    indexer: Indexer,
    summarizer: Option<Box<dyn DocumentSummarizer>>,
    active: RwLock<Option<Arc<ActiveIndex>>>,
    upload_lock: tokio::sync::Mutex<()>,
    state_dir: Option<PathBuf>,
}

impl DocumentSession {
    #[must_use]
    pub fn new(indexer: Indexer) -> Self {
        let state_dir = indexer.config().index_root.clone();
        Self {
            indexer,
            summarizer: None,
            active: RwLock::new(None),
            upload_lock: tokio::sync::Mutex::new(()),
            state_dir,
        }
    }

    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Box<dyn DocumentSummarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Snapshot of the currently active index.
    #[must_use]
    pub fn active(&self) -> Option<Arc<ActiveIndex>> {
        match self.active.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn swap(&self, next: Option<Arc<ActiveIndex>>) -> Option<Arc<ActiveIndex>> {
        let mut guard = match self.active.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }

    /// Index `bytes` and make it the active document.
    ///
    /// On failure the previously active document stays in place.
    ///
    /// # Errors
    ///
    /// Propagates indexing errors.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        source: &str,
        force_rebuild: bool,
    ) -> Result<IndexOutcome, IndexError> {
        let _guard = self.upload_lock.lock().await;

        let current = self.active();
        let outcome = self
            .indexer
            .index_beside(
                bytes,
                source,
                force_rebuild,
                self.summarizer.as_deref(),
                current.as_ref().map(|index| index.collection.as_str()),
            )
            .await?;

        let previous = self.swap(Some(Arc::new(outcome.index.clone())));
        tracing::info!(
            collection = %outcome.index.collection,
            source = %outcome.index.source,
            chunks = outcome.index.chunk_count,
            cached = outcome.cached,
            "active document replaced"
        );

        if let Some(prev) = previous
            && prev.collection != outcome.index.collection
        {
            if let Err(e) = self.indexer.store().delete_collection(&prev.collection).await {
                tracing::warn!(collection = %prev.collection, "failed to drop previous index: {e}");
            }
        }

        self.save_state(&outcome.index).await;
        Ok(outcome)
    }

    /// Restore the last active document from `session.json`, if its index is still valid.
    ///
    /// Returns the restored index. Missing or stale state is not an error.
    pub async fn restore(&self) -> Option<Arc<ActiveIndex>> {
        let path = self.state_dir.as_ref()?.join(SESSION_FILE);
        let bytes = tokio::fs::read(&path).await.ok()?;
        let state: SessionState = match serde_json::from_slice(&bytes) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring invalid session state: {e}");
                return None;
            }
        };

        let meta = self.indexer.load_metadata(&state.collection).await?;
        if meta.fingerprint != state.fingerprint {
            tracing::warn!(collection = %state.collection, "session state does not match index");
            return None;
        }
        if !meta.reusable_for(&state.fingerprint, self.indexer.config()) {
            tracing::info!(
                collection = %state.collection,
                model = %meta.embedding_model,
                "previous index was built with other settings, not restoring"
            );
            return None;
        }
        match self.indexer.store().collection_exists(&state.collection).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                tracing::warn!("cannot verify restored index: {e}");
                return None;
            }
        }

        let restored = Arc::new(ActiveIndex {
            source: state.source,
            ..meta
        });
        self.swap(Some(Arc::clone(&restored)));
        tracing::info!(
            collection = %restored.collection,
            source = %restored.source,
            "restored previous document"
        );
        Some(restored)
    }

    async fn save_state(&self, index: &ActiveIndex) {
        let Some(dir) = &self.state_dir else {
            return;
        };
        let state = SessionState {
            collection: index.collection.clone(),
            source: index.source.clone(),
            fingerprint: index.fingerprint.clone(),
        };
        let result = match serde_json::to_vec_pretty(&state) {
            Ok(bytes) => write_atomic(dir, SESSION_FILE, &bytes).await,
            Err(e) => Err(std::io::Error::other(e)),
        };
        if let Err(e) = result {
            tracing::warn!("failed to persist session state: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SplitterConfig;
    use crate::indexer::IndexerConfig;
    use crate::local_store::LocalVectorStore;
    use crate::vector_store::{
        BoxFuture, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError,
    };
    use meridian_llm::AnyProvider;
    use meridian_llm::mock::{MockProvider, hashed_embedding};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn build_session(
        root: Option<PathBuf>,
        mock: &MockProvider,
    ) -> (DocumentSession, Arc<dyn VectorStore>) {
        let store: Arc<dyn VectorStore> = match &root {
            Some(r) => Arc::new(LocalVectorStore::open(r)),
            None => Arc::new(LocalVectorStore::new()),
        };
        session_over(Arc::clone(&store), root, mock, "hash-32")
    }

    fn session_over(
        store: Arc<dyn VectorStore>,
        root: Option<PathBuf>,
        mock: &MockProvider,
        model: &str,
    ) -> (DocumentSession, Arc<dyn VectorStore>) {
        let indexer = Indexer::new(
            Arc::clone(&store),
            Box::new(AnyProvider::Mock(mock.clone()).embed_fn()),
            IndexerConfig {
                splitter: SplitterConfig {
                    chunk_size: 200,
                    chunk_overlap: 20,
                },
                embedding_model: model.into(),
                index_root: root,
                ..IndexerConfig::default()
            },
        );
        (DocumentSession::new(indexer), store)
    }

    /// Local store whose upserts can be switched to fail.
    struct FlakyStore {
        inner: LocalVectorStore,
        fail_upsert: AtomicBool,
    }

    impl VectorStore for FlakyStore {
        fn ensure_collection(
            &self,
            collection: &str,
            vector_size: u64,
        ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
            self.inner.ensure_collection(collection, vector_size)
        }

        fn collection_exists(
            &self,
            collection: &str,
        ) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
            self.inner.collection_exists(collection)
        }

        fn delete_collection(
            &self,
            collection: &str,
        ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
            self.inner.delete_collection(collection)
        }

        fn upsert(
            &self,
            collection: &str,
            points: Vec<VectorPoint>,
        ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
            if self.fail_upsert.load(Ordering::SeqCst) {
                return Box::pin(async { Err(VectorStoreError::Upsert("store offline".into())) });
            }
            self.inner.upsert(collection, points)
        }

        fn search(
            &self,
            collection: &str,
            vector: Vec<f32>,
            limit: u64,
        ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
            self.inner.search(collection, vector, limit)
        }
    }

    async fn hits(store: &dyn VectorStore, index: &ActiveIndex, query: &str) -> usize {
        store
            .search(&index.collection, hashed_embedding(query, 32), 4)
            .await
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn upload_sets_active_index() {
        let mock = MockProvider::default().with_hashed_embeddings(32);
        let (session, _) = build_session(None, &mock);
        assert!(session.active().is_none());

        session
            .upload(b"first document".to_vec(), "one.txt", false)
            .await
            .unwrap();
        assert_eq!(session.active().unwrap().source, "one.txt");
    }

    #[tokio::test]
    async fn reupload_drops_previous_collection() {
        let mock = MockProvider::default().with_hashed_embeddings(32);
        let (session, store) = build_session(None, &mock);

        let first = session
            .upload(b"first document".to_vec(), "one.txt", false)
            .await
            .unwrap();
        let second = session
            .upload(b"second document".to_vec(), "two.txt", false)
            .await
            .unwrap();

        assert_ne!(first.index.collection, second.index.collection);
        assert!(!store.collection_exists(&first.index.collection).await.unwrap());
        assert_eq!(
            session.active().unwrap().collection,
            second.index.collection
        );
    }

    #[tokio::test]
    async fn failed_upload_keeps_previous_document() {
        let mock = MockProvider::default().with_hashed_embeddings(32);
        let (session, _) = build_session(None, &mock);
        session
            .upload(b"good document".to_vec(), "good.txt", false)
            .await
            .unwrap();

        let err = session
            .upload(vec![0, 1, 2], "bad.bin", false)
            .await
            .unwrap_err();
        assert!(err.is_parse());
        assert_eq!(session.active().unwrap().source, "good.txt");
    }

    #[tokio::test]
    async fn failed_forced_rebuild_keeps_serving_previous_chunks() {
        let mock = MockProvider::default().with_hashed_embeddings(32);
        let flaky = Arc::new(FlakyStore {
            inner: LocalVectorStore::new(),
            fail_upsert: AtomicBool::new(false),
        });
        let (session, store) = session_over(flaky.clone(), None, &mock, "hash-32");
        session
            .upload(b"The sky is blue.".to_vec(), "sky.txt", false)
            .await
            .unwrap();

        flaky.fail_upsert.store(true, Ordering::SeqCst);
        let err = session
            .upload(b"The sky is blue.".to_vec(), "sky.txt", true)
            .await
            .unwrap_err();
        assert!(err.is_transient());

        let active = session.active().unwrap();
        assert_eq!(active.source, "sky.txt");
        assert_eq!(hits(store.as_ref(), &active, "sky").await, 1);
    }

    #[tokio::test]
    async fn forced_rebuild_swaps_to_fresh_collection() {
        let mock = MockProvider::default().with_hashed_embeddings(32);
        let (session, store) = build_session(None, &mock);
        let first = session
            .upload(b"The sky is blue.".to_vec(), "sky.txt", false)
            .await
            .unwrap();
        let forced = session
            .upload(b"The sky is blue.".to_vec(), "sky.txt", true)
            .await
            .unwrap();

        assert!(!forced.cached);
        assert_ne!(forced.index.collection, first.index.collection);
        assert!(!store.collection_exists(&first.index.collection).await.unwrap());
        let active = session.active().unwrap();
        assert_eq!(active.collection, forced.index.collection);
        assert_eq!(hits(store.as_ref(), &active, "sky").await, 1);
    }

    #[tokio::test]
    async fn snapshot_survives_swap() {
        let mock = MockProvider::default().with_hashed_embeddings(32);
        let (session, _) = build_session(None, &mock);
        session
            .upload(b"first document".to_vec(), "one.txt", false)
            .await
            .unwrap();
        let snapshot = session.active().unwrap();
        session
            .upload(b"second document".to_vec(), "two.txt", false)
            .await
            .unwrap();
        assert_eq!(snapshot.source, "one.txt");
        assert_eq!(session.active().unwrap().source, "two.txt");
    }

    #[tokio::test]
    async fn restore_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockProvider::default().with_hashed_embeddings(32);
        {
            let (session, _) = build_session(Some(dir.path().to_path_buf()), &mock);
            session
                .upload(b"persistent document".to_vec(), "keep.txt", false)
                .await
                .unwrap();
        }
        assert!(dir.path().join(SESSION_FILE).exists());

        let (restarted, _) = build_session(Some(dir.path().to_path_buf()), &mock);
        let restored = restarted.restore().await.unwrap();
        assert_eq!(restored.source, "keep.txt");
        assert_eq!(restarted.active().unwrap().collection, restored.collection);
    }

    #[tokio::test]
    async fn restore_skips_index_built_with_other_model() {
        let dir = tempfile::tempdir().unwrap();
        let root = Some(dir.path().to_path_buf());
        {
            let mock = MockProvider::default().with_hashed_embeddings(16);
            let store: Arc<dyn VectorStore> = Arc::new(LocalVectorStore::open(dir.path()));
            let (session, _) = session_over(store, root.clone(), &mock, "model-a");
            session
                .upload(b"model specific".to_vec(), "a.txt", false)
                .await
                .unwrap();
        }

        let mock = MockProvider::default().with_hashed_embeddings(64);
        let store: Arc<dyn VectorStore> = Arc::new(LocalVectorStore::open(dir.path()));
        let (restarted, _) = session_over(store, root, &mock, "model-b");
        assert!(restarted.restore().await.is_none());
        assert!(restarted.active().is_none());
    }

    #[tokio::test]
    async fn restore_without_state_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockProvider::default().with_hashed_embeddings(32);
        let (session, _) = build_session(Some(dir.path().to_path_buf()), &mock);
        assert!(session.restore().await.is_none());
        assert!(session.active().is_none());
    }

    #[tokio::test]
    async fn restore_with_deleted_collection_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockProvider::default().with_hashed_embeddings(32);
        let collection = {
            let (session, _) = build_session(Some(dir.path().to_path_buf()), &mock);
            session
                .upload(b"soon gone".to_vec(), "gone.txt", false)
                .await
                .unwrap()
                .index
                .collection
        };
        std::fs::remove_file(dir.path().join(&collection).join("points.json")).unwrap();

        let (restarted, _) = build_session(Some(dir.path().to_path_buf()), &mock);
        assert!(restarted.restore().await.is_none());
    }
}
