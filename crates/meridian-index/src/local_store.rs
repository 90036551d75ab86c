use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::vector_store::{
    BoxFuture, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError,
};

const POINTS_FILE: &str = "points.json";

#[derive(Default, Serialize, Deserialize)]
struct LocalCollection {
    vector_size: u64,
    points: Vec<VectorPoint>,
}

/// In-process vector store with optional write-through JSON snapshots.
///
/// With a root directory each collection lives at `<root>/<collection>/points.json`
/// and is loaded lazily on first access, so indexes survive restarts.
pub struct LocalVectorStore {
    collections: RwLock<HashMap<String, LocalCollection>>,
    root: Option<PathBuf>,
}

impl LocalVectorStore {
    /// Volatile store; nothing touches the disk.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            root: None,
        }
    }

    /// Persistent store rooted at `root`.
    #[must_use]
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            root: Some(root.into()),
        }
    }

    fn collection_dir(&self, collection: &str) -> Option<PathBuf> {
        self.root.as_ref().map(|r| r.join(collection))
    }

    /// Pull a persisted collection into memory if it is not loaded yet.
    async fn load_if_needed(&self, collection: &str) -> Result<bool, VectorStoreError> {
        {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            if cols.contains_key(collection) {
                return Ok(true);
            }
        }
        let Some(dir) = self.collection_dir(collection) else {
            return Ok(false);
        };
        let path = dir.join(POINTS_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(VectorStoreError::Persistence(e.to_string())),
        };
        let loaded: LocalCollection = serde_json::from_slice(&bytes)
            .map_err(|e| VectorStoreError::Persistence(format!("{}: {e}", path.display())))?;
        tracing::debug!(
            collection,
            points = loaded.points.len(),
            "loaded collection from disk"
        );
        let mut cols = self
            .collections
            .write()
            .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
        cols.entry(collection.to_owned()).or_insert(loaded);
        Ok(true)
    }

    async fn persist(&self, collection: &str) -> Result<(), VectorStoreError> {
        let Some(dir) = self.collection_dir(collection) else {
            return Ok(());
        };
        let snapshot = {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Persistence(e.to_string()))?;
            let Some(col) = cols.get(collection) else {
                return Ok(());
            };
            serde_json::to_vec(col).map_err(|e| VectorStoreError::Persistence(e.to_string()))?
        };
        write_atomic(&dir, POINTS_FILE, &snapshot)
            .await
            .map_err(|e| VectorStoreError::Persistence(e.to_string()))
    }
}

/// Write `name` inside `dir` through a temporary file and rename.
pub(crate) async fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let tmp = dir.join(format!("{name}.tmp"));
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, dir.join(name)).await
}

impl Default for LocalVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LocalVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalVectorStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl VectorStore for LocalVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.load_if_needed(&collection).await?;
            {
                let mut cols = self
                    .collections
                    .write()
                    .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
                cols.entry(collection.clone())
                    .or_insert_with(|| LocalCollection {
                        vector_size,
                        points: Vec::new(),
                    });
            }
            self.persist(&collection).await
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move { self.load_if_needed(&collection).await })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            {
                let mut cols = self
                    .collections
                    .write()
                    .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
                cols.remove(&collection);
            }
            if let Some(dir) = self.collection_dir(&collection) {
                match tokio::fs::remove_dir_all(&dir).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(VectorStoreError::Persistence(e.to_string())),
                }
            }
            Ok(())
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.load_if_needed(&collection).await?;
            {
                let mut cols = self
                    .collections
                    .write()
                    .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
                let col = cols.get_mut(&collection).ok_or_else(|| {
                    VectorStoreError::Upsert(format!("collection {collection} not found"))
                })?;
                for p in points {
                    if let Some(existing) = col.points.iter_mut().find(|e| e.id == p.id) {
                        *existing = p;
                    } else {
                        col.points.push(p);
                    }
                }
            }
            self.persist(&collection).await
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.load_if_needed(&collection).await?;
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            let col = cols.get(&collection).ok_or_else(|| {
                VectorStoreError::Search(format!("collection {collection} not found"))
            })?;

            let mut scored: Vec<ScoredVectorPoint> = col
                .points
                .iter()
                .map(|p| ScoredVectorPoint {
                    id: p.id.clone(),
                    score: cosine_similarity(&vector, &p.vector),
                    payload: p.payload.clone(),
                })
                .collect();

            // Stable sort keeps insertion order among equal scores.
            scored.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            scored.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(scored)
        })
    }
}
