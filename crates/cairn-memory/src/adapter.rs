// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed adapter over the external vector store and embedding service.
//!
//! [`MemoryStore`] owns no records. Every access is a fresh call to the
//! underlying [`VectorStore`]; text queries and writes are embedded here so
//! callers never handle raw vectors unless they want to.

use std::sync::Arc;

use cairn_config::model::CollectionsConfig;
use cairn_core::types::EmbeddingInput;
use cairn_core::{
    CairnError, Channel, EmbeddingAdapter, MemoryMetadata, Neighbor, VectorEntry, VectorStore,
};
use tracing::{debug, info};

use crate::types::MemoryStats;

/// Store storage failures as unavailability of the named collection.
fn in_collection(collection: &str) -> impl FnOnce(CairnError) -> CairnError + '_ {
    move |e| match e {
        CairnError::Storage { source } => CairnError::Unavailable {
            target: format!("collection {collection}"),
            source,
        },
        other => other,
    }
}

/// Channel-aware facade over a [`VectorStore`] and an [`EmbeddingAdapter`].
pub struct MemoryStore {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingAdapter>,
    collections: CollectionsConfig,
}

impl MemoryStore {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingAdapter>,
        collections: CollectionsConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            collections,
        }
    }

    /// Collection name backing `channel`.
    pub fn collection(&self, channel: Channel) -> &str {
        self.collections.for_channel(channel)
    }

    pub fn collections(&self) -> &CollectionsConfig {
        &self.collections
    }

    /// Dimension of the active embedding model.
    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Create every configured collection if missing.
    pub async fn ensure_collections(&self) -> Result<(), CairnError> {
        for name in self.collections.all() {
            self.store
                .ensure_collection(name)
                .await
                .map_err(in_collection(name))?;
        }
        Ok(())
    }

    /// Embed a single text with the active model.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, CairnError> {
        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![text.to_string()],
            })
            .await?;
        let embedding = output.embeddings.into_iter().next().ok_or_else(|| {
            CairnError::Embedding {
                message: "embedding service returned no vectors".into(),
                source: None,
            }
        })?;
        self.check_dimension(&embedding, "query embedding")?;
        Ok(embedding)
    }

    /// Nearest records to `text` in `channel`, closest first.
    pub async fn query(
        &self,
        channel: Channel,
        text: &str,
        k: usize,
    ) -> Result<Vec<Neighbor>, CairnError> {
        let embedding = self.embed(text).await?;
        self.query_vector(self.collection(channel), &embedding, k).await
    }

    /// Nearest records to a precomputed vector in `collection`.
    pub async fn query_vector(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<Neighbor>, CairnError> {
        if k == 0 {
            return Ok(vec![]);
        }
        let neighbors = self
            .store
            .nearest(collection, embedding, k)
            .await
            .map_err(in_collection(collection))?;
        debug!(collection, k, hits = neighbors.len(), "nearest neighbors");
        Ok(neighbors)
    }

    /// Embed `text` and upsert it into `channel` under `id`.
    pub async fn write(
        &self,
        channel: Channel,
        id: String,
        text: String,
        metadata: MemoryMetadata,
    ) -> Result<VectorEntry, CairnError> {
        let embedding = self.embed(&text).await?;
        let entry = VectorEntry {
            id,
            text,
            embedding,
            metadata: metadata.normalized(),
        };
        self.write_entry(self.collection(channel), entry.clone())
            .await?;
        Ok(entry)
    }

    /// Upsert a fully formed entry. Rejects foreign embedding dimensions.
    pub async fn write_entry(&self, collection: &str, entry: VectorEntry) -> Result<(), CairnError> {
        self.check_dimension(&entry.embedding, collection)?;
        let id = entry.id.clone();
        self.store
            .upsert(collection, entry)
            .await
            .map_err(in_collection(collection))?;
        debug!(collection, id = %id, "record upserted");
        Ok(())
    }

    pub async fn exists(&self, collection: &str, id: &str) -> Result<bool, CairnError> {
        Ok(self.get(collection, id).await?.is_some())
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<VectorEntry>, CairnError> {
        self.store
            .get(collection, id)
            .await
            .map_err(in_collection(collection))
    }

    /// Records in `collection`, newest first.
    pub async fn list(&self, collection: &str, limit: usize) -> Result<Vec<VectorEntry>, CairnError> {
        self.store
            .list(collection, limit)
            .await
            .map_err(in_collection(collection))
    }

    pub async fn count(&self, collection: &str) -> Result<usize, CairnError> {
        self.store
            .count(collection)
            .await
            .map_err(in_collection(collection))
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool, CairnError> {
        self.store
            .delete(collection, id)
            .await
            .map_err(in_collection(collection))
    }

    /// Fail if any configured collection holds embeddings from another model.
    ///
    /// Called once at startup. Collections are never partially re-embedded.
    pub async fn verify_dimensions(&self) -> Result<(), CairnError> {
        let expected = self.dimensions();
        for name in self.collections.all() {
            let stored = self
                .store
                .stored_dimensions(name)
                .await
                .map_err(in_collection(name))?;
            if let Some(&actual) = stored.iter().find(|&&d| d != expected) {
                return Err(CairnError::DimensionMismatch {
                    expected,
                    actual,
                    context: format!("collection {name}"),
                });
            }
        }
        info!(dimensions = expected, "stored embeddings match active model");
        Ok(())
    }

    /// Record counts for every configured collection.
    pub async fn stats(&self) -> Result<MemoryStats, CairnError> {
        let mut stats = MemoryStats::default();
        for name in self.collections.all() {
            stats
                .collections
                .insert(name.to_string(), self.count(name).await?);
        }
        Ok(stats)
    }

    fn check_dimension(&self, embedding: &[f32], context: &str) -> Result<(), CairnError> {
        let expected = self.dimensions();
        if embedding.len() != expected {
            return Err(CairnError::DimensionMismatch {
                expected,
                actual: embedding.len(),
                context: context.to_string(),
            });
        }
        Ok(())
    }
}
