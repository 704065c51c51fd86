// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local [`VectorStore`] backed by hash maps.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use cairn_core::types::{AdapterType, HealthStatus, Neighbor, VectorEntry};
use cairn_core::{CairnError, PluginAdapter, VectorStore};

use crate::vector::rank_by_distance;

type Collections = HashMap<String, HashMap<String, VectorEntry>>;

/// In-memory vector store. Contents are lost when dropped.
///
/// Reads share the lock; writes take it exclusively for the duration of a
/// single upsert or delete.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<Collections>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginAdapter for InMemoryVectorStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorStore
    }

    async fn health_check(&self) -> Result<HealthStatus, CairnError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CairnError> {
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(&self, collection: &str) -> Result<(), CairnError> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    async fn nearest(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<Neighbor>, CairnError> {
        let guard = self.collections.read().await;
        let Some(records) = guard.get(collection) else {
            return Ok(vec![]);
        };
        let ranked = rank_by_distance(
            embedding,
            records
                .values()
                .map(|e| (e.id.as_str(), e.embedding.as_slice())),
            k,
        );
        Ok(ranked
            .into_iter()
            .filter_map(|(id, distance)| {
                records.get(&id).map(|entry| Neighbor {
                    entry: entry.clone(),
                    distance,
                })
            })
            .collect())
    }

    async fn upsert(&self, collection: &str, entry: VectorEntry) -> Result<(), CairnError> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(entry.id.clone(), entry);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<VectorEntry>, CairnError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|records| records.get(id).cloned()))
    }

    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<VectorEntry>, CairnError> {
        let guard = self.collections.read().await;
        let mut entries: Vec<VectorEntry> = guard
            .get(collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| {
            b.metadata
                .timestamp
                .cmp(&a.metadata.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        entries.truncate(limit);
        Ok(entries)
    }

    async fn count(&self, collection: &str) -> Result<usize, CairnError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map_or(0, HashMap::len))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, CairnError> {
        Ok(self
            .collections
            .write()
            .await
            .get_mut(collection)
            .is_some_and(|records| records.remove(id).is_some()))
    }

    async fn stored_dimensions(&self, collection: &str) -> Result<Vec<usize>, CairnError> {
        let guard = self.collections.read().await;
        let dims: BTreeSet<usize> = guard
            .get(collection)
            .map(|records| records.values().map(|e| e.embedding.len()).collect())
            .unwrap_or_default();
        Ok(dims.into_iter().collect())
    }
}
