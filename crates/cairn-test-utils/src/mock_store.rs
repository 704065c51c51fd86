// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A vector store that is never reachable.

use async_trait::async_trait;

use cairn_core::traits::adapter::PluginAdapter;
use cairn_core::traits::store::VectorStore;
use cairn_core::types::{AdapterType, HealthStatus, Neighbor, VectorEntry};
use cairn_core::CairnError;

/// Every operation fails with [`CairnError::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStore;

fn down(collection: &str) -> CairnError {
    CairnError::unavailable(format!("collection {collection}"), "store is down")
}

#[async_trait]
impl PluginAdapter for UnavailableStore {
    fn name(&self) -> &str {
        "unavailable-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorStore
    }

    async fn health_check(&self) -> Result<HealthStatus, CairnError> {
        Ok(HealthStatus::Unhealthy("store is down".into()))
    }

    async fn shutdown(&self) -> Result<(), CairnError> {
        Ok(())
    }
}

#[async_trait]
impl VectorStore for UnavailableStore {
    async fn ensure_collection(&self, collection: &str) -> Result<(), CairnError> {
        Err(down(collection))
    }

    async fn nearest(
        &self,
        collection: &str,
        _embedding: &[f32],
        _k: usize,
    ) -> Result<Vec<Neighbor>, CairnError> {
        Err(down(collection))
    }

    async fn upsert(&self, collection: &str, _entry: VectorEntry) -> Result<(), CairnError> {
        Err(down(collection))
    }

    async fn get(&self, collection: &str, _id: &str) -> Result<Option<VectorEntry>, CairnError> {
        Err(down(collection))
    }

    async fn list(&self, collection: &str, _limit: usize) -> Result<Vec<VectorEntry>, CairnError> {
        Err(down(collection))
    }

    async fn count(&self, collection: &str) -> Result<usize, CairnError> {
        Err(down(collection))
    }

    async fn delete(&self, collection: &str, _id: &str) -> Result<bool, CairnError> {
        Err(down(collection))
    }

    async fn stored_dimensions(&self, collection: &str) -> Result<Vec<usize>, CairnError> {
        Err(down(collection))
    }
}
