// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector store trait for collection-partitioned similarity search.

use async_trait::async_trait;

use crate::error::CairnError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Neighbor, VectorEntry};

/// Backend holding named collections of embedded records.
///
/// Distances are cosine distances (`1 - cos`), so `0.0` is identical and
/// `2.0` is opposite. Implementations return neighbors ascending by distance.
#[async_trait]
pub trait VectorStore: PluginAdapter {
    /// Ensure a collection exists. Idempotent.
    async fn ensure_collection(&self, collection: &str) -> Result<(), CairnError>;

    /// Return up to `k` nearest records to `embedding` in `collection`.
    async fn nearest(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<Neighbor>, CairnError>;

    /// Insert or replace a record by id.
    async fn upsert(&self, collection: &str, entry: VectorEntry) -> Result<(), CairnError>;

    /// Fetch a record by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<VectorEntry>, CairnError>;

    /// List records, newest first, up to `limit`.
    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<VectorEntry>, CairnError>;

    /// Number of records in `collection`.
    async fn count(&self, collection: &str) -> Result<usize, CairnError>;

    /// Delete a record by id. Returns true if a record was removed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, CairnError>;

    /// Distinct embedding dimensions present in `collection`, ascending.
    async fn stored_dimensions(&self, collection: &str) -> Result<Vec<usize>, CairnError>;
}
