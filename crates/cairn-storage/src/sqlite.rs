// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`VectorStore`] trait.
//!
//! Embeddings are stored as little-endian f32 BLOBs and metadata as JSON.
//! Nearest-neighbor search loads a collection's embeddings, ranks them in
//! Rust, then fetches the winning rows by id.

use async_trait::async_trait;
use chrono::SecondsFormat;
use rusqlite::OptionalExtension;
use tracing::debug;

use cairn_core::types::{AdapterType, HealthStatus, MemoryMetadata, Neighbor, VectorEntry};
use cairn_core::{CairnError, PluginAdapter, VectorStore};

use crate::database::{Database, storage_err};
use crate::vector::{blob_to_vec, rank_by_distance, vec_to_blob};

/// SQLite-backed vector store.
pub struct SqliteVectorStore {
    db: Database,
}

impl SqliteVectorStore {
    /// Wrap an opened, migrated database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    async fn entries_by_ids(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> Result<Vec<VectorEntry>, CairnError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let collection = collection.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<VectorEntry>, rusqlite::Error> {
                let placeholders: Vec<String> =
                    (2..=ids.len() + 1).map(|i| format!("?{i}")).collect();
                let sql = format!(
                    "SELECT id, text, embedding, metadata FROM memory_records WHERE collection = ?1 AND id IN ({})",
                    placeholders.join(", ")
                );
                let mut stmt = conn.prepare(&sql)?;
                let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&collection];
                params.extend(ids.iter().map(|id| id as &dyn rusqlite::types::ToSql));
                stmt.query_map(params.as_slice(), row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(storage_err)
    }
}

/// Convert a `(id, text, embedding, metadata)` row into a [`VectorEntry`].
fn row_to_entry(row: &rusqlite::Row) -> Result<VectorEntry, rusqlite::Error> {
    let blob: Vec<u8> = row.get(2)?;
    let metadata_json: String = row.get(3)?;
    let metadata: MemoryMetadata = serde_json::from_str(&metadata_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(VectorEntry {
        id: row.get(0)?,
        text: row.get(1)?,
        embedding: blob_to_vec(&blob),
        metadata,
    })
}

#[async_trait]
impl PluginAdapter for SqliteVectorStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorStore
    }

    async fn health_check(&self) -> Result<HealthStatus, CairnError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))
            })
            .await
            .map_err(storage_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CairnError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn ensure_collection(&self, collection: &str) -> Result<(), CairnError> {
        let name = collection.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO collections (name) VALUES (?1)",
                    rusqlite::params![name],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn nearest(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<Neighbor>, CairnError> {
        if k == 0 {
            return Ok(vec![]);
        }
        let name = collection.to_string();
        let all = self
            .db
            .connection()
            .call(move |conn| -> Result<Vec<(String, Vec<f32>)>, rusqlite::Error> {
                let mut stmt =
                    conn.prepare("SELECT id, embedding FROM memory_records WHERE collection = ?1")?;
                stmt.query_map(rusqlite::params![name], |row| {
                    let id: String = row.get(0)?;
                    let blob: Vec<u8> = row.get(1)?;
                    Ok((id, blob_to_vec(&blob)))
                })?
                .collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(storage_err)?;

        let ranked = rank_by_distance(
            embedding,
            all.iter().map(|(id, emb)| (id.as_str(), emb.as_slice())),
            k,
        );
        let ids: Vec<String> = ranked.iter().map(|(id, _)| id.clone()).collect();
        let mut entries = self.entries_by_ids(collection, ids).await?;

        let mut neighbors = Vec::with_capacity(ranked.len());
        for (id, distance) in ranked {
            if let Some(pos) = entries.iter().position(|e| e.id == id) {
                neighbors.push(Neighbor {
                    entry: entries.swap_remove(pos),
                    distance,
                });
            }
        }
        debug!(collection, k, hits = neighbors.len(), "sqlite nearest neighbors");
        Ok(neighbors)
    }

    async fn upsert(&self, collection: &str, entry: VectorEntry) -> Result<(), CairnError> {
        let name = collection.to_string();
        let metadata = serde_json::to_string(&entry.metadata).map_err(|e| CairnError::Storage {
            source: Box::new(e),
        })?;
        let created_at = entry
            .metadata
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        let dimensions = entry.embedding.len() as i64;
        let blob = vec_to_blob(&entry.embedding);
        let VectorEntry { id, text, .. } = entry;

        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO memory_records (collection, id, text, embedding, dimensions, metadata, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(collection, id) DO UPDATE SET
                        text = excluded.text,
                        embedding = excluded.embedding,
                        dimensions = excluded.dimensions,
                        metadata = excluded.metadata,
                        updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                    rusqlite::params![name, id, text, blob, dimensions, metadata, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<VectorEntry>, CairnError> {
        let name = collection.to_string();
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<VectorEntry>, rusqlite::Error> {
                conn.query_row(
                    "SELECT id, text, embedding, metadata FROM memory_records WHERE collection = ?1 AND id = ?2",
                    rusqlite::params![name, id],
                    row_to_entry,
                )
                .optional()
            })
            .await
            .map_err(storage_err)
    }

    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<VectorEntry>, CairnError> {
        let name = collection.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<VectorEntry>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, text, embedding, metadata FROM memory_records WHERE collection = ?1 ORDER BY created_at DESC, id LIMIT ?2",
                )?;
                stmt.query_map(rusqlite::params![name, limit], row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(storage_err)
    }

    async fn count(&self, collection: &str) -> Result<usize, CairnError> {
        let name = collection.to_string();
        let count = self
            .db
            .connection()
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM memory_records WHERE collection = ?1",
                    rusqlite::params![name],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(storage_err)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, CairnError> {
        let name = collection.to_string();
        let id = id.to_string();
        let removed = self
            .db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "DELETE FROM memory_records WHERE collection = ?1 AND id = ?2",
                    rusqlite::params![name, id],
                )
            })
            .await
            .map_err(storage_err)?;
        Ok(removed > 0)
    }

    async fn stored_dimensions(&self, collection: &str) -> Result<Vec<usize>, CairnError> {
        let name = collection.to_string();
        let dims = self
            .db
            .connection()
            .call(move |conn| -> Result<Vec<i64>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT dimensions FROM memory_records WHERE collection = ?1 ORDER BY dimensions",
                )?;
                stmt.query_map(rusqlite::params![name], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(storage_err)?;
        Ok(dims
            .into_iter()
            .filter_map(|d| usize::try_from(d).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::Role;

    fn entry(id: &str, text: &str, embedding: Vec<f32>) -> VectorEntry {
        VectorEntry {
            id: id.to_string(),
            text: text.to_string(),
            embedding,
            metadata: MemoryMetadata::new(0.8, 1.0, Role::User),
        }
    }

    async fn store() -> SqliteVectorStore {
        SqliteVectorStore::new(Database::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn upsert_and_get_roundtrip() {
        let store = store().await;
        let mut e = entry("persona-1", "I keep the old lighthouse logs", vec![0.1, 0.2, 0.3]);
        e.metadata.tags.insert("curated".into());
        e.metadata.style = Some("poetic".into());
        store.upsert("persona", e.clone()).await.unwrap();

        let got = store.get("persona", "persona-1").await.unwrap().unwrap();
        assert_eq!(got.text, e.text);
        assert_eq!(got.embedding, e.embedding);
        assert_eq!(got.metadata, e.metadata);
        assert!(store.get("episodic", "persona-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_existing_id() {
        let store = store().await;
        store.upsert("c", entry("a", "first", vec![1.0, 0.0])).await.unwrap();
        store.upsert("c", entry("a", "second", vec![0.0, 1.0])).await.unwrap();
        assert_eq!(store.count("c").await.unwrap(), 1);
        let got = store.get("c", "a").await.unwrap().unwrap();
        assert_eq!(got.text, "second");
    }

    #[tokio::test]
    async fn nearest_orders_by_distance() {
        let store = store().await;
        store.upsert("c", entry("far", "far", vec![-1.0, 0.0])).await.unwrap();
        store.upsert("c", entry("near", "near", vec![1.0, 0.05])).await.unwrap();
        store.upsert("c", entry("mid", "mid", vec![1.0, 1.0])).await.unwrap();
        store.upsert("other", entry("x", "x", vec![1.0, 0.0])).await.unwrap();

        let hits = store.nearest("c", &[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|n| n.entry.id.as_str()).collect();
        assert_eq!(ids, ["near", "mid"]);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn delete_and_count() {
        let store = store().await;
        store.upsert("c", entry("a", "a", vec![1.0])).await.unwrap();
        assert!(store.delete("c", "a").await.unwrap());
        assert!(!store.delete("c", "a").await.unwrap());
        assert_eq!(store.count("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stored_dimensions_are_distinct() {
        let store = store().await;
        assert!(store.stored_dimensions("c").await.unwrap().is_empty());
        store.upsert("c", entry("a", "a", vec![1.0, 0.0])).await.unwrap();
        store.upsert("c", entry("b", "b", vec![0.0, 1.0])).await.unwrap();
        store.upsert("c", entry("z", "z", vec![0.0, 1.0, 0.0])).await.unwrap();
        assert_eq!(store.stored_dimensions("c").await.unwrap(), vec![2, 3]);
    }

    #[tokio::test]
    async fn health_and_shutdown() {
        let store = store().await;
        store.ensure_collection("persona").await.unwrap();
        store.ensure_collection("persona").await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
        store.shutdown().await.unwrap();
    }
}
