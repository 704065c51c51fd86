// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector store backends for the Cairn memory engine.
//!
//! Both backends implement [`cairn_core::VectorStore`]: a WAL-mode SQLite
//! store with a single-writer connection via `tokio-rusqlite`, and a
//! process-local store for tests and ephemeral sessions. Similarity is
//! brute-force cosine distance computed in Rust.

pub mod database;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod vector;

use std::sync::Arc;

use cairn_config::model::{StorageBackend, StorageConfig};
use cairn_core::{CairnError, VectorStore};

pub use database::Database;
pub use memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;

/// Open the store selected by `config.backend`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn VectorStore>, CairnError> {
    match config.backend {
        StorageBackend::Sqlite => {
            let db = Database::open(&config.database_path, config.wal_mode).await?;
            Ok(Arc::new(SqliteVectorStore::new(db)))
        }
        StorageBackend::Memory => Ok(Arc::new(InMemoryVectorStore::new())),
    }
}
