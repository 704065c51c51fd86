// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for engine-level tests.
//!
//! `TestHarness` assembles a configuration, a vector store and the mock
//! adapters so tests can hand them straight to the memory engine.

use std::sync::Arc;
use std::time::Duration;

use cairn_config::model::StorageBackend;
use cairn_config::CairnConfig;
use cairn_core::{CairnError, EmbeddingAdapter, ProviderAdapter, VectorStore};

use crate::mock_embedder::MockEmbedder;
use crate::mock_provider::MockProvider;

/// Embedding width used unless a test asks for another.
pub const DEFAULT_DIMENSIONS: usize = 256;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<String>,
    delay: Option<Duration>,
    dimensions: usize,
    sqlite: bool,
    config: CairnConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            delay: None,
            dimensions: DEFAULT_DIMENSIONS,
            sqlite: false,
            config: CairnConfig::default(),
        }
    }

    /// Script the mock provider's replies.
    pub fn with_replies<I, S>(mut self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies = replies.into_iter().map(Into::into).collect();
        self
    }

    /// Delay every provider reply, e.g. to trip the extraction timeout.
    pub fn with_provider_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Use a SQLite database in a temp directory instead of the in-process store.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Adjust the configuration before the harness is built.
    pub fn configure(mut self, f: impl FnOnce(&mut CairnConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub async fn build(self) -> Result<TestHarness, CairnError> {
        let mut config = self.config;
        config.embedding.dimensions = self.dimensions;

        let temp_dir = if self.sqlite {
            let dir = tempfile::TempDir::new().map_err(|e| CairnError::Storage { source: e.into() })?;
            config.storage.backend = StorageBackend::Sqlite;
            config.storage.database_path = dir.path().join("cairn.db").to_string_lossy().to_string();
            Some(dir)
        } else {
            config.storage.backend = StorageBackend::Memory;
            None
        };
        let store = cairn_storage::open_store(&config.storage).await?;

        let mut provider = MockProvider::with_replies(self.replies);
        if let Some(delay) = self.delay {
            provider = provider.with_delay(delay);
        }

        Ok(TestHarness {
            config,
            store,
            embedder: Arc::new(MockEmbedder::new(self.dimensions)),
            provider: Arc::new(provider),
            _temp_dir: temp_dir,
        })
    }
}

/// Configuration, store and mock adapters for one test.
pub struct TestHarness {
    pub config: CairnConfig,
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<MockEmbedder>,
    pub provider: Arc<MockProvider>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn embedding_adapter(&self) -> Arc<dyn EmbeddingAdapter> {
        self.embedder.clone()
    }

    pub fn provider_adapter(&self) -> Arc<dyn ProviderAdapter> {
        self.provider.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::types::EmbeddingInput;

    #[tokio::test]
    async fn builder_creates_empty_memory_store() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert_eq!(harness.config.storage.backend, StorageBackend::Memory);
        harness.store.ensure_collection("persona").await.unwrap();
        assert_eq!(harness.store.count("persona").await.unwrap(), 0);
        assert_eq!(harness.embedding_adapter().dimensions(), DEFAULT_DIMENSIONS);
    }

    #[tokio::test]
    async fn sqlite_harness_uses_temp_database() {
        let harness = TestHarness::builder().with_sqlite().build().await.unwrap();
        assert_eq!(harness.config.storage.backend, StorageBackend::Sqlite);
        assert!(harness.config.storage.database_path.ends_with("cairn.db"));
        harness.store.ensure_collection("episodic").await.unwrap();
        assert_eq!(harness.store.count("episodic").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn configure_and_dimensions_apply() {
        let harness = TestHarness::builder()
            .with_dimensions(32)
            .configure(|c| c.recall.topk_persona = 2)
            .build()
            .await
            .unwrap();
        assert_eq!(harness.config.embedding.dimensions, 32);
        assert_eq!(harness.config.recall.topk_persona, 2);
        let out = harness
            .embedder
            .embed(EmbeddingInput { texts: vec!["hello there".into()] })
            .await
            .unwrap();
        assert_eq!(out.embeddings[0].len(), 32);
    }

    #[tokio::test]
    async fn scripted_replies_reach_provider() {
        let harness = TestHarness::builder()
            .with_replies([r#"{"relevant": false}"#])
            .build()
            .await
            .unwrap();
        assert_eq!(harness.provider.remaining().await, 1);
    }
}
