// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::CairnError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// Adapter for converting text into fixed-dimension vectors.
///
/// The embedding model is treated as opaque. Every vector it returns must
/// have length [`EmbeddingAdapter::dimensions`].
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Dimension of every vector this adapter produces.
    fn dimensions(&self) -> usize;

    /// Generates embeddings for the given input, one per text, in order.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, CairnError>;
}
