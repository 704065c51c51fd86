// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Cairn tests.
//!
//! Provides deterministic adapters and a harness for fast, CI-runnable
//! tests without an embedding service or LLM.
//!
//! # Components
//!
//! - [`MockEmbedder`] - Hashed bag-of-words embeddings
//! - [`MockProvider`] - Scripted LLM replies with optional latency
//! - [`UnavailableStore`] - Vector store that is always unreachable
//! - [`TestHarness`] - Config, store and mocks assembled together

pub mod harness;
pub mod mock_embedder;
pub mod mock_provider;
pub mod mock_store;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_embedder::MockEmbedder;
pub use mock_provider::MockProvider;
pub use mock_store::UnavailableStore;
