// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational memory engine for Cairn.
//!
//! Recalls relevant persona, semantic and episodic memory for each user
//! turn, persists turns in the background, and extracts durable facts
//! into a candidates collection for later promotion.
//!
//! ## Architecture
//!
//! - **MemoryStore**: typed adapter over a [`cairn_core::VectorStore`]
//! - **CurationFilter**: generic-assistant and low-value heuristics
//! - **RecallOrchestrator**: concurrent per-channel recall and injection block
//! - **IngestionGate** / **PersistenceQueue**: off-path turn persistence
//! - **Archivist**: windowed extraction, distillation and candidate staging
//! - **Promoter**: candidate to semantic promotion
//! - **Importer**: bulk fact import and seeding
//! - **ConversationHooks**: host entry points per user and assistant turn
//! - **MemorySystem**: wiring and startup checks

pub mod adapter;
pub mod archivist;
pub mod curation;
pub mod fingerprint;
pub mod hooks;
pub mod import;
pub mod ingest;
pub mod promote;
pub mod recall;
pub mod system;
pub mod types;
pub mod writer;

pub use adapter::MemoryStore;
pub use archivist::{Archivist, ExtractionReport, StageOptions, WindowOutcome};
pub use curation::{CurationFilter, Decision};
pub use hooks::{ConversationHooks, HookSettings};
pub use import::{ImportRecord, ImportReport, ImportTarget, Importer};
pub use ingest::IngestionGate;
pub use promote::{PromoteOptions, PromoteOutcome, Promoter, PromotionReport};
pub use recall::{RecallOrchestrator, RecallQuery, RecallResult};
pub use system::{BatchOptions, BatchReport, MemorySystem};
pub use types::*;
pub use writer::{PersistJob, PersistenceQueue};
