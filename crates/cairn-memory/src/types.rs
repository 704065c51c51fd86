// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine-level types shared by recall, ingestion and extraction.

use std::collections::BTreeMap;

use cairn_core::{Channel, Role, VectorEntry};
use serde::{Deserialize, Serialize};

/// One conversational turn as seen by the hooks and the archivist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// A neighbor returned for a channel, before and after scoring.
#[derive(Debug, Clone)]
pub struct ScoredHit {
    /// Channel the record was recalled from.
    pub channel: Channel,
    /// The stored record.
    pub entry: VectorEntry,
    /// Raw store distance (cosine distance, lower is closer).
    pub distance: f32,
    /// Similarity score; higher is always more relevant.
    pub score: f32,
}

/// Result of asking the ingestion gate to persist a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new record was written under this id.
    Stored { id: String },
    /// A record with the same fingerprint already exists in the channel.
    Duplicate { id: String },
    /// Below the minimum length threshold.
    TooShort,
    /// Dropped by the curation filter.
    Suppressed,
    /// Store or embedding service unavailable; nothing was written.
    Unavailable,
}

impl RecordOutcome {
    /// Short label for logs and the CLI.
    pub fn label(&self) -> &'static str {
        match self {
            RecordOutcome::Stored { .. } => "stored",
            RecordOutcome::Duplicate { .. } => "duplicate",
            RecordOutcome::TooShort => "too-short",
            RecordOutcome::Suppressed => "suppressed",
            RecordOutcome::Unavailable => "unavailable",
        }
    }
}

/// Per-collection record counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub collections: BTreeMap<String, usize>,
}

impl MemoryStats {
    pub fn total(&self) -> usize {
        self.collections.values().sum()
    }
}
