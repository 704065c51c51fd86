// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Cairn engine.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of external collaborator an adapter wraps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
    VectorStore,
}

/// One independently-queried memory partition.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Persona,
    Episodic,
    Semantic,
}

impl Channel {
    /// All channels in the default injection priority order.
    pub const ALL: [Channel; 3] = [Channel::Persona, Channel::Semantic, Channel::Episodic];

    /// Stable lowercase name, used in ids and injection tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Persona => "persona",
            Channel::Episodic => "episodic",
            Channel::Semantic => "semantic",
        }
    }
}

/// Who produced a conversational turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Category of an extracted durable fact.
///
/// The extraction contract allows exactly these four values; anything else
/// is dropped rather than coerced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FactCategory {
    Preference,
    Relationship,
    Identity,
    Constraint,
}

impl FactCategory {
    /// All allowed categories, in contract order.
    pub const ALL: [FactCategory; 4] = [
        FactCategory::Preference,
        FactCategory::Relationship,
        FactCategory::Identity,
        FactCategory::Constraint,
    ];
}

/// Closed metadata record attached to every stored memory.
///
/// Unknown fields are rejected at deserialization so untyped maps never
/// propagate past the store boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryMetadata {
    /// Curator-assigned durability/centrality (0.0-1.0).
    pub importance: f32,
    /// Extraction certainty (0.0-1.0). Independent of importance.
    pub confidence: f32,
    /// When the memory was created.
    pub timestamp: DateTime<Utc>,
    /// Who produced the underlying text.
    pub role: Role,
    /// Lowercase tags (e.g. `generic`, `promoted`).
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Coarse tone/style hint.
    #[serde(default)]
    pub style: Option<String>,
    /// Fact category, for semantic candidates and promoted facts.
    #[serde(default)]
    pub category: Option<FactCategory>,
    /// Where the record came from (`turn`, `archivist`, `seed`, ...).
    #[serde(default)]
    pub source: Option<String>,
    /// Id of the counterpart turn this one answers, if known.
    #[serde(default)]
    pub in_reply_to: Option<String>,
}

impl MemoryMetadata {
    /// Creates metadata with no tags, style, category or provenance.
    pub fn new(importance: f32, confidence: f32, role: Role) -> Self {
        Self {
            importance,
            confidence,
            timestamp: Utc::now(),
            role,
            tags: BTreeSet::new(),
            style: None,
            category: None,
            source: None,
            in_reply_to: None,
        }
    }

    /// Clamp both score axes into `[0, 1]` and lowercase tags.
    ///
    /// Non-finite scores become 0.0.
    pub fn normalized(mut self) -> Self {
        self.importance = clamp_unit(self.importance);
        self.confidence = clamp_unit(self.confidence);
        self.tags = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// Returns true if the record carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// A record as held by the external vector-similarity service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub text: String,
    /// Immutable once written; produced by the active embedding model.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub metadata: MemoryMetadata,
}

/// A ranked nearest-neighbor hit. Lower distance means more similar.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub entry: VectorEntry,
    pub distance: f32,
}

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

/// A single chat message sent to an LLM provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: String,
    pub content: String,
}

/// A non-streaming completion request to an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the backend to constrain output to a JSON object.
    pub json_output: bool,
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A completed response from an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
}
