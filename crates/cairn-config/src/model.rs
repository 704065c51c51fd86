// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Cairn memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use cairn_core::Channel;
use serde::{Deserialize, Serialize};

/// Top-level Cairn configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CairnConfig {
    /// Agent identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Vector store backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Collection names per channel.
    #[serde(default)]
    pub collections: CollectionsConfig,

    /// Embedding service settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Recall orchestrator settings.
    #[serde(default)]
    pub recall: RecallConfig,

    /// Ingestion gate settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Curation policy settings.
    #[serde(default)]
    pub curation: CurationConfig,

    /// Semantic extraction (archivist) settings.
    #[serde(default)]
    pub archivist: ArchivistConfig,

    /// Debug and observability toggles.
    #[serde(default)]
    pub debug: DebugConfig,
}

/// Agent identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent whose memory this is.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "cairn".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which vector store implementation backs the collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Durable SQLite database.
    #[default]
    Sqlite,
    /// Process-local store, lost on exit.
    Memory,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("cairn").join("cairn.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("cairn.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Collection names for each channel plus the candidate staging area.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionsConfig {
    #[serde(default = "default_persona_collection")]
    pub persona: String,

    #[serde(default = "default_episodic_collection")]
    pub episodic: String,

    #[serde(default = "default_semantic_collection")]
    pub semantic: String,

    /// Staged archivist output awaiting promotion.
    #[serde(default = "default_candidates_collection")]
    pub candidates: String,
}

impl CollectionsConfig {
    /// Collection backing a recall channel.
    pub fn for_channel(&self, channel: Channel) -> &str {
        match channel {
            Channel::Persona => &self.persona,
            Channel::Episodic => &self.episodic,
            Channel::Semantic => &self.semantic,
        }
    }

    /// Every configured collection, channels first, candidates last.
    pub fn all(&self) -> [&str; 4] {
        [
            &self.persona,
            &self.episodic,
            &self.semantic,
            &self.candidates,
        ]
    }
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            persona: default_persona_collection(),
            episodic: default_episodic_collection(),
            semantic: default_semantic_collection(),
            candidates: default_candidates_collection(),
        }
    }
}

fn default_persona_collection() -> String {
    "persona".to_string()
}

fn default_episodic_collection() -> String {
    "episodic".to_string()
}

fn default_semantic_collection() -> String {
    "semantic".to_string()
}

fn default_candidates_collection() -> String {
    "semantic_candidates".to_string()
}

/// Embedding service configuration (OpenAI-compatible `/embeddings`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    #[serde(default = "default_local_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key. Local servers usually need none.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Vector dimension produced by `model`. Stored vectors must match.
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_local_base_url(),
            model: default_embedding_model(),
            api_key: None,
            dimensions: default_embedding_dimensions(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_local_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_dimensions() -> usize {
    768
}

fn default_embedding_timeout_secs() -> u64 {
    30
}

/// How a store distance becomes a similarity score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTransform {
    /// `1 - distance / 2`, clamped to `[0, 1]`.
    #[default]
    Normalized,
    /// `1 / (1 + distance)`.
    Inverse,
}

/// Recall orchestrator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecallConfig {
    #[serde(default = "default_topk_persona")]
    pub topk_persona: usize,

    #[serde(default = "default_topk_episodic")]
    pub topk_episodic: usize,

    #[serde(default = "default_topk_semantic")]
    pub topk_semantic: usize,

    /// Records with importance below this never reach the injection block.
    #[serde(default = "default_importance_threshold")]
    pub importance_threshold: f32,

    /// Section order of the injection block. Channels not listed are not queried.
    #[serde(default = "default_channel_order")]
    pub channel_order: Vec<Channel>,

    #[serde(default)]
    pub score_transform: ScoreTransform,

    /// Hits scoring below this are discarded.
    #[serde(default)]
    pub min_score: f32,
}

impl RecallConfig {
    /// Configured top-k for a channel.
    pub fn topk(&self, channel: Channel) -> usize {
        match channel {
            Channel::Persona => self.topk_persona,
            Channel::Episodic => self.topk_episodic,
            Channel::Semantic => self.topk_semantic,
        }
    }
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            topk_persona: default_topk_persona(),
            topk_episodic: default_topk_episodic(),
            topk_semantic: default_topk_semantic(),
            importance_threshold: default_importance_threshold(),
            channel_order: default_channel_order(),
            score_transform: ScoreTransform::default(),
            min_score: 0.0,
        }
    }
}

fn default_topk_persona() -> usize {
    5
}

fn default_topk_episodic() -> usize {
    10
}

fn default_topk_semantic() -> usize {
    5
}

fn default_importance_threshold() -> f32 {
    0.6
}

fn default_channel_order() -> Vec<Channel> {
    Channel::ALL.to_vec()
}

/// Ingestion gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Turns with fewer words are not persisted.
    #[serde(default = "default_min_words")]
    pub min_words: usize,

    /// Turns with fewer non-whitespace characters are not persisted.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    /// Importance assigned to conversational turns.
    #[serde(default = "default_turn_importance")]
    pub default_importance: f32,

    /// Bound of the background persistence queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_true")]
    pub record_user_turns: bool,

    #[serde(default = "default_true")]
    pub record_assistant_turns: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            min_words: default_min_words(),
            min_chars: default_min_chars(),
            default_importance: default_turn_importance(),
            queue_capacity: default_queue_capacity(),
            record_user_turns: true,
            record_assistant_turns: true,
        }
    }
}

fn default_min_words() -> usize {
    10
}

fn default_min_chars() -> usize {
    1
}

fn default_turn_importance() -> f32 {
    0.7
}

fn default_queue_capacity() -> usize {
    256
}

fn default_true() -> bool {
    true
}

/// What to do with generic assistant ("butler-mode") content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenericPolicy {
    /// Never persist it; never recall it.
    #[default]
    Drop,
    /// Persist it tagged and with depressed importance; scale its recall score.
    Downweight,
}

/// Curation filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CurationConfig {
    #[serde(default)]
    pub generic_policy: GenericPolicy,

    /// Multiplier applied to importance and score under `downweight`.
    #[serde(default = "default_downweight_factor")]
    pub downweight_factor: f32,

    /// Records below this importance are suppressed outright.
    #[serde(default)]
    pub importance_floor: f32,

    /// Tags that mark a record as generic content.
    #[serde(default = "default_suppressed_tags")]
    pub suppressed_tags: Vec<String>,

    /// Additional case-insensitive regexes recognizing generic assistant phrasing.
    #[serde(default)]
    pub extra_generic_patterns: Vec<String>,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            generic_policy: GenericPolicy::default(),
            downweight_factor: default_downweight_factor(),
            importance_floor: 0.0,
            suppressed_tags: default_suppressed_tags(),
            extra_generic_patterns: Vec::new(),
        }
    }
}

fn default_downweight_factor() -> f32 {
    0.25
}

fn default_suppressed_tags() -> Vec<String> {
    vec![
        "generic".to_string(),
        "butler-mode".to_string(),
        "generic-assistant".to_string(),
    ]
}

/// Semantic extraction pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArchivistConfig {
    /// Run extraction from the host hooks. The CLI can always extract.
    #[serde(default)]
    pub enabled: bool,

    /// OpenAI-compatible chat completions base URL.
    #[serde(default = "default_local_base_url")]
    pub base_url: String,

    #[serde(default = "default_archivist_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_archivist_temperature")]
    pub temperature: f32,

    #[serde(default = "default_archivist_max_tokens")]
    pub max_tokens: u32,

    /// Bound on a single extraction call.
    #[serde(default = "default_archivist_timeout_secs")]
    pub timeout_secs: u64,

    /// Number of most recent turns in one extraction window.
    #[serde(default = "default_window_turns")]
    pub window_turns: usize,

    /// New turns required since the last run before extracting again.
    #[serde(default = "default_min_new_turns")]
    pub min_new_turns: usize,

    /// Promote staged candidates right after staging.
    #[serde(default)]
    pub auto_promote: bool,

    #[serde(default = "default_promote_min_confidence")]
    pub promote_min_confidence: f32,

    /// Importance given to staged candidates.
    #[serde(default = "default_candidate_importance")]
    pub candidate_importance: f32,
}

impl Default for ArchivistConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_local_base_url(),
            model: default_archivist_model(),
            api_key: None,
            temperature: default_archivist_temperature(),
            max_tokens: default_archivist_max_tokens(),
            timeout_secs: default_archivist_timeout_secs(),
            window_turns: default_window_turns(),
            min_new_turns: default_min_new_turns(),
            auto_promote: false,
            promote_min_confidence: default_promote_min_confidence(),
            candidate_importance: default_candidate_importance(),
        }
    }
}

fn default_archivist_model() -> String {
    "qwen3:4b".to_string()
}

fn default_archivist_temperature() -> f32 {
    0.2
}

fn default_archivist_max_tokens() -> u32 {
    800
}

fn default_archivist_timeout_secs() -> u64 {
    60
}

fn default_window_turns() -> usize {
    20
}

fn default_min_new_turns() -> usize {
    6
}

fn default_promote_min_confidence() -> f32 {
    0.85
}

fn default_candidate_importance() -> f32 {
    0.8
}

/// Debug and observability toggles.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Master switch for debug output.
    #[serde(default)]
    pub enabled: bool,

    /// Produce a recall snapshot for every recall pass.
    #[serde(default)]
    pub show_recall: bool,

    /// Log every episodic write decision.
    #[serde(default)]
    pub episodic_store: bool,
}
