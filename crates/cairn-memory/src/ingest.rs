// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion gate: decides whether a turn is worth persisting.
//!
//! The gate itself is awaited by the persistence worker, never by the
//! reply path. Every failure collapses into a [`RecordOutcome`] so nothing
//! propagates back toward the user.

use std::sync::Arc;

use cairn_config::model::IngestConfig;
use cairn_core::{CairnError, Channel, MemoryMetadata, Role};
use tracing::{debug, error, warn};

use crate::adapter::MemoryStore;
use crate::curation::{CurationFilter, Decision, estimate_style};
use crate::fingerprint::{normalize_text, record_id};
use crate::types::RecordOutcome;

/// Provenance of conversational turns.
pub const SOURCE_TURN: &str = "turn";
/// Provenance of curated persona entries.
pub const SOURCE_SEED: &str = "seed";

pub struct IngestionGate {
    store: Arc<MemoryStore>,
    curation: Arc<CurationFilter>,
    min_words: usize,
    min_chars: usize,
    default_importance: f32,
}

impl IngestionGate {
    pub fn new(store: Arc<MemoryStore>, curation: Arc<CurationFilter>, config: &IngestConfig) -> Self {
        Self {
            store,
            curation,
            min_words: config.min_words,
            min_chars: config.min_chars,
            default_importance: config.default_importance,
        }
    }

    /// True if `text` is below the word or character minimum.
    pub fn is_too_short(&self, text: &str) -> bool {
        let chars = text.chars().filter(|c| !c.is_whitespace()).count();
        chars < self.min_chars || self.curation.word_count(text) < self.min_words
    }

    /// Persist one conversational turn into `channel`.
    ///
    /// `last_counterpart` is the turn this one answers; its record id is
    /// kept in `in_reply_to`.
    pub async fn record_turn(
        &self,
        text: &str,
        role: Role,
        channel: Channel,
        last_counterpart: Option<&str>,
    ) -> RecordOutcome {
        let text = normalize_text(text);
        if self.is_too_short(&text) {
            debug!(channel = %channel, role = %role, "turn below minimum length, not persisted");
            return RecordOutcome::TooShort;
        }

        let mut metadata = MemoryMetadata::new(self.default_importance, 1.0, role);
        metadata.source = Some(SOURCE_TURN.to_string());
        metadata.style = estimate_style(&text).map(str::to_string);
        metadata.in_reply_to = last_counterpart
            .map(normalize_text)
            .filter(|c| !c.is_empty())
            .map(|c| record_id(channel, &c));

        self.persist(channel, text, metadata).await
    }

    /// Seed a curated persona record.
    ///
    /// Bypasses the length minimum but not deduplication or curation.
    pub async fn add_persona_entry(
        &self,
        text: &str,
        importance: f32,
        style: Option<String>,
    ) -> RecordOutcome {
        let text = normalize_text(text);
        if text.is_empty() {
            return RecordOutcome::TooShort;
        }
        let mut metadata = MemoryMetadata::new(importance, 1.0, Role::System);
        metadata.source = Some(SOURCE_SEED.to_string());
        metadata.style = style.or_else(|| estimate_style(&text).map(str::to_string));

        self.persist(Channel::Persona, text, metadata).await
    }

    async fn persist(&self, channel: Channel, text: String, mut metadata: MemoryMetadata) -> RecordOutcome {
        let id = record_id(channel, &text);
        let collection = self.store.collection(channel);

        match self.store.exists(collection, &id).await {
            Ok(true) => {
                debug!(channel = %channel, id = %id, "duplicate fingerprint, skipping write");
                return RecordOutcome::Duplicate { id };
            }
            Ok(false) => {}
            Err(e) => return self.unavailable(channel, &e),
        }

        match self.curation.evaluate(&text, &metadata) {
            Decision::Suppress => {
                debug!(channel = %channel, id = %id, "suppressed by curation filter");
                return RecordOutcome::Suppressed;
            }
            Decision::Downweight(factor) => self.curation.mark_downweighted(&mut metadata, factor),
            Decision::Keep => {}
        }

        match self.store.write(channel, id.clone(), text, metadata).await {
            Ok(_) => {
                debug!(channel = %channel, id = %id, "turn persisted");
                RecordOutcome::Stored { id }
            }
            Err(e) => self.unavailable(channel, &e),
        }
    }

    fn unavailable(&self, channel: Channel, e: &CairnError) -> RecordOutcome {
        if e.is_transient() {
            warn!(channel = %channel, error = %e, "memory write skipped");
        } else {
            error!(channel = %channel, error = %e, "memory write rejected");
        }
        RecordOutcome::Unavailable
    }
}
