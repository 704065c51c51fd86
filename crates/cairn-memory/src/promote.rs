// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Promotion of staged candidates into the semantic channel.
//!
//! Promotion is the only write path from candidates into semantic. The
//! promoted id derives from the fact text alone, so promoting the same fact
//! twice, even from different windows, finds the existing record and
//! writes nothing.

use std::sync::Arc;

use cairn_core::{CairnError, Channel, VectorEntry};
use chrono::Utc;
use tracing::{debug, info};

use crate::adapter::MemoryStore;
use crate::archivist::CANDIDATE_TAG;
use crate::curation::CurationFilter;
use crate::fingerprint::{fingerprint, promoted_id};

/// Tag on promoted semantic records and on the candidates they came from.
pub const PROMOTED_TAG: &str = "promoted";

/// Filters for a batch promotion.
#[derive(Debug, Clone)]
pub struct PromoteOptions {
    /// Stop after this many new promotions.
    pub limit: usize,
    pub min_confidence: f32,
    /// Only candidates with this provenance.
    pub source: Option<String>,
    /// Remove promoted candidates instead of tagging them.
    pub delete_from_candidates: bool,
}

impl Default for PromoteOptions {
    fn default() -> Self {
        Self {
            limit: 50,
            min_confidence: 0.0,
            source: None,
            delete_from_candidates: false,
        }
    }
}

/// Result of promoting a single candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoteOutcome {
    Promoted { id: String },
    AlreadyPromoted { id: String },
    BelowConfidence,
    SourceMismatch,
    LowValue,
    NotFound,
}

/// Counts for a batch promotion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionReport {
    /// Ids of newly written semantic records.
    pub promoted: Vec<String>,
    pub already_promoted: usize,
    pub skipped: usize,
    pub scanned: usize,
}

pub struct Promoter {
    store: Arc<MemoryStore>,
    curation: Arc<CurationFilter>,
}

impl Promoter {
    pub fn new(store: Arc<MemoryStore>, curation: Arc<CurationFilter>) -> Self {
        Self { store, curation }
    }

    /// Promote every eligible candidate, oldest first, up to `options.limit`.
    pub async fn promote_candidates(
        &self,
        options: &PromoteOptions,
    ) -> Result<PromotionReport, CairnError> {
        let collection = &self.store.collections().candidates;
        let total = self.store.count(collection).await?;
        let mut candidates = self.store.list(collection, total).await?;
        candidates.reverse();

        let mut report = PromotionReport::default();
        for candidate in candidates {
            if report.promoted.len() >= options.limit {
                break;
            }
            report.scanned += 1;
            match self.promote_entry(candidate, options).await? {
                PromoteOutcome::Promoted { id } => report.promoted.push(id),
                PromoteOutcome::AlreadyPromoted { .. } => report.already_promoted += 1,
                _ => report.skipped += 1,
            }
        }
        info!(
            promoted = report.promoted.len(),
            already = report.already_promoted,
            scanned = report.scanned,
            "promotion pass complete"
        );
        Ok(report)
    }

    /// Promote specific candidates, e.g. the ones a window just staged.
    pub async fn promote_ids(
        &self,
        ids: &[String],
        options: &PromoteOptions,
    ) -> Result<PromotionReport, CairnError> {
        let mut report = PromotionReport::default();
        for id in ids {
            report.scanned += 1;
            match self.promote_one(id, options).await? {
                PromoteOutcome::Promoted { id } => report.promoted.push(id),
                PromoteOutcome::AlreadyPromoted { .. } => report.already_promoted += 1,
                _ => report.skipped += 1,
            }
        }
        Ok(report)
    }

    /// Promote one candidate by id.
    pub async fn promote_one(
        &self,
        candidate_id: &str,
        options: &PromoteOptions,
    ) -> Result<PromoteOutcome, CairnError> {
        let collection = &self.store.collections().candidates;
        match self.store.get(collection, candidate_id).await? {
            Some(candidate) => self.promote_entry(candidate, options).await,
            None => Ok(PromoteOutcome::NotFound),
        }
    }

    async fn promote_entry(
        &self,
        candidate: VectorEntry,
        options: &PromoteOptions,
    ) -> Result<PromoteOutcome, CairnError> {
        let semantic = self.store.collection(Channel::Semantic).to_string();
        let id = promoted_id(&fingerprint(&candidate.text));

        if self.store.exists(&semantic, &id).await? {
            if options.delete_from_candidates || !candidate.metadata.has_tag(PROMOTED_TAG) {
                self.settle_candidate(candidate, options).await?;
            }
            debug!(id = %id, "candidate already promoted");
            return Ok(PromoteOutcome::AlreadyPromoted { id });
        }

        let meta = &candidate.metadata;
        if meta.confidence < options.min_confidence {
            return Ok(PromoteOutcome::BelowConfidence);
        }
        if let Some(source) = &options.source
            && meta.source.as_deref() != Some(source.as_str())
        {
            return Ok(PromoteOutcome::SourceMismatch);
        }
        if self.curation.is_low_value_candidate(&candidate.text, &meta.tags) {
            debug!(candidate = %candidate.id, "low-value candidate not promoted");
            return Ok(PromoteOutcome::LowValue);
        }

        let mut metadata = candidate.metadata.clone();
        metadata.tags.remove(CANDIDATE_TAG);
        metadata.tags.insert(PROMOTED_TAG.to_string());
        metadata.timestamp = Utc::now();
        let promoted = VectorEntry {
            id: id.clone(),
            text: candidate.text.clone(),
            embedding: candidate.embedding.clone(),
            metadata,
        };
        self.store.write_entry(&semantic, promoted).await?;
        self.settle_candidate(candidate, options).await?;

        info!(id = %id, "candidate promoted to semantic");
        Ok(PromoteOutcome::Promoted { id })
    }

    /// Tag or delete a candidate after its fact reached the semantic channel.
    async fn settle_candidate(
        &self,
        mut candidate: VectorEntry,
        options: &PromoteOptions,
    ) -> Result<(), CairnError> {
        let collection = &self.store.collections().candidates;
        if options.delete_from_candidates {
            self.store.delete(collection, &candidate.id).await?;
        } else {
            candidate.metadata.tags.insert(PROMOTED_TAG.to_string());
            self.store.write_entry(collection, candidate).await?;
        }
        Ok(())
    }
}
