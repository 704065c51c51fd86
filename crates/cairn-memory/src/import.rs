// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bulk import of facts into the semantic or candidates collection.
//!
//! Rows use the same shape `cairn candidates --json` prints, so an export
//! can be fed straight back in. Semantic ids derive from the fact text, as
//! on promotion; candidate rows keep their exported id when they have one.
//! Existing ids are counted as duplicates and never rewritten.

use std::collections::BTreeSet;
use std::sync::Arc;

use cairn_core::{CairnError, Channel, FactCategory, MemoryMetadata, Role, VectorEntry};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::adapter::MemoryStore;
use crate::archivist::CANDIDATE_TAG;
use crate::curation::CurationFilter;
use crate::fingerprint::{candidate_id, fingerprint, normalize_text, promoted_id};

/// Window scope for candidate ids minted on import.
const IMPORT_SCOPE: &str = "import";

/// Collection an import writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportTarget {
    Semantic,
    Candidates,
}

/// One imported fact. Only `text` is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "document", alias = "doc")]
    pub text: String,
    #[serde(default)]
    pub category: Option<FactCategory>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub importance: Option<f32>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl ImportRecord {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Counts for one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub read: usize,
    /// Ids of newly written records.
    pub added: Vec<String>,
    pub duplicates: usize,
    /// Empty or low-value rows.
    pub rejected: usize,
    /// Rows that could not be embedded or written.
    pub failed: usize,
}

pub struct Importer {
    store: Arc<MemoryStore>,
    curation: Arc<CurationFilter>,
    default_importance: f32,
}

impl Importer {
    pub fn new(store: Arc<MemoryStore>, curation: Arc<CurationFilter>, default_importance: f32) -> Self {
        Self {
            store,
            curation,
            default_importance,
        }
    }

    /// Write `records` to `target`, stamping `default_source` where a row
    /// has no provenance.
    ///
    /// Per-row failures are counted; only a failed existence lookup
    /// on a dead store aborts the run.
    pub async fn import(
        &self,
        target: ImportTarget,
        records: Vec<ImportRecord>,
        default_source: &str,
    ) -> Result<ImportReport, CairnError> {
        let collection = match target {
            ImportTarget::Semantic => self.store.collection(Channel::Semantic).to_string(),
            ImportTarget::Candidates => self.store.collections().candidates.clone(),
        };

        let mut report = ImportReport::default();
        for record in records {
            report.read += 1;
            let text = self.curation.strip_leading_greeting(&record.text);
            if text.is_empty() || self.curation.is_low_value_candidate(&text, &record.tags) {
                debug!(text = %normalize_text(&record.text), "import row rejected");
                report.rejected += 1;
                continue;
            }

            let id = row_id(target, &record, &text);
            if self.store.exists(&collection, &id).await? {
                report.duplicates += 1;
                continue;
            }

            let embedding = match self.store.embed(&text).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!(id = %id, error = %e, "import row could not be embedded");
                    report.failed += 1;
                    continue;
                }
            };
            let entry = VectorEntry {
                id: id.clone(),
                text,
                embedding,
                metadata: self.metadata(target, record, default_source),
            };
            match self.store.write_entry(&collection, entry).await {
                Ok(()) => report.added.push(id),
                Err(e) => {
                    warn!(id = %id, error = %e, "import row could not be written");
                    report.failed += 1;
                }
            }
        }

        info!(
            collection = %collection,
            read = report.read,
            added = report.added.len(),
            duplicates = report.duplicates,
            rejected = report.rejected,
            "import complete"
        );
        Ok(report)
    }

    fn metadata(&self, target: ImportTarget, record: ImportRecord, default_source: &str) -> MemoryMetadata {
        let mut metadata = MemoryMetadata::new(
            record.importance.unwrap_or(self.default_importance),
            record.confidence.unwrap_or(1.0),
            Role::User,
        );
        metadata.category = record.category;
        metadata.source = record
            .source
            .filter(|s| !s.trim().is_empty())
            .or_else(|| Some(default_source.to_string()));
        metadata.tags = record.tags;
        match target {
            ImportTarget::Candidates => {
                metadata.tags.insert(CANDIDATE_TAG.to_string());
            }
            ImportTarget::Semantic => {
                metadata.tags.remove(CANDIDATE_TAG);
            }
        }
        metadata.normalized()
    }
}

fn row_id(target: ImportTarget, record: &ImportRecord, text: &str) -> String {
    let fact = fingerprint(text);
    match target {
        ImportTarget::Semantic => promoted_id(&fact),
        ImportTarget::Candidates => record
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| id.starts_with("cand-"))
            .map(str::to_string)
            .unwrap_or_else(|| candidate_id(IMPORT_SCOPE, &fact)),
    }
}
