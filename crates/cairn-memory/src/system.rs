// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembled memory engine.
//!
//! [`MemorySystem::initialize`] is the only place the components are
//! wired together. It fails fast on configuration errors (a dimension
//! mismatch between the embedding model and stored collections, bad
//! curation patterns) and never partially re-embeds anything. An
//! unreachable store only degrades startup: every channel is skipped until
//! it comes back.

use std::sync::Arc;

use cairn_config::CairnConfig;
use cairn_core::{CairnError, Channel, EmbeddingAdapter, ProviderAdapter, Role, VectorEntry, VectorStore};
use tracing::{info, warn};

use crate::adapter::MemoryStore;
use crate::archivist::{Archivist, ExtractionReport, StageOptions, WindowOutcome, make_windows};
use crate::curation::CurationFilter;
use crate::hooks::{ConversationHooks, HookSettings};
use crate::import::{ImportRecord, ImportReport, ImportTarget, Importer};
use crate::ingest::IngestionGate;
use crate::promote::{PromoteOptions, Promoter, PromotionReport};
use crate::recall::{RecallOrchestrator, RecallQuery, RecallResult};
use crate::types::{MemoryStats, RecordOutcome, Turn};
use crate::writer::PersistenceQueue;

/// How a transcript is cut into windows for batch extraction.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub stride: usize,
    pub max_windows: Option<usize>,
    pub stage: StageOptions,
}

/// Totals for one batch extraction run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub windows: usize,
    pub relevant: usize,
    /// Windows that timed out, were unreachable or came back malformed.
    pub failed: usize,
    pub staged: usize,
    pub duplicates: usize,
    pub reports: Vec<ExtractionReport>,
}

pub struct MemorySystem {
    config: CairnConfig,
    store: Arc<MemoryStore>,
    curation: Arc<CurationFilter>,
    recall: Arc<RecallOrchestrator>,
    gate: Arc<IngestionGate>,
    archivist: Arc<Archivist>,
    promoter: Arc<Promoter>,
}

impl MemorySystem {
    /// Wire every component and verify the stored collections.
    pub async fn initialize(
        config: &CairnConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingAdapter>,
        provider: Arc<dyn ProviderAdapter>,
    ) -> Result<Self, CairnError> {
        let store = Arc::new(MemoryStore::new(store, embedder, config.collections.clone()));
        if let Err(e) = store.ensure_collections().await {
            degrade_or_fail(e, "collections could not be prepared")?;
        }
        if let Err(e) = store.verify_dimensions().await {
            degrade_or_fail(e, "stored dimensions could not be checked")?;
        }

        let curation = Arc::new(CurationFilter::new(&config.curation)?);
        let recall = Arc::new(RecallOrchestrator::new(
            store.clone(),
            curation.clone(),
            &config.recall,
        ));
        let gate = Arc::new(IngestionGate::new(
            store.clone(),
            curation.clone(),
            &config.ingest,
        ));
        let archivist = Arc::new(Archivist::new(
            provider,
            store.clone(),
            curation.clone(),
            config.archivist.clone(),
        )?);
        let promoter = Arc::new(Promoter::new(store.clone(), curation.clone()));

        info!(
            dimensions = store.dimensions(),
            policy = ?curation.policy(),
            archivist = config.archivist.enabled,
            "memory system initialized"
        );
        Ok(Self {
            config: config.clone(),
            store,
            curation,
            recall,
            gate,
            archivist,
            promoter,
        })
    }

    pub fn config(&self) -> &CairnConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn curation(&self) -> &Arc<CurationFilter> {
        &self.curation
    }

    pub fn archivist(&self) -> &Arc<Archivist> {
        &self.archivist
    }

    pub fn promoter(&self) -> &Arc<Promoter> {
        &self.promoter
    }

    fn debug_recall(&self) -> bool {
        self.config.debug.enabled && self.config.debug.show_recall
    }

    /// Recall with the configured top-k and threshold.
    pub async fn recall(&self, text: &str) -> RecallResult {
        let query = RecallQuery::from_config(text, &self.config.recall, self.debug_recall());
        self.recall.recall(&query).await
    }

    pub async fn recall_query(&self, query: &RecallQuery) -> RecallResult {
        self.recall.recall(query).await
    }

    /// Persist one turn synchronously, bypassing the queue.
    pub async fn record_turn(&self, text: &str, role: Role, channel: Channel) -> RecordOutcome {
        self.gate.record_turn(text, role, channel, None).await
    }

    /// Seed a persona record.
    pub async fn add_persona_entry(
        &self,
        text: &str,
        importance: Option<f32>,
        style: Option<String>,
    ) -> RecordOutcome {
        let importance = importance.unwrap_or(self.config.ingest.default_importance);
        self.gate.add_persona_entry(text, importance, style).await
    }

    /// Run the archivist over one window, auto-promoting if configured.
    pub async fn run_archivist(&self, turns: &[Turn], options: &StageOptions) -> ExtractionReport {
        let report = self.archivist.process_window(turns, options).await;
        if self.config.archivist.auto_promote
            && !options.dry_run
            && report.outcome == WindowOutcome::Relevant
        {
            let promote = PromoteOptions {
                min_confidence: self.config.archivist.promote_min_confidence,
                ..PromoteOptions::default()
            };
            if let Err(e) = self.promoter.promote_ids(&report.staged, &promote).await {
                warn!(error = %e, "auto-promotion failed");
            }
        }
        report
    }

    /// Cut a transcript into windows and run each through the archivist.
    ///
    /// A failed window is counted and the batch continues.
    pub async fn extract_transcript(&self, turns: &[Turn], options: &BatchOptions) -> BatchReport {
        let windows = make_windows(
            turns,
            self.config.archivist.window_turns,
            options.stride,
            options.max_windows,
        );
        let mut batch = BatchReport::default();
        for (index, window) in windows.into_iter().enumerate() {
            let report = self.run_archivist(window, &options.stage).await;
            batch.windows += 1;
            match report.outcome {
                WindowOutcome::Relevant => batch.relevant += 1,
                WindowOutcome::Malformed | WindowOutcome::Unavailable => {
                    warn!(window = index, outcome = ?report.outcome, "window failed, continuing");
                    batch.failed += 1;
                }
                _ => {}
            }
            batch.staged += report.staged.len();
            batch.duplicates += report.duplicates;
            batch.reports.push(report);
        }
        info!(
            windows = batch.windows,
            relevant = batch.relevant,
            failed = batch.failed,
            staged = batch.staged,
            "transcript extraction complete"
        );
        batch
    }

    pub async fn promote(&self, options: &PromoteOptions) -> Result<PromotionReport, CairnError> {
        self.promoter.promote_candidates(options).await
    }

    /// Bulk-write facts into semantic or candidates, skipping known ids.
    pub async fn import(
        &self,
        target: ImportTarget,
        records: Vec<ImportRecord>,
        default_source: &str,
    ) -> Result<ImportReport, CairnError> {
        Importer::new(
            self.store.clone(),
            self.curation.clone(),
            self.config.archivist.candidate_importance,
        )
        .import(target, records, default_source)
        .await
    }

    /// Staged candidates, newest first.
    pub async fn candidates(&self, limit: usize) -> Result<Vec<VectorEntry>, CairnError> {
        self.store
            .list(&self.store.collections().candidates, limit)
            .await
    }

    pub async fn stats(&self) -> Result<MemoryStats, CairnError> {
        self.store.stats().await
    }

    /// Build host hooks backed by a freshly spawned persistence queue.
    ///
    /// Must be called inside a tokio runtime.
    pub fn hooks(&self) -> ConversationHooks {
        let queue = PersistenceQueue::spawn(self.gate.clone(), self.config.ingest.queue_capacity);
        let settings = HookSettings {
            record_user_turns: self.config.ingest.record_user_turns,
            record_assistant_turns: self.config.ingest.record_assistant_turns,
            archivist_enabled: self.config.archivist.enabled,
            window_turns: self.config.archivist.window_turns,
            min_new_turns: self.config.archivist.min_new_turns,
            auto_promote: self.config.archivist.auto_promote,
            promote_min_confidence: self.config.archivist.promote_min_confidence,
            log_episodic_store: self.config.debug.enabled && self.config.debug.episodic_store,
        };
        ConversationHooks::new(
            self.recall.clone(),
            RecallQuery::from_config("", &self.config.recall, self.debug_recall()),
            queue,
            self.archivist.clone(),
            self.promoter.clone(),
            settings,
        )
    }
}

/// A transient store failure at startup is logged and tolerated; anything
/// else (dimension mismatch, bad configuration) aborts initialization.
fn degrade_or_fail(error: CairnError, what: &str) -> Result<(), CairnError> {
    if error.is_transient() {
        warn!(error = %error, "{what}, starting degraded");
        Ok(())
    } else {
        Err(error)
    }
}
