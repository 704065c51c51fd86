// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic extraction pipeline (the archivist).
//!
//! A window of turns goes through the LLM under the extraction contract,
//! the answer is validated and distilled, and surviving facts are staged
//! as candidates. The archivist never writes to the semantic channel.
//!
//! Every failure mode (timeout, unreachable provider, malformed output)
//! ends the window as not relevant. Candidate ids are derived from the
//! window fingerprint, so an interrupted run can be repeated without
//! staging duplicates.

pub mod contract;
pub mod distill;
pub mod window;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use cairn_config::model::ArchivistConfig;
use cairn_core::types::{ProviderMessage, ProviderRequest};
use cairn_core::{CairnError, MemoryMetadata, ProviderAdapter, Role, VectorEntry};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::adapter::MemoryStore;
use crate::curation::CurationFilter;
use crate::fingerprint::{candidate_id, fingerprint, window_fingerprint};
use crate::types::Turn;

pub use contract::{Extraction, ExtractionContract, SemanticFact};
pub use distill::Distiller;
pub use window::{TurnBuffer, make_windows};

/// Provenance of candidates staged from live conversation.
pub const SOURCE_ARCHIVIST: &str = "archivist";
/// Tag carried by every staged candidate.
pub const CANDIDATE_TAG: &str = "candidate";

/// How a window ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    /// No turns to process.
    Empty,
    /// Identical to the last processed window.
    AlreadyProcessed,
    /// No user turn carried anything beyond small talk; the LLM was not called.
    SmallTalk,
    /// The model answered `relevant: false`, or nothing durable survived.
    NotRelevant,
    /// The model answer violated the contract.
    Malformed,
    /// The provider timed out or could not be reached.
    Unavailable,
    /// At least one durable fact survived.
    Relevant,
}

/// Staging options for one window.
#[derive(Debug, Clone)]
pub struct StageOptions {
    /// Provenance recorded on staged candidates.
    pub source: String,
    /// Facts below this confidence are not staged.
    pub min_confidence: f32,
    /// Extract and distill, but write nothing.
    pub dry_run: bool,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            source: SOURCE_ARCHIVIST.to_string(),
            min_confidence: 0.0,
            dry_run: false,
        }
    }
}

/// What happened to one window.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub window_fingerprint: String,
    pub outcome: WindowOutcome,
    /// Distilled facts that passed every check.
    pub facts: Vec<SemanticFact>,
    /// Ids of newly staged candidates.
    pub staged: Vec<String>,
    /// Candidates already staged by an earlier run of the same window.
    pub duplicates: usize,
    /// Facts dropped by distillation, heuristics or the confidence floor.
    pub rejected: usize,
}

impl ExtractionReport {
    fn ended(window_fingerprint: String, outcome: WindowOutcome) -> Self {
        Self {
            window_fingerprint,
            outcome,
            facts: vec![],
            staged: vec![],
            duplicates: 0,
            rejected: 0,
        }
    }
}

/// Out-of-band extractor of durable facts.
pub struct Archivist {
    provider: Arc<dyn ProviderAdapter>,
    store: Arc<MemoryStore>,
    curation: Arc<CurationFilter>,
    contract: ExtractionContract,
    distiller: Distiller,
    config: ArchivistConfig,
    last_window: Mutex<Option<String>>,
}

impl Archivist {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        store: Arc<MemoryStore>,
        curation: Arc<CurationFilter>,
        config: ArchivistConfig,
    ) -> Result<Self, CairnError> {
        Ok(Self {
            provider,
            store,
            curation,
            contract: ExtractionContract::new()?,
            distiller: Distiller::new()?,
            config,
            last_window: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ArchivistConfig {
        &self.config
    }

    /// Extract from the most recent `window_turns` turns and stage the result.
    pub async fn extract(&self, turns: &[Turn]) -> ExtractionReport {
        let start = turns.len().saturating_sub(self.config.window_turns);
        self.process_window(&turns[start..], &StageOptions::default())
            .await
    }

    /// Run one window through the full pipeline.
    pub async fn process_window(&self, turns: &[Turn], options: &StageOptions) -> ExtractionReport {
        let window_fp = window_fingerprint(turns);
        if turns.is_empty() {
            return ExtractionReport::ended(window_fp, WindowOutcome::Empty);
        }
        if self.last_window.lock().await.as_deref() == Some(window_fp.as_str()) {
            debug!(window = %short(&window_fp), "window already processed");
            return ExtractionReport::ended(window_fp, WindowOutcome::AlreadyProcessed);
        }

        let has_material = turns
            .iter()
            .any(|t| t.role == Role::User && !self.curation.is_small_talk(&t.text));
        if !has_material {
            debug!(window = %short(&window_fp), "window is small talk, not calling model");
            self.remember_window(&window_fp, options).await;
            return ExtractionReport::ended(window_fp, WindowOutcome::SmallTalk);
        }

        let extraction = match self.call_model(turns).await {
            Ok(extraction) => extraction,
            Err(e @ CairnError::MalformedExtraction(_)) => {
                warn!(window = %short(&window_fp), error = %e, "extraction rejected, treating as not relevant");
                self.remember_window(&window_fp, options).await;
                return ExtractionReport::ended(window_fp, WindowOutcome::Malformed);
            }
            Err(e) => {
                warn!(window = %short(&window_fp), error = %e, "extraction unavailable, treating as not relevant");
                return ExtractionReport::ended(window_fp, WindowOutcome::Unavailable);
            }
        };

        let mut report = self.curate_facts(window_fp, extraction, options);
        if !options.dry_run && self.stage(&mut report, options).await {
            self.remember_window(&report.window_fingerprint, options).await;
        }
        info!(
            window = %short(&report.window_fingerprint),
            facts = report.facts.len(),
            staged = report.staged.len(),
            duplicates = report.duplicates,
            rejected = report.rejected,
            "window processed"
        );
        report
    }

    /// Call the model under the configured timeout and parse its answer.
    async fn call_model(&self, turns: &[Turn]) -> Result<Extraction, CairnError> {
        let request = ProviderRequest {
            model: self.config.model.clone(),
            system_prompt: Some(contract::SYSTEM_PROMPT.to_string()),
            messages: vec![ProviderMessage {
                role: "user".to_string(),
                content: contract::render_window(turns)?,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            json_output: true,
        };

        let duration = Duration::from_secs(self.config.timeout_secs);
        let response = tokio::time::timeout(duration, self.provider.complete(request))
            .await
            .map_err(|_| CairnError::Timeout { duration })??;
        debug!(
            output_tokens = response.usage.output_tokens,
            "extraction response received"
        );
        self.contract.parse(&response.content)
    }

    /// Distill facts and apply the candidate heuristics.
    fn curate_facts(
        &self,
        window_fp: String,
        extraction: Extraction,
        options: &StageOptions,
    ) -> ExtractionReport {
        let Extraction::Relevant(raw) = extraction else {
            return ExtractionReport::ended(window_fp, WindowOutcome::NotRelevant);
        };

        let total = raw.len();
        let no_tags = BTreeSet::new();
        let mut seen = BTreeSet::new();
        let facts: Vec<SemanticFact> = raw
            .into_iter()
            .filter(|f| f.confidence >= options.min_confidence)
            .filter_map(|f| {
                let text = self.curation.strip_leading_greeting(&f.text);
                let text = self.distiller.distill(&text, &self.curation)?;
                Some(SemanticFact { text, ..f })
            })
            .filter(|f| !self.curation.is_low_value_candidate(&f.text, &no_tags))
            .filter(|f| seen.insert(fingerprint(&f.text)))
            .collect();

        let outcome = if facts.is_empty() {
            WindowOutcome::NotRelevant
        } else {
            WindowOutcome::Relevant
        };
        ExtractionReport {
            window_fingerprint: window_fp,
            outcome,
            rejected: total - facts.len(),
            facts,
            staged: vec![],
            duplicates: 0,
        }
    }

    /// Write surviving facts to the candidates collection.
    ///
    /// Returns false if any fact could not be staged, so the window stays
    /// eligible for a rerun.
    async fn stage(&self, report: &mut ExtractionReport, options: &StageOptions) -> bool {
        let collection = self.store.collections().candidates.clone();
        let mut complete = true;
        for fact in &report.facts {
            let id = candidate_id(&report.window_fingerprint, &fingerprint(&fact.text));
            match self.store.exists(&collection, &id).await {
                Ok(true) => {
                    report.duplicates += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(id = %id, error = %e, "candidate lookup failed, skipping");
                    complete = false;
                    continue;
                }
            }

            let embedding = match self.store.embed(&fact.text).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!(id = %id, error = %e, "candidate embedding failed, skipping");
                    complete = false;
                    continue;
                }
            };
            let mut metadata = MemoryMetadata::new(
                self.config.candidate_importance,
                fact.confidence,
                Role::User,
            );
            metadata.category = Some(fact.category);
            metadata.source = Some(options.source.clone());
            metadata.tags.insert(CANDIDATE_TAG.to_string());

            let entry = VectorEntry {
                id: id.clone(),
                text: fact.text.clone(),
                embedding,
                metadata: metadata.normalized(),
            };
            match self.store.write_entry(&collection, entry).await {
                Ok(()) => report.staged.push(id),
                Err(e) => {
                    warn!(id = %id, error = %e, "candidate write failed");
                    complete = false;
                }
            }
        }
        complete
    }

    async fn remember_window(&self, window_fp: &str, options: &StageOptions) {
        if !options.dry_run {
            *self.last_window.lock().await = Some(window_fp.to_string());
        }
    }
}

fn short(fp: &str) -> &str {
    &fp[..12.min(fp.len())]
}
