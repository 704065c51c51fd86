// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recall orchestrator: one pass per inbound user turn.
//!
//! The query is embedded once, every enabled channel is searched
//! concurrently, and the survivors of curation and the importance
//! threshold are ranked per channel and rendered into an injection block.
//! Recall never fails: an unavailable channel is skipped and logged.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::Arc;

use cairn_config::model::{RecallConfig, ScoreTransform};
use cairn_core::{CairnError, Channel, Neighbor};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::adapter::MemoryStore;
use crate::curation::{CurationFilter, Decision};
use crate::types::ScoredHit;

/// Characters of each record shown in the debug snapshot.
const SNAPSHOT_TEXT_LIMIT: usize = 200;

/// One recall request.
#[derive(Debug, Clone)]
pub struct RecallQuery {
    pub text: String,
    /// Channels absent from the map, or mapped to zero, are not queried.
    pub top_k: BTreeMap<Channel, usize>,
    pub importance_threshold: f32,
    /// Also produce a human-readable snapshot of every survivor.
    pub debug: bool,
    /// Record ids never returned, e.g. the turn being answered.
    pub exclude_ids: BTreeSet<String>,
}

impl RecallQuery {
    /// Query using the configured per-channel top-k and threshold.
    pub fn from_config(text: impl Into<String>, config: &RecallConfig, debug: bool) -> Self {
        Self {
            text: text.into(),
            top_k: Channel::ALL
                .iter()
                .map(|&c| (c, config.topk(c)))
                .collect(),
            importance_threshold: config.importance_threshold,
            debug,
            exclude_ids: BTreeSet::new(),
        }
    }
}

/// Ranked recall output for one turn.
#[derive(Debug, Clone, Default)]
pub struct RecallResult {
    /// Survivors grouped by channel in section order, best first within a channel.
    pub memories: Vec<ScoredHit>,
    /// Text to prepend to the user turn. Empty when nothing survived.
    pub injection_block: String,
    /// Present only when the query asked for it.
    pub debug_snapshot: Option<String>,
    /// Channels whose collection could not be queried.
    pub skipped_channels: Vec<Channel>,
}

impl RecallResult {
    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    /// Hits from one channel, best first.
    pub fn channel(&self, channel: Channel) -> impl Iterator<Item = &ScoredHit> {
        self.memories.iter().filter(move |h| h.channel == channel)
    }
}

/// Map a cosine distance in `[0, 2]` to a score where higher is more relevant.
pub fn similarity(transform: ScoreTransform, distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    match transform {
        ScoreTransform::Normalized => (1.0 - distance / 2.0).clamp(0.0, 1.0),
        ScoreTransform::Inverse => 1.0 / (1.0 + distance.max(0.0)),
    }
}

/// Score descending, then importance descending, then newest first.
pub fn rank_order(a: &ScoredHit, b: &ScoredHit) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| {
            b.entry
                .metadata
                .importance
                .total_cmp(&a.entry.metadata.importance)
        })
        .then_with(|| b.entry.metadata.timestamp.cmp(&a.entry.metadata.timestamp))
}

/// Render one section per channel, in `order`, each line `[channel] text`.
pub fn render_injection_block(hits: &[ScoredHit], order: &[Channel]) -> String {
    let mut sections = Vec::new();
    for &channel in order {
        let lines: Vec<String> = hits
            .iter()
            .filter(|h| h.channel == channel)
            .map(|h| format!("[{}] {}", channel, h.entry.text))
            .collect();
        if lines.is_empty() {
            continue;
        }
        sections.push(format!(
            "### Relevant {} Memory\n{}",
            title_case(channel.as_str()),
            lines.join("\n")
        ));
    }
    sections.join("\n\n")
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Merges ranked results from every memory channel.
pub struct RecallOrchestrator {
    store: Arc<MemoryStore>,
    curation: Arc<CurationFilter>,
    order: Vec<Channel>,
    transform: ScoreTransform,
    min_score: f32,
}

impl RecallOrchestrator {
    pub fn new(store: Arc<MemoryStore>, curation: Arc<CurationFilter>, config: &RecallConfig) -> Self {
        Self {
            store,
            curation,
            order: config.channel_order.clone(),
            transform: config.score_transform,
            min_score: config.min_score,
        }
    }

    /// Section order of the injection block.
    pub fn channel_order(&self) -> &[Channel] {
        &self.order
    }

    /// Run one recall pass. Never returns an error.
    pub async fn recall(&self, query: &RecallQuery) -> RecallResult {
        let channels: Vec<(Channel, usize)> = self
            .order
            .iter()
            .filter_map(|&c| match query.top_k.get(&c) {
                Some(&k) if k > 0 => Some((c, k)),
                _ => None,
            })
            .collect();
        if channels.is_empty() || query.text.trim().is_empty() {
            return RecallResult::default();
        }

        let embedding = match self.store.embed(&query.text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "recall query could not be embedded, skipping all channels");
                return RecallResult {
                    skipped_channels: channels.iter().map(|(c, _)| *c).collect(),
                    ..RecallResult::default()
                };
            }
        };

        let lookups = channels.iter().map(|&(channel, k)| {
            let embedding = &embedding;
            async move {
                let collection = self.store.collection(channel);
                (channel, self.store.query_vector(collection, embedding, k).await)
            }
        });
        let outcomes = join_all(lookups).await;

        let mut result = RecallResult::default();
        for (channel, outcome) in outcomes {
            match outcome {
                Ok(neighbors) => {
                    let mut hits = self.curate(channel, neighbors, query);
                    hits.sort_by(rank_order);
                    debug!(channel = %channel, hits = hits.len(), "channel recall complete");
                    result.memories.extend(hits);
                }
                Err(e) => self.skip(&mut result, channel, &e),
            }
        }

        result.injection_block = render_injection_block(&result.memories, &self.order);
        if query.debug {
            let snapshot = self.snapshot(&result);
            debug!("{snapshot}");
            result.debug_snapshot = Some(snapshot);
        }
        result
    }

    fn skip(&self, result: &mut RecallResult, channel: Channel, error: &CairnError) {
        warn!(channel = %channel, error = %error, "channel unavailable, skipping");
        result.skipped_channels.push(channel);
    }

    fn curate(&self, channel: Channel, neighbors: Vec<Neighbor>, query: &RecallQuery) -> Vec<ScoredHit> {
        neighbors
            .into_iter()
            .filter(|n| !query.exclude_ids.contains(&n.entry.id))
            .filter_map(|n| {
                let mut score = similarity(self.transform, n.distance);
                match self.curation.evaluate(&n.entry.text, &n.entry.metadata) {
                    Decision::Suppress => return None,
                    Decision::Downweight(factor) => score *= factor,
                    Decision::Keep => {}
                }
                if n.entry.metadata.importance < query.importance_threshold || score < self.min_score {
                    return None;
                }
                Some(ScoredHit {
                    channel,
                    entry: n.entry,
                    distance: n.distance,
                    score,
                })
            })
            .collect()
    }

    fn snapshot(&self, result: &RecallResult) -> String {
        let mut out = String::from("=== Recall Snapshot ===\n");
        for &channel in &self.order {
            if result.skipped_channels.contains(&channel) {
                let _ = writeln!(out, "--- {channel}: unavailable ---");
                continue;
            }
            let hits: Vec<&ScoredHit> = result.channel(channel).collect();
            let _ = writeln!(out, "--- {channel} ({}) ---", hits.len());
            for (i, hit) in hits.iter().enumerate() {
                let text: String = hit.entry.text.chars().take(SNAPSHOT_TEXT_LIMIT).collect();
                let _ = writeln!(
                    out,
                    "[{i}] score={:.3} importance={:.2} id={} | {text}",
                    hit.score, hit.entry.metadata.importance, hit.entry.id
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::{MemoryMetadata, Role, VectorEntry};
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    fn hit(channel: Channel, text: &str, score: f32, importance: f32) -> ScoredHit {
        ScoredHit {
            channel,
            entry: VectorEntry {
                id: text.to_string(),
                text: text.to_string(),
                embedding: vec![],
                metadata: MemoryMetadata::new(importance, 1.0, Role::User),
            },
            distance: 0.0,
            score,
        }
    }

    #[test]
    fn normalized_transform_bounds() {
        assert_eq!(similarity(ScoreTransform::Normalized, 0.0), 1.0);
        assert_eq!(similarity(ScoreTransform::Normalized, 2.0), 0.0);
        assert_eq!(similarity(ScoreTransform::Normalized, 1.0), 0.5);
        assert_eq!(similarity(ScoreTransform::Inverse, 0.0), 1.0);
        assert_eq!(similarity(ScoreTransform::Inverse, 1.0), 0.5);
        assert_eq!(similarity(ScoreTransform::Normalized, f32::NAN), 0.0);
    }

    #[test]
    fn ties_break_on_importance_then_recency() {
        let mut older = hit(Channel::Episodic, "older", 0.5, 0.7);
        older.entry.metadata.timestamp = Utc::now() - Duration::hours(2);
        let newer = hit(Channel::Episodic, "newer", 0.5, 0.7);
        let important = hit(Channel::Episodic, "important", 0.5, 0.9);
        let best = hit(Channel::Episodic, "best", 0.8, 0.1);

        let mut hits = vec![older, newer, important, best];
        hits.sort_by(rank_order);
        let ids: Vec<&str> = hits.iter().map(|h| h.entry.id.as_str()).collect();
        assert_eq!(ids, ["best", "important", "newer", "older"]);
    }

    #[test]
    fn block_sections_follow_channel_order() {
        let hits = vec![
            hit(Channel::Episodic, "we talked about tides", 0.9, 0.7),
            hit(Channel::Persona, "I am Orion", 0.8, 0.9),
        ];
        let block = render_injection_block(&hits, &Channel::ALL);
        assert_eq!(
            block,
            "### Relevant Persona Memory\n[persona] I am Orion\n\n\
             ### Relevant Episodic Memory\n[episodic] we talked about tides"
        );
        assert!(render_injection_block(&[], &Channel::ALL).is_empty());
    }

    #[test]
    fn block_omits_channels_not_in_order() {
        let hits = vec![hit(Channel::Semantic, "User prefers tea", 0.9, 0.8)];
        assert!(render_injection_block(&hits, &[Channel::Persona]).is_empty());
    }

    proptest! {
        #[test]
        fn transforms_are_monotonic(a in 0.0f32..2.0, b in 0.0f32..2.0) {
            prop_assume!(a < b);
            for t in [ScoreTransform::Normalized, ScoreTransform::Inverse] {
                prop_assert!(similarity(t, a) >= similarity(t, b));
            }
        }

        #[test]
        fn ranked_scores_never_increase(scores in proptest::collection::vec(0.0f32..1.0, 0..20)) {
            let mut hits: Vec<ScoredHit> = scores
                .iter()
                .enumerate()
                .map(|(i, &s)| hit(Channel::Semantic, &i.to_string(), s, 0.5))
                .collect();
            hits.sort_by(rank_order);
            prop_assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }
}
