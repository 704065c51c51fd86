// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cairn recall`, `cairn remember` and `cairn candidates`.

use cairn_core::{CairnError, Channel, Role, VectorEntry};
use cairn_memory::{MemorySystem, RecallQuery, RecallResult, RecordOutcome};
use serde_json::json;

use crate::WritableChannel;

pub async fn run_recall(
    system: &MemorySystem,
    text: &str,
    debug: bool,
    as_json: bool,
) -> Result<(), CairnError> {
    let query = RecallQuery::from_config(text, &system.config().recall, debug);
    let result = system.recall_query(&query).await;

    if as_json {
        println!("{}", to_pretty(&recall_json(&result))?);
        return Ok(());
    }
    if let Some(snapshot) = &result.debug_snapshot {
        eprintln!("{snapshot}");
    }
    for channel in &result.skipped_channels {
        eprintln!("warning: {channel} channel skipped (unavailable)");
    }
    if result.is_empty() {
        println!("(no memories recalled)");
    } else {
        println!("{}", result.injection_block);
    }
    Ok(())
}

fn recall_json(result: &RecallResult) -> serde_json::Value {
    let memories: Vec<_> = result
        .memories
        .iter()
        .map(|hit| {
            json!({
                "channel": hit.channel,
                "id": hit.entry.id,
                "text": hit.entry.text,
                "score": hit.score,
                "distance": hit.distance,
                "importance": hit.entry.metadata.importance,
            })
        })
        .collect();
    json!({
        "injection_block": result.injection_block,
        "memories": memories,
        "skipped_channels": result.skipped_channels,
        "debug": result.debug_snapshot,
    })
}

pub async fn run_remember(
    system: &MemorySystem,
    text: &str,
    channel: WritableChannel,
    importance: Option<f32>,
    style: Option<String>,
) -> Result<(), CairnError> {
    let outcome = match channel {
        WritableChannel::Persona => system.add_persona_entry(text, importance, style).await,
        WritableChannel::Episodic => {
            if importance.is_some() || style.is_some() {
                eprintln!("note: --importance and --style only apply to persona records");
            }
            system.record_turn(text, Role::User, Channel::Episodic).await
        }
    };
    match &outcome {
        RecordOutcome::Stored { id } | RecordOutcome::Duplicate { id } => {
            println!("{} {id}", outcome.label());
            Ok(())
        }
        RecordOutcome::Unavailable => Err(CairnError::unavailable(
            "memory store",
            "record was not written",
        )),
        other => {
            println!("{}", other.label());
            Ok(())
        }
    }
}

pub async fn run_candidates(
    system: &MemorySystem,
    limit: usize,
    semantic: bool,
    as_json: bool,
) -> Result<(), CairnError> {
    let entries = if semantic {
        let store = system.store();
        store.list(store.collection(Channel::Semantic), limit).await?
    } else {
        system.candidates(limit).await?
    };

    if as_json {
        let rows: Vec<_> = entries.iter().map(entry_json).collect();
        println!("{}", to_pretty(&rows)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("(none)");
    }
    for entry in &entries {
        println!("{}", entry_line(entry));
    }
    Ok(())
}

pub(crate) fn entry_json(entry: &VectorEntry) -> serde_json::Value {
    let meta = &entry.metadata;
    json!({
        "id": entry.id,
        "text": entry.text,
        "category": meta.category,
        "confidence": meta.confidence,
        "importance": meta.importance,
        "source": meta.source,
        "tags": meta.tags,
        "timestamp": meta.timestamp.to_rfc3339(),
    })
}

fn entry_line(entry: &VectorEntry) -> String {
    let meta = &entry.metadata;
    let category = meta
        .category
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".into());
    format!(
        "{:<24} {:<12} conf={:.2} src={:<10} {}",
        entry.id,
        category,
        meta.confidence,
        meta.source.as_deref().unwrap_or("-"),
        entry.text
    )
}

fn to_pretty<T: serde::Serialize>(value: &T) -> Result<String, CairnError> {
    serde_json::to_string_pretty(value).map_err(|e| CairnError::Internal(e.to_string()))
}
