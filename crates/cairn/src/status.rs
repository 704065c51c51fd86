// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cairn status` command implementation.
//!
//! Runs each adapter check in turn and reports per-collection counts.
//! Later checks are skipped when the store cannot be opened.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cairn_config::model::CairnConfig;
use cairn_core::{CairnError, EmbeddingAdapter, HealthStatus, PluginAdapter};
use cairn_memory::{MemoryStats, MemoryStore};
use cairn_openai::{OpenAiCompatEmbedder, OpenAiCompatProvider};
use serde::Serialize;

/// Status of a diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Structured output for `--json` mode.
#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    agent: &'a str,
    checks: Vec<JsonCheck<'a>>,
    collections: Option<&'a MemoryStats>,
}

#[derive(Debug, Serialize)]
struct JsonCheck<'a> {
    name: &'a str,
    status: CheckStatus,
    message: &'a str,
    duration_ms: u128,
}

/// Run the `cairn status` command.
///
/// Fails when any check fails, so scripts can rely on the exit code.
pub async fn run_status(config: &CairnConfig, json: bool, plain: bool) -> Result<(), CairnError> {
    let (results, stats) = run_checks(config).await;

    if json {
        let report = StatusReport {
            agent: &config.agent.name,
            checks: results
                .iter()
                .map(|r| JsonCheck {
                    name: &r.name,
                    status: r.status,
                    message: &r.message,
                    duration_ms: r.duration.as_millis(),
                })
                .collect(),
            collections: stats.as_ref(),
        };
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| CairnError::Internal(e.to_string()))?;
        println!("{out}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        println!();
        println!("  cairn status ({})", config.agent.name);
        println!("  {}", "-".repeat(50));
        for result in &results {
            println!("{}", format_check(result, use_color));
        }
        if let Some(stats) = &stats {
            println!();
            for (collection, count) in &stats.collections {
                println!("    {collection:<20} {count}");
            }
        }
        println!();
    }

    let failed = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    if failed > 0 {
        return Err(CairnError::Internal(format!("{failed} check(s) failed")));
    }
    Ok(())
}

async fn run_checks(config: &CairnConfig) -> (Vec<CheckResult>, Option<MemoryStats>) {
    let mut results = Vec::new();

    let start = Instant::now();
    let store = match cairn_storage::open_store(&config.storage).await {
        Ok(store) => {
            results.push(CheckResult::new(
                "Store",
                CheckStatus::Pass,
                format!("{:?} backend", config.storage.backend).to_lowercase(),
                start,
            ));
            store
        }
        Err(e) => {
            results.push(CheckResult::new("Store", CheckStatus::Fail, e.to_string(), start));
            return (results, None);
        }
    };

    let start = Instant::now();
    let embedder: Arc<dyn EmbeddingAdapter> = match OpenAiCompatEmbedder::new(&config.embedding) {
        Ok(embedder) => Arc::new(embedder),
        Err(e) => {
            results.push(CheckResult::new("Embedding", CheckStatus::Fail, e.to_string(), start));
            return (results, None);
        }
    };
    let memory = MemoryStore::new(store, embedder, config.collections.clone());

    results.push(check_embedding(&memory).await);
    results.push(check_collections(&memory).await);
    results.push(check_archivist(config).await);

    let stats = memory.stats().await.ok();
    (results, stats)
}

async fn check_embedding(memory: &MemoryStore) -> CheckResult {
    let start = Instant::now();
    match memory.embed("cairn status check").await {
        Ok(vector) => CheckResult::new(
            "Embedding",
            CheckStatus::Pass,
            format!("{} dimensions", vector.len()),
            start,
        ),
        Err(e) => CheckResult::new("Embedding", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Collections exist and every stored vector matches the active model.
async fn check_collections(memory: &MemoryStore) -> CheckResult {
    let start = Instant::now();
    if let Err(e) = memory.ensure_collections().await {
        return CheckResult::new("Collections", CheckStatus::Fail, e.to_string(), start);
    }
    match memory.verify_dimensions().await {
        Ok(()) => CheckResult::new(
            "Collections",
            CheckStatus::Pass,
            format!("consistent at {} dimensions", memory.dimensions()),
            start,
        ),
        Err(e) => CheckResult::new("Collections", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_archivist(config: &CairnConfig) -> CheckResult {
    let start = Instant::now();
    if !config.archivist.enabled {
        return CheckResult::new(
            "Archivist",
            CheckStatus::Warn,
            "disabled (batch extraction still available)",
            start,
        );
    }
    let provider = match OpenAiCompatProvider::new(&config.archivist) {
        Ok(provider) => provider,
        Err(e) => return CheckResult::new("Archivist", CheckStatus::Fail, e.to_string(), start),
    };
    match provider.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new(
            "Archivist",
            CheckStatus::Pass,
            format!("{} at {}", config.archivist.model, config.archivist.base_url),
            start,
        ),
        Ok(other) => CheckResult::new("Archivist", CheckStatus::Warn, format!("{other:?}"), start),
        Err(e) => CheckResult::new("Archivist", CheckStatus::Fail, e.to_string(), start),
    }
}

fn format_check(result: &CheckResult, use_color: bool) -> String {
    let ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!("    {symbol} {:<20} {message} ({ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!("    {tag} {:<20} {} ({ms}ms)", result.name, result.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: CheckStatus) -> CheckResult {
        CheckResult {
            name: "Embedding".into(),
            status,
            message: "768 dimensions".into(),
            duration: Duration::from_millis(12),
        }
    }

    #[test]
    fn plain_output_uses_bracket_tags() {
        assert_eq!(
            format_check(&result(CheckStatus::Pass), false),
            "    [OK]   Embedding            768 dimensions (12ms)"
        );
        assert!(format_check(&result(CheckStatus::Fail), false).starts_with("    [FAIL] Embedding"));
    }

    #[tokio::test]
    async fn disabled_archivist_is_a_warning() {
        let config = CairnConfig::default();
        let check = check_archivist(&config).await;
        assert_eq!(check.status, CheckStatus::Warn);
    }

    #[test]
    fn check_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&CheckStatus::Warn).unwrap(), "\"warn\"");
    }
}
