// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cairn export`, `cairn import` and `cairn seed`.
//!
//! Export writes one JSON object per line; import reads the same rows
//! back. Seed files are YAML:
//!
//! ```yaml
//! seed_facts:
//!   - User is vegetarian
//! seed_meta_defaults:
//!   category: constraint
//!   confidence: 0.95
//! ```

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use cairn_core::{CairnError, Channel, FactCategory, Role};
use cairn_memory::{
    ImportRecord, ImportReport, ImportTarget, MemorySystem, StageOptions, Turn, WindowOutcome,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::memory::entry_json;

/// Provenance of rows staged by a seed file without their own.
const SEED_SOURCE: &str = "seed";
/// Provenance of facts the archivist extracts from seed lines.
const ONBOARDING_SOURCE: &str = "semantic_onboarding";

pub async fn run_export(
    system: &MemorySystem,
    target: ImportTarget,
    out: Option<&Path>,
) -> Result<(), CairnError> {
    let store = system.store();
    let collection = match target {
        ImportTarget::Semantic => store.collection(Channel::Semantic).to_string(),
        ImportTarget::Candidates => store.collections().candidates.clone(),
    };
    let total = store.count(&collection).await?;
    let entries = store.list(&collection, total).await?;

    let io_err = |e: std::io::Error| CairnError::Internal(format!("export output: {e}"));
    match out {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| CairnError::Config(format!("cannot create {}: {e}", path.display())))?;
            let mut writer = BufWriter::new(file);
            for entry in &entries {
                writeln!(writer, "{}", entry_json(entry)).map_err(io_err)?;
            }
            writer.flush().map_err(io_err)?;
            eprintln!("exported {} record(s) from {collection} to {}", entries.len(), path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            for entry in &entries {
                writeln!(lock, "{}", entry_json(entry)).map_err(io_err)?;
            }
        }
    }
    Ok(())
}

pub async fn run_import(
    system: &MemorySystem,
    file: &Path,
    target: ImportTarget,
    source: &str,
) -> Result<(), CairnError> {
    let content = read(file)?;
    let records = parse_jsonl(&content)
        .map_err(|e| CairnError::Config(format!("invalid import file {}: {e}", file.display())))?;
    let report = system.import(target, records, source).await?;
    println!("{}", import_summary(&report));
    Ok(())
}

/// Every non-blank line must be a JSON object; nothing is written if any
/// line is malformed.
fn parse_jsonl(content: &str) -> Result<Vec<ImportRecord>, String> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| serde_json::from_str(line).map_err(|e| format!("line {}: {e}", n + 1)))
        .collect()
}

fn import_summary(report: &ImportReport) -> String {
    format!(
        "{} read, {} added, {} duplicate(s), {} rejected, {} failed",
        report.read,
        report.added.len(),
        report.duplicates,
        report.rejected,
        report.failed
    )
}

#[derive(Debug, Default, Deserialize)]
struct SeedFile {
    #[serde(default)]
    seed_facts: Vec<String>,
    #[serde(default)]
    seed_meta_defaults: SeedDefaults,
}

#[derive(Debug, Default, Deserialize)]
struct SeedDefaults {
    category: Option<FactCategory>,
    confidence: Option<f32>,
    importance: Option<f32>,
    source: Option<String>,
    #[serde(default)]
    tags: BTreeSet<String>,
}

fn parse_seed(content: &str) -> Result<SeedFile, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(SeedFile::default());
    }
    serde_yaml::from_str(content)
}

impl SeedFile {
    fn records(self) -> Vec<ImportRecord> {
        let defaults = self.seed_meta_defaults;
        self.seed_facts
            .into_iter()
            .map(|fact| fact.trim().to_string())
            .filter(|fact| !fact.is_empty())
            .map(|text| ImportRecord {
                text,
                category: defaults.category,
                confidence: defaults.confidence,
                importance: defaults.importance,
                source: defaults.source.clone(),
                tags: defaults.tags.clone(),
                ..ImportRecord::default()
            })
            .collect()
    }
}

/// Seed facts from a YAML file.
///
/// Facts are written as given, or with `extract` each line is first run
/// through the archivist and only what it distills is staged.
pub async fn run_seed(
    system: &MemorySystem,
    file: &Path,
    target: ImportTarget,
    extract: bool,
) -> Result<(), CairnError> {
    let content = read(file)?;
    let seed = parse_seed(&content)
        .map_err(|e| CairnError::Config(format!("invalid seed file {}: {e}", file.display())))?;
    if seed.seed_facts.is_empty() {
        return Err(CairnError::Config(format!(
            "no seed_facts found in {}",
            file.display()
        )));
    }

    if extract {
        return seed_through_archivist(system, seed).await;
    }
    let report = system.import(target, seed.records(), SEED_SOURCE).await?;
    for id in &report.added {
        println!("+ {id}");
    }
    println!("{}", import_summary(&report));
    Ok(())
}

async fn seed_through_archivist(system: &MemorySystem, seed: SeedFile) -> Result<(), CairnError> {
    if !system.config().archivist.enabled {
        return Err(CairnError::Config(
            "archivist.enabled must be true to seed with --extract".into(),
        ));
    }
    let options = StageOptions {
        source: ONBOARDING_SOURCE.to_string(),
        ..StageOptions::default()
    };
    let mut staged = 0;
    for line in seed.records() {
        let report = system
            .run_archivist(&[Turn::new(Role::User, line.text.as_str())], &options)
            .await;
        match report.outcome {
            WindowOutcome::Relevant => {
                for id in &report.staged {
                    println!("+ {id}");
                }
                staged += report.staged.len();
            }
            WindowOutcome::Malformed | WindowOutcome::Unavailable => {
                warn!(line = %line.text, outcome = ?report.outcome, "seed line failed");
            }
            other => {
                info!(line = %line.text, outcome = ?other, "seed line yielded no facts");
            }
        }
    }
    println!("{staged} candidate(s) staged");
    Ok(())
}

fn read(file: &Path) -> Result<String, CairnError> {
    std::fs::read_to_string(file)
        .map_err(|e| CairnError::Config(format!("cannot read {}: {e}", file.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_defaults_apply_to_every_fact() {
        let seed = parse_seed(
            "seed_facts:\n  - User is vegetarian\n  - '  '\n  - User owns a kayak\nseed_meta_defaults:\n  category: constraint\n  confidence: 0.95\n  tags: [onboarding]\n",
        )
        .unwrap();
        let records = seed.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text, "User owns a kayak");
        assert_eq!(records[0].category, Some(FactCategory::Constraint));
        assert_eq!(records[0].confidence, Some(0.95));
        assert!(records[0].source.is_none());
        assert!(records[1].tags.contains("onboarding"));
    }

    #[test]
    fn empty_seed_document_has_no_facts() {
        assert!(parse_seed("").unwrap().seed_facts.is_empty());
        assert!(parse_seed("seed_facts: 3").is_err());
    }

    #[test]
    fn malformed_jsonl_names_the_line() {
        let err = parse_jsonl("{\"text\": \"User is vegetarian\"}\n\nnot json\n").unwrap_err();
        assert!(err.starts_with("line 3:"), "{err}");
        let rows = parse_jsonl("{\"text\": \"a\"}\n\n{\"text\": \"b\"}\n").unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn import_summary_lists_every_count() {
        let report = ImportReport {
            read: 3,
            added: vec!["semantic-a".into()],
            duplicates: 1,
            rejected: 1,
            failed: 0,
        };
        assert_eq!(
            import_summary(&report),
            "3 read, 1 added, 1 duplicate(s), 1 rejected, 0 failed"
        );
    }
}
