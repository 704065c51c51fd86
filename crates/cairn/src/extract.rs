// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cairn extract` and `cairn promote`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use cairn_core::CairnError;
use cairn_memory::{
    BatchOptions, BatchReport, ExtractionReport, MemorySystem, PromoteOptions, PromotionReport,
    StageOptions,
};
use serde_json::json;
use tracing::info;

use crate::transcript;

#[derive(Debug)]
pub struct ExtractArgs {
    pub transcript: PathBuf,
    pub stride: usize,
    pub max_windows: Option<usize>,
    pub dry_run: bool,
    pub min_confidence: f32,
    pub source: String,
    pub review_out: Option<PathBuf>,
}

pub async fn run_extract(system: &MemorySystem, args: &ExtractArgs) -> Result<(), CairnError> {
    let transcripts = transcript::load(&args.transcript)?;
    let options = BatchOptions {
        stride: args.stride,
        max_windows: args.max_windows,
        stage: StageOptions {
            source: args.source.clone(),
            min_confidence: args.min_confidence,
            dry_run: args.dry_run,
        },
    };

    let mut review = match &args.review_out {
        Some(path) => Some(BufWriter::new(File::create(path).map_err(|e| {
            CairnError::Config(format!("cannot create {}: {e}", path.display()))
        })?)),
        None => None,
    };

    let mut total = BatchReport::default();
    for t in &transcripts {
        info!(transcript = %t.name, turns = t.turns.len(), "extracting");
        let batch = system.extract_transcript(&t.turns, &options).await;
        if let Some(out) = review.as_mut() {
            write_review(out, &t.name, &batch.reports)
                .map_err(|e| CairnError::Internal(format!("review output: {e}")))?;
        }
        total.windows += batch.windows;
        total.relevant += batch.relevant;
        total.failed += batch.failed;
        total.staged += batch.staged;
        total.duplicates += batch.duplicates;
    }
    if let Some(mut out) = review {
        out.flush()
            .map_err(|e| CairnError::Internal(format!("review output: {e}")))?;
    }

    println!("{}", summary(&total, transcripts.len(), args.dry_run));
    Ok(())
}

/// One JSONL row per distilled fact, for human review before promotion.
fn write_review(
    out: &mut impl Write,
    transcript: &str,
    reports: &[ExtractionReport],
) -> std::io::Result<()> {
    for (window, report) in reports.iter().enumerate() {
        for fact in &report.facts {
            let row = json!({
                "transcript": transcript,
                "window": window,
                "window_fingerprint": report.window_fingerprint,
                "text": fact.text,
                "category": fact.category,
                "confidence": fact.confidence,
            });
            writeln!(out, "{row}")?;
        }
    }
    Ok(())
}

fn summary(total: &BatchReport, files: usize, dry_run: bool) -> String {
    let staged = if dry_run {
        "dry run, nothing staged".to_string()
    } else {
        format!("{} staged, {} already staged", total.staged, total.duplicates)
    };
    format!(
        "{files} transcript(s), {} window(s): {} relevant, {} failed; {staged}",
        total.windows, total.relevant, total.failed
    )
}

pub async fn run_promote(
    system: &MemorySystem,
    options: &PromoteOptions,
    ids: &[String],
) -> Result<(), CairnError> {
    let report = if ids.is_empty() {
        system.promote(options).await?
    } else {
        system.promoter().promote_ids(ids, options).await?
    };
    print_promotion(&report);
    Ok(())
}

fn print_promotion(report: &PromotionReport) {
    for id in &report.promoted {
        println!("promoted {id}");
    }
    println!(
        "{} promoted, {} already promoted, {} skipped ({} scanned)",
        report.promoted.len(),
        report.already_promoted,
        report.skipped,
        report.scanned
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::FactCategory;
    use cairn_memory::WindowOutcome;
    use cairn_memory::archivist::SemanticFact;

    #[test]
    fn review_rows_are_one_line_per_fact() {
        let report = ExtractionReport {
            window_fingerprint: "abc".into(),
            outcome: WindowOutcome::Relevant,
            facts: vec![
                SemanticFact {
                    text: "User is vegetarian".into(),
                    category: FactCategory::Constraint,
                    confidence: 0.95,
                },
                SemanticFact {
                    text: "User works as a nurse".into(),
                    category: FactCategory::Identity,
                    confidence: 0.9,
                },
            ],
            staged: vec![],
            duplicates: 0,
            rejected: 0,
        };
        let mut out = Vec::new();
        write_review(&mut out, "normalized_a.json", &[report]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["category"], "constraint");
        assert_eq!(rows[1]["text"], "User works as a nurse");
        assert_eq!(rows[1]["window"], 0);
    }

    #[test]
    fn dry_run_summary_says_nothing_staged() {
        let total = BatchReport {
            windows: 4,
            relevant: 2,
            failed: 1,
            ..BatchReport::default()
        };
        let line = summary(&total, 1, true);
        assert!(line.contains("4 window(s)"));
        assert!(line.contains("dry run, nothing staged"));
    }
}
