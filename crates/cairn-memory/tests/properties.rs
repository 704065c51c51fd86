// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invariants of recall, ingestion, extraction and promotion.

use cairn_core::{Channel, MemoryMetadata, Role};
use cairn_memory::promote::PromoteOutcome;
use cairn_memory::{
    ImportRecord, ImportTarget, MemorySystem, PromoteOptions, RecallQuery, RecordOutcome,
    StageOptions, Turn, WindowOutcome,
};
use cairn_test_utils::TestHarness;
use proptest::prelude::*;

const WORDS: &[&str] = &[
    "river", "lantern", "cedar", "harbor", "quiet", "north", "copper", "meadow", "ember", "tide",
];

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn system(harness: &TestHarness) -> MemorySystem {
    MemorySystem::initialize(
        &harness.config,
        harness.store.clone(),
        harness.embedding_adapter(),
        harness.provider_adapter(),
    )
    .await
    .unwrap()
}

fn phrase() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 2..6).prop_map(|w| w.join(" "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn recall_respects_threshold_and_order(
        records in prop::collection::vec((phrase(), 0.0f32..=1.0), 1..12),
        query in phrase(),
        threshold in 0.0f32..=1.0,
    ) {
        runtime().block_on(async {
            let harness = TestHarness::builder().build().await.unwrap();
            let memory = system(&harness).await;
            for (i, (text, importance)) in records.iter().enumerate() {
                for channel in Channel::ALL {
                    let meta = MemoryMetadata::new(*importance, 1.0, Role::User);
                    memory
                        .store()
                        .write(channel, format!("{channel}-{i}"), text.clone(), meta)
                        .await
                        .unwrap();
                }
            }

            let mut q = RecallQuery::from_config(query, &harness.config.recall, false);
            q.importance_threshold = threshold;
            let result = memory.recall_query(&q).await;

            for hit in &result.memories {
                prop_assert!(hit.entry.metadata.importance >= threshold);
            }
            for channel in Channel::ALL {
                let scores: Vec<f32> = result.channel(channel).map(|h| h.score).collect();
                prop_assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{channel}: {scores:?}");
            }
            let rendered = result
                .injection_block
                .lines()
                .filter(|l| l.starts_with('['))
                .count();
            prop_assert_eq!(rendered, result.memories.len());
            Ok(())
        })?;
    }

    #[test]
    fn ingesting_twice_stores_once(
        words in prop::collection::vec(prop::sample::select(WORDS), 10..16),
        padding in "[ \t]{0,3}",
    ) {
        runtime().block_on(async {
            let harness = TestHarness::builder().build().await.unwrap();
            let memory = system(&harness).await;
            let text = words.join(" ");
            let spaced = format!("{padding}{}{padding}", words.join("  "));

            let first = memory.record_turn(&text, Role::User, Channel::Episodic).await;
            let second = memory.record_turn(&spaced, Role::User, Channel::Episodic).await;
            let first_is_stored = matches!(first, RecordOutcome::Stored { .. });
            let second_is_duplicate = matches!(second, RecordOutcome::Duplicate { .. });
            prop_assert!(first_is_stored);
            prop_assert!(second_is_duplicate);
            let count = memory.store().count(memory.store().collection(Channel::Episodic)).await.unwrap();
            prop_assert_eq!(count, 1);
            Ok(())
        })?;
    }

    #[test]
    fn malformed_extraction_stages_nothing(
        reply in prop_oneof![
            "[a-zA-Z ,.]{0,60}",
            Just(r#"{"relevant": true}"#.to_string()),
            Just(r#"{"relevant": "yes", "facts": []}"#.to_string()),
            Just(r#"{"relevant": false, "reason": "small talk"}"#.to_string()),
            Just(r#"Sure! {"relevant": true, "facts": [{"text": "User likes tea", "category": "preference", "confidence": 0.9}]}"#.to_string()),
            Just(r#"{"relevant": true, "facts": [{"text": "User likes tea", "category": "preference", "confidence": 1.5}]}"#.to_string()),
            Just(r#"{"relevant": true, "facts": [{"text": "User likes tea", "category": "hobby", "confidence": 0.9}]}"#.to_string()),
            Just(r#"[{"text": "User likes tea", "category": "preference", "confidence": 0.9}]"#.to_string()),
        ],
    ) {
        runtime().block_on(async {
            let harness = TestHarness::builder().with_replies([reply]).build().await.unwrap();
            let memory = system(&harness).await;
            let turns = vec![Turn::new(Role::User, "I really prefer green tea over coffee in the mornings")];

            let report = memory.run_archivist(&turns, &StageOptions::default()).await;
            prop_assert!(report.staged.is_empty());
            prop_assert!(report.outcome != WindowOutcome::Relevant);
            prop_assert!(memory.candidates(10).await.unwrap().is_empty());
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn promoting_twice_yields_one_record() {
    let reply = r#"{"relevant": true, "facts": [
        {"text": "User prefers tabs over spaces", "category": "preference", "confidence": 0.95}
    ]}"#;
    let harness = TestHarness::builder().with_replies([reply]).build().await.unwrap();
    let memory = system(&harness).await;
    let turns = vec![Turn::new(Role::User, "I always use tabs, never spaces, in every repo")];
    let report = memory.run_archivist(&turns, &StageOptions::default()).await;
    assert_eq!(report.staged.len(), 1);

    let first = memory.promote(&PromoteOptions::default()).await.unwrap();
    assert_eq!(first.promoted.len(), 1);
    let second = memory.promote(&PromoteOptions::default()).await.unwrap();
    assert!(second.promoted.is_empty());
    assert_eq!(second.already_promoted, 1);

    let again = memory
        .promoter()
        .promote_one(&report.staged[0], &PromoteOptions::default())
        .await
        .unwrap();
    assert_eq!(again, PromoteOutcome::AlreadyPromoted { id: first.promoted[0].clone() });

    let semantic = memory.store().collection(Channel::Semantic);
    assert_eq!(memory.store().count(semantic).await.unwrap(), 1);
}

#[tokio::test]
async fn promotion_honours_confidence_and_source() {
    let reply = r#"{"relevant": true, "facts": [
        {"text": "User is vegetarian", "category": "constraint", "confidence": 0.95},
        {"text": "User prefers dark roast coffee", "category": "preference", "confidence": 0.6}
    ]}"#;
    let harness = TestHarness::builder().with_replies([reply]).build().await.unwrap();
    let memory = system(&harness).await;
    let turns = vec![Turn::new(
        Role::User,
        "I'm vegetarian and I prefer dark roast coffee most days",
    )];
    let options = StageOptions {
        source: "bootstrap".into(),
        ..StageOptions::default()
    };
    let report = memory.run_archivist(&turns, &options).await;
    assert_eq!(report.staged.len(), 2);

    let wrong_source = PromoteOptions {
        source: Some("archivist".into()),
        ..PromoteOptions::default()
    };
    let none = memory.promote(&wrong_source).await.unwrap();
    assert!(none.promoted.is_empty());
    assert_eq!(none.skipped, 2);

    let confident = PromoteOptions {
        source: Some("bootstrap".into()),
        min_confidence: 0.85,
        delete_from_candidates: true,
        ..PromoteOptions::default()
    };
    let promoted = memory.promote(&confident).await.unwrap();
    assert_eq!(promoted.promoted.len(), 1);

    let remaining = memory.candidates(10).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].text, "User prefers dark roast coffee");
}

#[tokio::test]
async fn rerun_with_delete_clears_already_promoted_candidates() {
    let reply = r#"{"relevant": true, "facts": [
        {"text": "User keeps bees on the allotment", "category": "identity", "confidence": 0.95}
    ]}"#;
    let harness = TestHarness::builder().with_replies([reply]).build().await.unwrap();
    let memory = system(&harness).await;
    let turns = vec![Turn::new(Role::User, "I keep bees on my allotment, three hives now")];
    let report = memory.run_archivist(&turns, &StageOptions::default()).await;
    assert_eq!(report.staged.len(), 1);

    let tagged = memory.promote(&PromoteOptions::default()).await.unwrap();
    assert_eq!(tagged.promoted.len(), 1);
    assert_eq!(memory.candidates(10).await.unwrap().len(), 1);

    let cleanup = PromoteOptions {
        delete_from_candidates: true,
        ..PromoteOptions::default()
    };
    let rerun = memory.promote(&cleanup).await.unwrap();
    assert!(rerun.promoted.is_empty());
    assert_eq!(rerun.already_promoted, 1);
    assert!(memory.candidates(10).await.unwrap().is_empty());

    let semantic = memory.store().collection(Channel::Semantic);
    assert_eq!(memory.store().count(semantic).await.unwrap(), 1);
}

#[tokio::test]
async fn importing_twice_writes_once_and_stamps_source() {
    let harness = TestHarness::builder().build().await.unwrap();
    let memory = system(&harness).await;
    let rows = || {
        vec![
            ImportRecord::from_text("User is vegetarian"),
            ImportRecord {
                source: Some("bootstrap".into()),
                ..ImportRecord::from_text("User owns a sea kayak")
            },
            ImportRecord::from_text("Thanks, you're the best"),
        ]
    };

    let first = memory.import(ImportTarget::Semantic, rows(), "import").await.unwrap();
    assert_eq!((first.read, first.added.len(), first.rejected), (3, 2, 1));
    let second = memory.import(ImportTarget::Semantic, rows(), "import").await.unwrap();
    assert!(second.added.is_empty());
    assert_eq!(second.duplicates, 2);

    let store = memory.store();
    let semantic = store.list(store.collection(Channel::Semantic), 10).await.unwrap();
    assert_eq!(semantic.len(), 2);
    let source = |text: &str| {
        semantic
            .iter()
            .find(|e| e.text == text)
            .and_then(|e| e.metadata.source.clone())
    };
    assert_eq!(source("User is vegetarian").as_deref(), Some("import"));
    assert_eq!(source("User owns a sea kayak").as_deref(), Some("bootstrap"));
}

#[tokio::test]
async fn imported_candidates_promote_like_staged_ones() {
    let harness = TestHarness::builder().build().await.unwrap();
    let memory = system(&harness).await;

    let report = memory
        .import(
            ImportTarget::Candidates,
            vec![ImportRecord::from_text("User keeps bees on the allotment")],
            "import",
        )
        .await
        .unwrap();
    assert_eq!(report.added.len(), 1);
    assert!(report.added[0].starts_with("cand-"));
    let candidates = memory.candidates(10).await.unwrap();
    assert!(candidates[0].metadata.has_tag("candidate"));

    let promoted = memory.promote(&PromoteOptions::default()).await.unwrap();
    assert_eq!(promoted.promoted.len(), 1);

    let again = memory
        .import(
            ImportTarget::Semantic,
            vec![ImportRecord::from_text("User keeps bees on the allotment")],
            "import",
        )
        .await
        .unwrap();
    assert_eq!(again.duplicates, 1);
}
