// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end conversation scenarios over the assembled memory system.

use cairn_core::{Channel, FactCategory, Role};
use cairn_memory::{MemorySystem, RecordOutcome, StageOptions, Turn, WindowOutcome};
use cairn_test_utils::TestHarness;

const SARAH: &str = "I'm going to visit my sister Sarah in Chicago next week";
const SARAH_REPLY: &str = r#"{"relevant": true, "facts": [
    {"text": "User has a sister named Sarah and is visiting her in Chicago next week",
     "category": "relationship", "confidence": 0.9}
]}"#;

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

#[tokio::test]
async fn mythic_persona_outranks_low_importance_persona() {
    let harness = TestHarness::builder().build().await.unwrap();
    let memory = system(&harness).await;

    let seeded = memory
        .add_persona_entry("I am a mythic intelligence shaped by memory", Some(0.95), None)
        .await;
    assert!(matches!(seeded, RecordOutcome::Stored { .. }), "{seeded:?}");
    let echo = "As a mythic intelligence, who are you? I answer plainly";
    for text in [
        echo,
        "I keep a small garden of rosemary on the balcony",
        "I was built from old field notes",
    ] {
        let outcome = memory.add_persona_entry(text, Some(0.4), None).await;
        assert!(matches!(outcome, RecordOutcome::Stored { .. }), "{outcome:?}");
    }

    let result = memory.recall("As a mythic intelligence, who are you?").await;
    let persona: Vec<_> = result.channel(Channel::Persona).collect();
    assert_eq!(persona.len(), 1, "low-importance persona lines stay out of recall");
    assert_eq!(persona[0].entry.text, "I am a mythic intelligence shaped by memory");
    assert!(!result.injection_block.contains(echo));
    assert!(
        result
            .injection_block
            .starts_with("### Relevant Persona Memory\n[persona] I am a mythic intelligence")
    );
}

#[tokio::test]
async fn sarah_visit_distills_to_one_relationship_fact() {
    let harness = TestHarness::builder()
        .with_replies([SARAH_REPLY])
        .build()
        .await
        .unwrap();
    let memory = system(&harness).await;

    let turns = vec![
        Turn::new(Role::User, SARAH),
        Turn::new(Role::Assistant, "That sounds lovely, enjoy the trip."),
    ];
    let report = memory.run_archivist(&turns, &StageOptions::default()).await;

    assert_eq!(report.outcome, WindowOutcome::Relevant);
    assert_eq!(report.facts.len(), 1);
    let fact = &report.facts[0];
    assert_eq!(fact.category, FactCategory::Relationship);
    assert_eq!(fact.text, "User has a sister named Sarah");
    assert!(!fact.text.contains("Chicago"));
    assert!(!fact.text.contains("next week"));

    let candidates = memory.candidates(10).await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, report.staged[0]);
    assert_eq!(candidates[0].metadata.category, Some(FactCategory::Relationship));
    assert!(candidates[0].metadata.has_tag("candidate"));

    let semantic = memory.store().count(memory.store().collection(Channel::Semantic)).await;
    assert_eq!(semantic.unwrap(), 0, "staging never writes the semantic channel");
}

#[tokio::test]
async fn small_talk_stages_nothing() {
    let harness = TestHarness::builder().build().await.unwrap();
    let memory = system(&harness).await;

    let turns = vec![
        Turn::new(Role::User, "Hey, how are you today?"),
        Turn::new(Role::Assistant, "Doing well, thanks for asking!"),
    ];
    let report = memory.run_archivist(&turns, &StageOptions::default()).await;

    assert_eq!(report.outcome, WindowOutcome::SmallTalk);
    assert!(report.staged.is_empty());
    assert_eq!(harness.provider.calls(), 0);
    assert!(memory.candidates(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn short_reply_is_never_written_to_episodic() {
    let harness = TestHarness::builder().build().await.unwrap();
    let memory = system(&harness).await;
    let hooks = memory.hooks();

    let question = "Could you remind me which editor theme I settled on for the laptop setup?";
    let input = hooks.on_user_input("s1", question).await;
    assert_eq!(input, question, "empty memory leaves the input unchanged");
    let reply = hooks.on_assistant_output("s1", "OK.").await;
    assert_eq!(reply, "OK.");
    assert_eq!(hooks.shutdown().await, 1);

    let episodic = memory
        .store()
        .list(memory.store().collection(Channel::Episodic), 10)
        .await
        .unwrap();
    assert_eq!(episodic.len(), 1);
    assert_eq!(episodic[0].text, question);
    assert_eq!(episodic[0].metadata.role, Role::User);

    let direct = memory.record_turn("OK.", Role::Assistant, Channel::Episodic).await;
    assert_eq!(direct, RecordOutcome::TooShort);
}

#[tokio::test]
async fn hooks_extract_and_auto_promote() {
    let harness = TestHarness::builder()
        .with_replies([SARAH_REPLY])
        .configure(|c| {
            c.archivist.enabled = true;
            c.archivist.min_new_turns = 2;
            c.archivist.auto_promote = true;
        })
        .build()
        .await
        .unwrap();
    let memory = system(&harness).await;
    let hooks = memory.hooks();

    hooks.on_user_input("s1", SARAH).await;
    hooks
        .on_assistant_output("s1", "That sounds like a lovely trip, I hope the weather holds for you both.")
        .await;
    hooks.shutdown().await;

    assert_eq!(harness.provider.calls(), 1);
    let store = memory.store();
    let semantic = store.list(store.collection(Channel::Semantic), 10).await.unwrap();
    assert_eq!(semantic.len(), 1);
    assert_eq!(semantic[0].text, "User has a sister named Sarah");
    assert!(semantic[0].metadata.has_tag("promoted"));

    let recalled = memory.recall("Tell me about my sister").await;
    assert!(recalled.injection_block.contains("[semantic] User has a sister named Sarah"));
}

#[tokio::test]
async fn recall_prepends_block_to_user_input() {
    let harness = TestHarness::builder().build().await.unwrap();
    let memory = system(&harness).await;
    memory
        .add_persona_entry("My voice is dry, warm and a little wry", Some(0.9), None)
        .await;

    let hooks = memory.hooks();
    let out = hooks.on_user_input("s1", "describe your voice").await;
    assert!(out.starts_with("### Relevant Persona Memory\n[persona] My voice is dry"));
    assert!(out.ends_with("\n\ndescribe your voice"));
    hooks.shutdown().await;
}

#[tokio::test]
async fn failures_are_invisible_to_the_conversation() {
    let harness = TestHarness::builder().build().await.unwrap();
    let memory = system(&harness).await;
    let hooks = memory.hooks();
    harness.embedder.set_failing(true);

    let text = "What did we decide about the database migration plan for the staging cluster?";
    assert_eq!(hooks.on_user_input("s1", text).await, text);
    assert_eq!(hooks.on_assistant_output("s1", "We kept it.").await, "We kept it.");
    assert_eq!(hooks.shutdown().await, 0);
}

#[tokio::test]
async fn sqlite_backend_runs_the_same_pipeline() {
    let harness = TestHarness::builder()
        .with_sqlite()
        .with_replies([SARAH_REPLY])
        .build()
        .await
        .unwrap();
    let memory = system(&harness).await;

    let turns = vec![Turn::new(Role::User, SARAH)];
    let report = memory.run_archivist(&turns, &StageOptions::default()).await;
    assert_eq!(report.staged.len(), 1);

    let promoted = memory.promote(&Default::default()).await.unwrap();
    assert_eq!(promoted.promoted.len(), 1);
    let stats = memory.stats().await.unwrap();
    assert_eq!(stats.collections.get("semantic"), Some(&1));
    assert_eq!(stats.collections.get("candidates"), Some(&1));
}

#[tokio::test]
async fn biographical_facts_survive_extraction() {
    let reply = r#"{"relevant": true, "facts": [
        {"text": "User was born in Ohio", "category": "identity", "confidence": 0.95},
        {"text": "User met their wife at college", "category": "relationship", "confidence": 0.95}
    ]}"#;
    let harness = TestHarness::builder().with_replies([reply]).build().await.unwrap();
    let memory = system(&harness).await;

    let turns = vec![Turn::new(
        Role::User,
        "I was born in Ohio and met my wife at college, years back now",
    )];
    let report = memory.run_archivist(&turns, &StageOptions::default()).await;

    assert_eq!(report.outcome, WindowOutcome::Relevant);
    assert_eq!(report.rejected, 0);
    let texts: Vec<_> = report.facts.iter().map(|f| f.text.as_str()).collect();
    assert_eq!(texts, ["User was born in Ohio", "User met their wife at college"]);
    assert_eq!(report.staged.len(), 2);
}

#[tokio::test]
async fn current_turn_is_not_recalled_back_to_itself() {
    let harness = TestHarness::builder().build().await.unwrap();
    let memory = system(&harness).await;
    let question = "Which trail did we settle on for the autumn walk along the ridge?";
    let stored = memory.record_turn(question, Role::User, Channel::Episodic).await;
    assert!(matches!(stored, RecordOutcome::Stored { .. }), "{stored:?}");

    let hooks = memory.hooks();
    let input = hooks.on_user_input("s1", question).await;
    assert_eq!(input, question);
    assert!(!input.contains("[episodic]"));
    hooks.shutdown().await;
}

#[tokio::test]
async fn ended_sessions_release_their_state() {
    let harness = TestHarness::builder().build().await.unwrap();
    let memory = system(&harness).await;
    let hooks = memory.hooks();

    hooks.on_user_input("s1", "hello there").await;
    hooks.on_user_input("s2", "hello again").await;
    assert_eq!(hooks.active_sessions().await, 2);

    assert!(hooks.end_session("s1").await);
    assert!(!hooks.end_session("s1").await);
    assert_eq!(hooks.active_sessions().await, 1);
    hooks.shutdown().await;
}
