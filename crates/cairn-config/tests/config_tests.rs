// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Cairn configuration system.

use cairn_config::diagnostic::ConfigError;
use cairn_config::model::{CairnConfig, GenericPolicy, ScoreTransform, StorageBackend};
use cairn_config::{load_and_validate_str, load_config_from_str};
use cairn_core::Channel;

/// A full configuration file deserializes into typed sections.
#[test]
fn full_toml_deserializes() {
    let toml = r#"
[agent]
name = "orion"
log_level = "debug"

[storage]
backend = "sqlite"
database_path = "/tmp/cairn-test.db"
wal_mode = false

[collections]
persona = "orion_persona"
episodic = "orion_episodic"
semantic = "orion_semantic"
candidates = "orion_candidates"

[embedding]
base_url = "http://127.0.0.1:8080/v1"
model = "bge-small"
dimensions = 384

[recall]
topk_persona = 3
topk_episodic = 8
topk_semantic = 4
importance_threshold = 0.6
channel_order = ["semantic", "persona", "episodic"]
score_transform = "inverse"

[ingest]
min_words = 6
record_assistant_turns = false

[curation]
generic_policy = "downweight"
downweight_factor = 0.5
extra_generic_patterns = ["(?i)happy to help"]

[archivist]
enabled = true
model = "llama3"
window_turns = 12
min_new_turns = 4
auto_promote = true
promote_min_confidence = 0.9

[debug]
enabled = true
show_recall = true
"#;

    let config = load_and_validate_str(toml).expect("valid config");
    assert_eq!(config.agent.name, "orion");
    assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    assert!(!config.storage.wal_mode);
    assert_eq!(config.collections.candidates, "orion_candidates");
    assert_eq!(config.embedding.dimensions, 384);
    assert_eq!(config.recall.topk(Channel::Episodic), 8);
    assert_eq!(config.recall.channel_order[0], Channel::Semantic);
    assert_eq!(config.recall.score_transform, ScoreTransform::Inverse);
    assert_eq!(config.ingest.min_words, 6);
    assert!(!config.ingest.record_assistant_turns);
    assert_eq!(config.curation.generic_policy, GenericPolicy::Downweight);
    assert!(config.archivist.enabled);
    assert!(config.archivist.auto_promote);
    assert_eq!(config.archivist.window_turns, 12);
    assert!(config.debug.show_recall);
}

/// Missing sections fall back to compiled defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty config is valid");
    assert_eq!(config.recall.topk_persona, 5);
    assert_eq!(config.recall.topk_episodic, 10);
    assert_eq!(config.archivist.model, "qwen3:4b");
    assert_eq!(config.archivist.max_tokens, 800);
    assert_eq!(config.collections.persona, "persona");
    assert_eq!(config.embedding.dimensions, 768);
}

/// Unknown keys are rejected with a suggestion.
#[test]
fn unknown_key_gets_suggestion() {
    let toml = r#"
[recall]
topk_persnoa = 3
"#;
    let errors = load_and_validate_str(toml).expect_err("unknown key must fail");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            valid_keys,
            span,
            ..
        } => {
            assert_eq!(key, "topk_persnoa");
            assert_eq!(suggestion.as_deref(), Some("topk_persona"));
            assert!(valid_keys.contains("importance_threshold"));
            assert!(span.is_none(), "inline sources carry no file metadata");
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// Unknown top-level sections are rejected.
#[test]
fn unknown_section_rejected() {
    let toml = r#"
[telegram]
bot_token = "abc"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// An unknown enum variant is reported as an invalid value.
#[test]
fn bad_policy_variant_is_invalid_value() {
    let toml = r#"
[curation]
generic_policy = "ignore"
"#;
    let errors = load_and_validate_str(toml).expect_err("bad variant must fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidValue { detail, .. } if detail.contains("ignore"))),
        "got {errors:?}"
    );
}

/// Wrong value types are reported.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[recall]
topk_persona = "many"
"#;
    let errors = load_and_validate_str(toml).expect_err("wrong type must fail");
    assert!(matches!(errors[0], ConfigError::InvalidValue { .. }));
}

/// Validation runs after a successful parse and collects every problem.
#[test]
fn validation_collects_all_errors() {
    let toml = r#"
[recall]
importance_threshold = 2.0

[archivist]
window_turns = 0
min_new_turns = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("invalid values must fail");
    assert_eq!(errors.len(), 3, "got {errors:?}");
}

/// Overrides merged on top of TOML take precedence, as env vars do.
#[test]
fn merged_override_wins() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: CairnConfig = Figment::new()
        .merge(Serialized::defaults(CairnConfig::default()))
        .merge(Toml::string("[archivist]\nmin_new_turns = 9\n"))
        .merge(("archivist.min_new_turns", 2))
        .extract()
        .expect("should merge override");
    assert_eq!(config.archivist.min_new_turns, 2);
}

/// Diagnostics render through miette.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "min_wrds".to_string(),
        suggestion: Some("min_words".to_string()),
        valid_keys: "min_words, min_chars".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().expect("help text").to_string();
    assert!(help.contains("did you mean `min_words`"));

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render");
    assert!(buf.contains("min_wrds"));
}
