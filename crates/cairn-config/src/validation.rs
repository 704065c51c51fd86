// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks ranges and cross-field constraints that serde attributes cannot
//! express. All problems are collected; validation does not fail fast.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{CairnConfig, StorageBackend};

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &CairnConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    for (key, value) in [
        ("recall.importance_threshold", config.recall.importance_threshold),
        ("recall.min_score", config.recall.min_score),
        ("ingest.default_importance", config.ingest.default_importance),
        ("curation.downweight_factor", config.curation.downweight_factor),
        ("curation.importance_floor", config.curation.importance_floor),
        (
            "archivist.promote_min_confidence",
            config.archivist.promote_min_confidence,
        ),
        (
            "archivist.candidate_importance",
            config.archivist.candidate_importance,
        ),
    ] {
        check_unit(&mut errors, key, value);
    }

    if !(0.0..=2.0).contains(&config.archivist.temperature) {
        errors.push(ConfigError::OutOfRange {
            key: "archivist.temperature".to_string(),
            range: "[0, 2]".to_string(),
            value: config.archivist.temperature.to_string(),
        });
    }

    for (key, value) in [
        ("archivist.window_turns", config.archivist.window_turns),
        ("archivist.min_new_turns", config.archivist.min_new_turns),
        ("archivist.timeout_secs", config.archivist.timeout_secs as usize),
        ("embedding.dimensions", config.embedding.dimensions),
        ("ingest.queue_capacity", config.ingest.queue_capacity),
    ] {
        if value < 1 {
            errors.push(ConfigError::OutOfRange {
                key: key.to_string(),
                range: ">= 1".to_string(),
                value: value.to_string(),
            });
        }
    }

    let mut seen = HashSet::new();
    for name in config.collections.all() {
        if name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "collection names must not be empty".to_string(),
            });
        } else if !seen.insert(name) {
            errors.push(ConfigError::Validation {
                message: format!("collection `{name}` is assigned to more than one channel"),
            });
        }
    }

    let mut channels = HashSet::new();
    for channel in &config.recall.channel_order {
        if !channels.insert(channel) {
            errors.push(ConfigError::Validation {
                message: format!("recall.channel_order lists `{channel}` more than once"),
            });
        }
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty for the sqlite backend".to_string(),
        });
    }

    for pattern in &config.curation.extra_generic_patterns {
        if let Err(e) = regex::Regex::new(pattern) {
            errors.push(ConfigError::Validation {
                message: format!("curation.extra_generic_patterns: invalid regex `{pattern}`: {e}"),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_unit(errors: &mut Vec<ConfigError>, key: &str, value: f32) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigError::OutOfRange {
            key: key.to_string(),
            range: "[0, 1]".to_string(),
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::Channel;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors.iter().any(|e| e.to_string().contains(needle))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&CairnConfig::default()).is_ok());
    }

    #[test]
    fn threshold_out_of_range_fails() {
        let mut config = CairnConfig::default();
        config.recall.importance_threshold = 1.5;
        config.archivist.promote_min_confidence = -0.1;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_error(&errors, "recall.importance_threshold"));
        assert!(has_error(&errors, "archivist.promote_min_confidence"));
    }

    #[test]
    fn zero_window_fails() {
        let mut config = CairnConfig::default();
        config.archivist.window_turns = 0;
        config.embedding.dimensions = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "archivist.window_turns"));
        assert!(has_error(&errors, "embedding.dimensions"));
    }

    #[test]
    fn shared_collection_name_fails() {
        let mut config = CairnConfig::default();
        config.collections.semantic = "persona".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "more than one channel"));
    }

    #[test]
    fn repeated_channel_in_order_fails() {
        let mut config = CairnConfig::default();
        config.recall.channel_order = vec![Channel::Persona, Channel::Persona];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "more than once"));
    }

    #[test]
    fn empty_database_path_only_matters_for_sqlite() {
        let mut config = CairnConfig::default();
        config.storage.database_path = String::new();
        assert!(validate_config(&config).is_err());

        config.storage.backend = StorageBackend::Memory;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn bad_generic_pattern_fails() {
        let mut config = CairnConfig::default();
        config.curation.extra_generic_patterns = vec!["(unclosed".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "invalid regex"));
    }
}
