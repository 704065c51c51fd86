// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The extraction contract: prompt, output schema and strict parser.
//!
//! The model must answer with exactly `{"relevant": false}` or
//! `{"relevant": true, "facts": [...]}`. Trimming whitespace and removing
//! one enclosing code fence are the only tolerances; everything else that
//! fails the schema is rejected.

use std::str::FromStr;

use cairn_core::{CairnError, FactCategory};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::types::Turn;

/// System instruction sent with every extraction request.
pub const SYSTEM_PROMPT: &str = include_str!("../../prompts/extraction_contract.md");

const USER_PREAMBLE: &str = "Analyze the following chat turns and extract ONLY durable semantic facts about the USER.\n\
Return JSON that strictly conforms to the contract.\n\
Turns:\n";

/// A fact that passed the contract.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticFact {
    pub text: String,
    pub category: FactCategory,
    pub confidence: f32,
}

/// Parsed model output.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    NotRelevant,
    Relevant(Vec<SemanticFact>),
}

impl Extraction {
    pub fn facts(&self) -> &[SemanticFact] {
        match self {
            Extraction::NotRelevant => &[],
            Extraction::Relevant(facts) => facts,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutput {
    relevant: bool,
    #[serde(default)]
    facts: Vec<RawFact>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFact {
    text: String,
    category: String,
    confidence: f64,
}

fn output_schema() -> Value {
    json!({
        "oneOf": [
            {
                "type": "object",
                "properties": { "relevant": { "const": false } },
                "required": ["relevant"],
                "additionalProperties": false
            },
            {
                "type": "object",
                "properties": {
                    "relevant": { "const": true },
                    "facts": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "text": { "type": "string", "minLength": 1 },
                                "category": { "type": "string" },
                                "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
                            },
                            "required": ["text", "category", "confidence"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["relevant", "facts"],
                "additionalProperties": false
            }
        ]
    })
}

/// Render the user message for a window of turns.
pub fn render_window(turns: &[Turn]) -> Result<String, CairnError> {
    let body = serde_json::to_string(turns)
        .map_err(|e| CairnError::Internal(format!("failed to render window: {e}")))?;
    Ok(format!("{USER_PREAMBLE}{body}"))
}

/// Compiled output schema plus typed parsing.
pub struct ExtractionContract {
    validator: jsonschema::Validator,
}

impl ExtractionContract {
    pub fn new() -> Result<Self, CairnError> {
        let validator = jsonschema::validator_for(&output_schema())
            .map_err(|e| CairnError::Internal(format!("invalid extraction schema: {e}")))?;
        Ok(Self { validator })
    }

    /// Parse raw model output.
    ///
    /// Facts with a category outside the allowed four are dropped. A
    /// relevant answer with no surviving facts is `NotRelevant`.
    pub fn parse(&self, raw: &str) -> Result<Extraction, CairnError> {
        let body = strip_code_fence(raw.trim());
        let value: Value = serde_json::from_str(body)
            .map_err(|e| CairnError::MalformedExtraction(format!("not JSON: {e}")))?;

        if let Some(error) = self.validator.iter_errors(&value).next() {
            return Err(CairnError::MalformedExtraction(format!(
                "schema violation: {error}"
            )));
        }

        let output: RawOutput = serde_json::from_value(value)
            .map_err(|e| CairnError::MalformedExtraction(e.to_string()))?;
        if !output.relevant {
            return Ok(Extraction::NotRelevant);
        }

        let facts: Vec<SemanticFact> = output
            .facts
            .into_iter()
            .filter_map(|raw| match FactCategory::from_str(raw.category.trim()) {
                Ok(category) => Some(SemanticFact {
                    text: raw.text.trim().to_string(),
                    category,
                    confidence: raw.confidence as f32,
                }),
                Err(_) => {
                    debug!(category = %raw.category, "dropping fact with unknown category");
                    None
                }
            })
            .filter(|f| !f.text.is_empty())
            .collect();

        if facts.is_empty() {
            Ok(Extraction::NotRelevant)
        } else {
            Ok(Extraction::Relevant(facts))
        }
    }
}

/// Remove a single enclosing markdown fence, with or without a language tag.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    match inner.split_once('\n') {
        Some((tag, body)) if !tag.trim_start().starts_with('{') => body.trim(),
        _ => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::Role;
    use proptest::prelude::*;

    fn contract() -> ExtractionContract {
        ExtractionContract::new().unwrap()
    }

    #[test]
    fn not_relevant_shape() {
        assert_eq!(contract().parse(r#"{"relevant": false}"#).unwrap(), Extraction::NotRelevant);
    }

    #[test]
    fn relevant_shape() {
        let raw = r#"{"relevant": true, "facts": [
            {"text": "User has a sister named Sarah", "category": "relationship", "confidence": 0.9}
        ]}"#;
        let parsed = contract().parse(raw).unwrap();
        assert_eq!(
            parsed.facts(),
            &[SemanticFact {
                text: "User has a sister named Sarah".into(),
                category: FactCategory::Relationship,
                confidence: 0.9,
            }]
        );
    }

    #[test]
    fn fenced_output_is_tolerated() {
        let raw = "\n```json\n{\"relevant\": false}\n```\n";
        assert_eq!(contract().parse(raw).unwrap(), Extraction::NotRelevant);
        let bare = "```{\"relevant\": false}```";
        assert_eq!(contract().parse(bare).unwrap(), Extraction::NotRelevant);
    }

    #[test]
    fn prose_around_json_is_rejected() {
        let raw = r#"Here you go: {"relevant": false}"#;
        assert!(matches!(
            contract().parse(raw),
            Err(CairnError::MalformedExtraction(_))
        ));
    }

    #[test]
    fn extra_keys_are_rejected() {
        let c = contract();
        assert!(c.parse(r#"{"relevant": false, "reason": "small talk"}"#).is_err());
        assert!(
            c.parse(r#"{"relevant": true, "facts": [{"text": "x", "category": "identity", "confidence": 0.5, "why": "y"}]}"#)
                .is_err()
        );
        assert!(c.parse(r#"{"relevant": false, "facts": []}"#).is_err());
    }

    #[test]
    fn out_of_range_confidence_invalidates_output() {
        let raw = r#"{"relevant": true, "facts": [
            {"text": "User likes tea", "category": "preference", "confidence": 0.8},
            {"text": "User is tall", "category": "identity", "confidence": 1.4}
        ]}"#;
        assert!(contract().parse(raw).is_err());
    }

    #[test]
    fn unknown_category_drops_only_that_fact() {
        let raw = r#"{"relevant": true, "facts": [
            {"text": "User likes tea", "category": "preference", "confidence": 0.8},
            {"text": "User went hiking", "category": "event", "confidence": 0.8}
        ]}"#;
        let parsed = contract().parse(raw).unwrap();
        assert_eq!(parsed.facts().len(), 1);
        assert_eq!(parsed.facts()[0].category, FactCategory::Preference);
    }

    #[test]
    fn relevant_without_facts_is_not_relevant() {
        let c = contract();
        assert_eq!(c.parse(r#"{"relevant": true, "facts": []}"#).unwrap(), Extraction::NotRelevant);
        assert!(c.parse(r#"{"relevant": true}"#).is_err());
    }

    #[test]
    fn window_render_embeds_turns_as_json() {
        let rendered = render_window(&[Turn::new(Role::User, "I like tea")]).unwrap();
        assert!(rendered.starts_with("Analyze the following chat turns"));
        assert!(rendered.ends_with(r#"[{"role":"user","text":"I like tea"}]"#));
    }

    #[test]
    fn prompt_lists_every_category() {
        for category in FactCategory::ALL {
            assert!(SYSTEM_PROMPT.contains(&category.to_string()));
        }
    }

    proptest! {
        /// Arbitrary text never yields facts unless it is a valid relevant object.
        #[test]
        fn garbage_never_yields_facts(raw in "\\PC{0,80}") {
            if let Ok(extraction) = contract().parse(&raw) {
                let value: Value = serde_json::from_str(strip_code_fence(raw.trim())).unwrap();
                prop_assert!(value.is_object());
                if !extraction.facts().is_empty() {
                    prop_assert_eq!(value["relevant"].as_bool(), Some(true));
                }
            }
        }
    }
}
