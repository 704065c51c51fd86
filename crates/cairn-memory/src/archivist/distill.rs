// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durability distillation of extracted facts.
//!
//! A fact is split into clauses; clauses carrying episodic residue (time
//! references, plans, questions, one-off events) are removed. What remains
//! is the durable part. A fact with no durable clause is discarded.

use cairn_core::CairnError;
use regex::Regex;

use crate::curation::CurationFilter;
use crate::fingerprint::normalize_text;

const CLAUSE_BOUNDARY: &str = r"(?i)\s*[,;]\s*|\s+(?:and|but|while|because|so)\s+";

pub struct Distiller {
    boundary: Regex,
}

impl Distiller {
    pub fn new() -> Result<Self, CairnError> {
        let boundary = Regex::new(CLAUSE_BOUNDARY)
            .map_err(|e| CairnError::Internal(format!("invalid clause pattern: {e}")))?;
        Ok(Self { boundary })
    }

    /// The durable residue of `text`, or `None` if nothing durable survives.
    pub fn distill(&self, text: &str, curation: &CurationFilter) -> Option<String> {
        let text = normalize_text(text);
        let clauses: Vec<&str> = self
            .boundary
            .split(&text)
            .map(|c| c.trim_matches(|ch: char| ch.is_whitespace() || ch == '.'))
            .filter(|c| !c.is_empty())
            .collect();

        let durable: Vec<&str> = clauses
            .iter()
            .copied()
            .filter(|c| !curation.has_episodic_marker(c))
            .collect();

        if durable.is_empty() {
            return None;
        }
        if durable.len() == clauses.len() {
            return Some(text.trim_end_matches('.').to_string());
        }
        Some(durable.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_config::model::CurationConfig;

    fn run(text: &str) -> Option<String> {
        let curation = CurationFilter::new(&CurationConfig::default()).unwrap();
        Distiller::new().unwrap().distill(text, &curation)
    }

    #[test]
    fn durable_fact_passes_unchanged() {
        assert_eq!(
            run("User is allergic to peanuts."),
            Some("User is allergic to peanuts".to_string())
        );
    }

    #[test]
    fn episodic_clause_is_stripped() {
        let out = run("User has a sister named Sarah and is visiting her in Chicago next week").unwrap();
        assert_eq!(out, "User has a sister named Sarah");
    }

    #[test]
    fn purely_episodic_fact_is_discarded() {
        assert_eq!(run("User is going to Chicago next week"), None);
        assert_eq!(run("User went hiking yesterday"), None);
        assert_eq!(run("Does the user like tea?"), None);
    }

    #[test]
    fn biographical_facts_survive() {
        assert_eq!(run("User was born in Ohio"), Some("User was born in Ohio".to_string()));
        assert_eq!(
            run("User met their wife at college"),
            Some("User met their wife at college".to_string())
        );
    }

    #[test]
    fn multiple_durable_clauses_survive() {
        let out = run("User prefers tea, owns two cats; and is moving house tomorrow").unwrap();
        assert_eq!(out, "User prefers tea, owns two cats");
    }
}
