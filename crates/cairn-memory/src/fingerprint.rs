// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content fingerprints and deterministic record ids.
//!
//! Ids derive from normalized content so re-ingesting the same text is an
//! id collision, which every write path treats as a duplicate.

use cairn_core::Channel;
use sha2::{Digest, Sha256};

use crate::types::Turn;

/// Hex characters of the digest kept in record ids.
const ID_HASH_LEN: usize = 16;

/// Collapse internal whitespace and trim. Case is preserved.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Full sha256 hex digest of the normalized, lowercased text.
pub fn fingerprint(text: &str) -> String {
    sha256_hex(normalize_text(text).to_lowercase().as_bytes())
}

/// Id of a conversational or seeded record in `channel`.
pub fn record_id(channel: Channel, text: &str) -> String {
    format!("{}-{}", channel.as_str(), short(&fingerprint(text)))
}

/// Id of a staged candidate, scoped to the window it was extracted from.
pub fn candidate_id(window_fingerprint: &str, fact_fingerprint: &str) -> String {
    let digest = sha256_hex(format!("{window_fingerprint}:{fact_fingerprint}").as_bytes());
    format!("cand-{}", short(&digest))
}

/// Id of a promoted semantic fact. Independent of the source window.
pub fn promoted_id(fact_fingerprint: &str) -> String {
    format!("semantic-{}", short(fact_fingerprint))
}

/// Fingerprint of an ordered window of turns.
pub fn window_fingerprint(turns: &[Turn]) -> String {
    let mut hasher = Sha256::new();
    for turn in turns {
        hasher.update(turn.role.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(normalize_text(&turn.text).to_lowercase().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn short(digest: &str) -> &str {
    &digest[..ID_HASH_LEN.min(digest.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::Role;

    #[test]
    fn normalization_collapses_whitespace() {
        assert_eq!(normalize_text("  I   like\ttea \n"), "I like tea");
    }

    #[test]
    fn fingerprint_ignores_case_and_spacing() {
        assert_eq!(fingerprint("I like tea"), fingerprint("  i LIKE   tea"));
        assert_ne!(fingerprint("I like tea"), fingerprint("I like coffee"));
        assert_eq!(fingerprint("x").len(), 64);
    }

    #[test]
    fn record_ids_are_channel_scoped() {
        let persona = record_id(Channel::Persona, "I am Orion");
        let episodic = record_id(Channel::Episodic, "I am Orion");
        assert!(persona.starts_with("persona-"));
        assert!(episodic.starts_with("episodic-"));
        assert_eq!(persona.len(), "persona-".len() + 16);
        assert_eq!(persona[8..], episodic[9..]);
    }

    #[test]
    fn candidate_ids_depend_on_window() {
        let fact = fingerprint("User prefers tea");
        let a = candidate_id("window-a", &fact);
        let b = candidate_id("window-b", &fact);
        assert_ne!(a, b);
        assert_eq!(a, candidate_id("window-a", &fact));
        assert_eq!(promoted_id(&fact), format!("semantic-{}", &fact[..16]));
    }

    #[test]
    fn window_fingerprint_is_order_sensitive() {
        let one = Turn::new(Role::User, "first");
        let two = Turn::new(Role::Assistant, "second");
        let forward = window_fingerprint(&[one.clone(), two.clone()]);
        let backward = window_fingerprint(&[two, one.clone()]);
        assert_ne!(forward, backward);
        assert_eq!(forward, window_fingerprint(&[one, Turn::new(Role::Assistant, " second ")]));
    }
}
