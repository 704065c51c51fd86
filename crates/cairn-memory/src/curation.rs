// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Curation filter: the single policy point for low-value content.
//!
//! [`CurationFilter::evaluate`] is called by the ingestion gate before a
//! write and by the recall orchestrator after a query, so a record that
//! would be dropped on the way in is also dropped on the way out. The
//! archivist uses the same filter for candidate heuristics and for the
//! episodic markers that drive durability distillation.

use std::collections::BTreeSet;

use cairn_config::model::{CurationConfig, GenericPolicy};
use cairn_core::{CairnError, MemoryMetadata};
use regex::Regex;

use crate::fingerprint::normalize_text;

/// Tags added to generic content persisted under the downweight policy.
pub const GENERIC_TAGS: [&str; 2] = ["generic", "butler-mode"];

/// Candidate tags that always mark small talk.
const BAD_TAGS: [&str; 5] = ["greeting", "compliment", "smalltalk", "pleasantry", "filler"];

/// Built-in recognizers for personality-less assistant phrasing.
const GENERIC_PATTERNS: &[&str] = &[
    r"(?i)\bhow (can|may) i (help|assist) you\b",
    r"(?i)\bis there anything else (i can|you need)\b",
    r"(?i)\bi'?m (here|happy|glad) to (help|assist)\b",
    r"(?i)\bhappy to help\b",
    r"(?i)\blet me know if (you|there)\b",
    r"(?i)\bfeel free to (ask|reach out)\b",
    r"(?i)\bi hope this helps\b",
    r"(?i)\bat your service\b",
    r"(?i)\bas an ai\b",
];

/// Outcome of curating one record or text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Keep,
    Suppress,
    /// Keep, scaling importance at ingestion and score at recall.
    Downweight(f32),
}

struct Patterns {
    greeting: Regex,
    how_are_you: Regex,
    compliment: Regex,
    ack: Regex,
    truthbomb: Regex,
    temporal: Regex,
    plan: Regex,
    story_start: Regex,
    story_event: Regex,
    url: Regex,
    drive_path: Regex,
    keep_hint: Regex,
    word: Regex,
    strip_greeting: Regex,
    strip_good: Regex,
    strip_how: Regex,
    generic: Vec<Regex>,
}

impl Patterns {
    fn compile(extra_generic: &[String]) -> Result<Self, CairnError> {
        let mut generic = GENERIC_PATTERNS
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;
        for pattern in extra_generic {
            generic.push(compile(&format!("(?i){pattern}"))?);
        }

        Ok(Self {
            greeting: compile(
                r"(?i)^\s*(hi|hello|hey|hiya|yo|greetings)\b|^\s*good\s+(morning|afternoon|evening|day)\b",
            )?,
            how_are_you: compile(r"(?i)^\s*how\s+are\s+you\b")?,
            compliment: compile(
                r"(?i)^\s*(thank(s| you)|appreciate it|you're the best|you are the best|you're amazing|you are amazing|you're awesome|you are awesome|wonderful|great job)\b",
            )?,
            ack: compile(
                r"(?i)^\s*(ok|okay|k|kk|sure|yep|yeah|nah|nope|got it|understood|roger|ack|thanks|thank you|ty|lol|lmao)\b[!. ,]*$",
            )?,
            truthbomb: compile(
                r"(?i)\b(as an ai|language model|chatgpt|openai|not sentient|no consciousness|i don'?t have feelings|i can'?t feel|i am an assistant|i'?m an assistant|artificial intelligence)\b",
            )?,
            temporal: compile(
                r"(?i)\b(yesterday|today|tonight|tomorrow|last night|last weekend|this weekend|this morning|earlier|recently|just now|a while ago|a couple of days|monday|tuesday|wednesday|thursday|friday|saturday|sunday|jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)\b",
            )?,
            plan: compile(
                r"(?i)\b(going to|gonna|about to|plan(s|ning|ned)? to|intend(s|ing)? to|will (visit|travel|go|attend|meet|see|start|fly|drive)|visiting|next (week|month|year|weekend|time)|upcoming|soon)\b",
            )?,
            story_start: compile(
                r"(?i)^\s*i\s+(went|visited|made it|didn'?t make it|was|were|had|got|woke up|slept|ate|drove|saw|met)\b",
            )?,
            story_event: compile(
                r"(?i)^\s*(i|user|the user)\s+(went|visited|made it|didn'?t make it|woke up|slept|ate|drove)\b",
            )?,
            url: compile(r"(?i)https?://")?,
            drive_path: compile(r"\b[A-Za-z]:\\")?,
            keep_hint: compile(
                r"(?i)\b(prefer\w*|use|uses|used|using|always|never|default\w*|windows|powershell|linux|macos|config\w*|yaml|paths?|folders?|director(y|ies)|repos?|repository|github|urls?|chroma|embeddings?|models?|dimensions?|endpoints?|localhost|api)\b",
            )?,
            word: compile(r"[a-z0-9']+")?,
            strip_greeting: compile(r"(?i)^\s*(hi|hello|hey|hiya|yo|greetings)\b[\s,:\-–—]*")?,
            strip_good: compile(r"(?i)^\s*good\s+(morning|afternoon|evening|day)\b[\s,:\-–—]*")?,
            strip_how: compile(r"(?i)^\s*how\s+are\s+you\b[\s,:\-–—]*")?,
            generic,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex, CairnError> {
    Regex::new(pattern).map_err(|e| CairnError::Config(format!("invalid curation pattern: {e}")))
}

/// Policy filter shared by ingestion, recall and the archivist.
pub struct CurationFilter {
    policy: GenericPolicy,
    downweight_factor: f32,
    importance_floor: f32,
    suppressed_tags: BTreeSet<String>,
    patterns: Patterns,
}

impl CurationFilter {
    /// Compiles the built-in and configured patterns.
    pub fn new(config: &CurationConfig) -> Result<Self, CairnError> {
        Ok(Self {
            policy: config.generic_policy,
            downweight_factor: config.downweight_factor,
            importance_floor: config.importance_floor,
            suppressed_tags: config
                .suppressed_tags
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
            patterns: Patterns::compile(&config.extra_generic_patterns)?,
        })
    }

    pub fn policy(&self) -> GenericPolicy {
        self.policy
    }

    /// Decide what to do with `text` carrying `metadata`.
    ///
    /// Importance below the floor is always suppressed. Generic content,
    /// recognized by tag or by phrasing, follows the configured policy.
    pub fn evaluate(&self, text: &str, metadata: &MemoryMetadata) -> Decision {
        if metadata.importance < self.importance_floor {
            return Decision::Suppress;
        }
        let tagged = metadata
            .tags
            .iter()
            .any(|t| self.suppressed_tags.contains(t));
        if !tagged && !self.is_generic(text) {
            return Decision::Keep;
        }
        match self.policy {
            GenericPolicy::Drop => Decision::Suppress,
            GenericPolicy::Downweight => Decision::Downweight(self.downweight_factor),
        }
    }

    /// Tag `metadata` as generic and scale its importance.
    pub fn mark_downweighted(&self, metadata: &mut MemoryMetadata, factor: f32) {
        for tag in GENERIC_TAGS {
            metadata.tags.insert(tag.to_string());
        }
        metadata.importance = (metadata.importance * factor).clamp(0.0, 1.0);
    }

    /// True if the text matches a generic assistant phrasing.
    pub fn is_generic(&self, text: &str) -> bool {
        self.patterns.generic.iter().any(|re| re.is_match(text))
    }

    /// Junk candidate check: greetings, compliments, filler, AI
    /// demystification and time-bound stories.
    ///
    /// Text with a durable-content hint survives the greeting and
    /// compliment checks but not the filler, truth-bomb and story checks.
    pub fn is_low_value_candidate(&self, text: &str, tags: &BTreeSet<String>) -> bool {
        let clean = normalize_text(text);
        if clean.is_empty() {
            return true;
        }
        let p = &self.patterns;
        let wc = self.word_count(&clean);

        if wc <= 6 && p.ack.is_match(&clean) {
            return true;
        }
        if p.truthbomb.is_match(&clean) {
            return true;
        }
        if self.is_timebound_story(&clean) {
            return true;
        }
        if p.keep_hint.is_match(&clean) {
            return false;
        }
        if tags.iter().any(|t| BAD_TAGS.contains(&t.as_str())) {
            return true;
        }
        if wc <= 12 && (p.greeting.is_match(&clean) || p.how_are_you.is_match(&clean)) {
            return true;
        }
        wc <= 18 && p.compliment.is_match(&clean)
    }

    /// True for pure small talk: short acknowledgements, greetings and
    /// compliments without any durable hint.
    pub fn is_small_talk(&self, text: &str) -> bool {
        let clean = normalize_text(text);
        if clean.is_empty() {
            return true;
        }
        let p = &self.patterns;
        let wc = self.word_count(&clean);
        if wc <= 6 && p.ack.is_match(&clean) {
            return true;
        }
        if p.keep_hint.is_match(&clean) {
            return false;
        }
        (wc <= 12 && (p.greeting.is_match(&clean) || p.how_are_you.is_match(&clean)))
            || (wc <= 18 && p.compliment.is_match(&clean))
    }

    /// True for episodic, time-bound narration that should not become a
    /// semantic fact. URLs, drive paths and durable hints are exempt.
    pub fn is_timebound_story(&self, text: &str) -> bool {
        let clean = normalize_text(text);
        if clean.is_empty() {
            return true;
        }
        let p = &self.patterns;
        if p.url.is_match(&clean) || p.drive_path.is_match(&clean) {
            return false;
        }
        if p.keep_hint.is_match(&clean) {
            return false;
        }
        let wc = self.word_count(&clean);
        wc >= 6
            && (p.temporal.is_match(&clean)
                || p.story_start.is_match(&clean)
                || p.story_event.is_match(&clean))
    }

    /// True if a clause carries episodic residue: a time reference, a plan
    /// or intent, a question, or a one-off event ("user went", "I drove").
    ///
    /// State verbs ("was", "met", "had") are not markers on their own, so
    /// "User was born in Ohio" stays a durable fact.
    pub fn has_episodic_marker(&self, clause: &str) -> bool {
        let p = &self.patterns;
        clause.contains('?')
            || p.temporal.is_match(clause)
            || p.plan.is_match(clause)
            || p.story_event.is_match(clause)
    }

    /// Remove a leading greeting only when what remains carries a durable hint.
    pub fn strip_leading_greeting(&self, text: &str) -> String {
        let clean = normalize_text(text);
        let p = &self.patterns;
        if clean.is_empty() || !(p.greeting.is_match(&clean) || p.how_are_you.is_match(&clean)) {
            return clean;
        }
        let stripped = p.strip_greeting.replace(&clean, "");
        let stripped = p.strip_good.replace(&stripped, "");
        let stripped = normalize_text(&p.strip_how.replace(&stripped, ""));
        if !stripped.is_empty() && p.keep_hint.is_match(&stripped) {
            stripped
        } else {
            clean
        }
    }

    /// Number of words, counted over lowercase alphanumerics and apostrophes.
    pub fn word_count(&self, text: &str) -> usize {
        self.patterns.word.find_iter(&text.to_lowercase()).count()
    }
}

/// Coarse tone from keyword cues.
pub fn estimate_style(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let words: BTreeSet<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();
    let any = |cues: &[&str]| cues.iter().any(|c| words.contains(c));

    if any(&["regret", "sad", "lonely"]) {
        Some("somber")
    } else if any(&["courage", "fight", "will"]) {
        Some("defiant")
    } else if any(&["beauty", "soul", "stars"]) {
        Some("poetic")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::Role;

    fn filter(policy: GenericPolicy) -> CurationFilter {
        CurationFilter::new(&CurationConfig {
            generic_policy: policy,
            ..CurationConfig::default()
        })
        .unwrap()
    }

    fn meta(importance: f32) -> MemoryMetadata {
        MemoryMetadata::new(importance, 1.0, Role::Assistant)
    }

    #[test]
    fn plain_text_is_kept() {
        let f = filter(GenericPolicy::Drop);
        assert_eq!(
            f.evaluate("The lighthouse keeper taught me to read the tides", &meta(0.7)),
            Decision::Keep
        );
    }

    #[test]
    fn generic_phrasing_follows_policy() {
        let text = "Sure thing! Is there anything else I can do for you today?";
        assert_eq!(filter(GenericPolicy::Drop).evaluate(text, &meta(0.7)), Decision::Suppress);
        assert_eq!(
            filter(GenericPolicy::Downweight).evaluate(text, &meta(0.7)),
            Decision::Downweight(0.25)
        );
    }

    #[test]
    fn suppressed_tag_follows_policy() {
        let mut m = meta(0.9);
        m.tags.insert("butler-mode".into());
        assert_eq!(filter(GenericPolicy::Drop).evaluate("anything", &m), Decision::Suppress);
        assert_eq!(
            filter(GenericPolicy::Downweight).evaluate("anything", &m),
            Decision::Downweight(0.25)
        );
    }

    #[test]
    fn importance_floor_suppresses() {
        let f = CurationFilter::new(&CurationConfig {
            importance_floor: 0.5,
            ..CurationConfig::default()
        })
        .unwrap();
        assert_eq!(f.evaluate("durable", &meta(0.4)), Decision::Suppress);
        assert_eq!(f.evaluate("durable", &meta(0.5)), Decision::Keep);
    }

    #[test]
    fn extra_patterns_are_case_insensitive() {
        let f = CurationFilter::new(&CurationConfig {
            extra_generic_patterns: vec!["at your disposal".into()],
            ..CurationConfig::default()
        })
        .unwrap();
        assert!(f.is_generic("I am AT YOUR DISPOSAL"));
    }

    #[test]
    fn invalid_extra_pattern_is_config_error() {
        let result = CurationFilter::new(&CurationConfig {
            extra_generic_patterns: vec!["(unclosed".into()],
            ..CurationConfig::default()
        });
        assert!(matches!(result, Err(CairnError::Config(_))));
    }

    #[test]
    fn mark_downweighted_tags_and_scales() {
        let f = filter(GenericPolicy::Downweight);
        let mut m = meta(0.8);
        f.mark_downweighted(&mut m, 0.25);
        assert!(m.has_tag("generic") && m.has_tag("butler-mode"));
        assert!((m.importance - 0.2).abs() < 1e-6);
    }

    #[test]
    fn low_value_candidates() {
        let f = filter(GenericPolicy::Drop);
        let none = BTreeSet::new();
        assert!(f.is_low_value_candidate("", &none));
        assert!(f.is_low_value_candidate("Okay!!", &none));
        assert!(f.is_low_value_candidate("got it.", &none));
        assert!(f.is_low_value_candidate("Hey, how are you today?", &none));
        assert!(f.is_low_value_candidate("Thank you so much, that was wonderful", &none));
        assert!(f.is_low_value_candidate("As an AI I do not have a favorite color", &none));
        assert!(f.is_low_value_candidate("I went to the market yesterday with my cousin", &none));
        assert!(!f.is_low_value_candidate("User has a sister named Sarah", &none));
        assert!(!f.is_low_value_candidate("Hi, I prefer PowerShell over bash", &none));

        let mut tags = BTreeSet::new();
        tags.insert("smalltalk".to_string());
        assert!(f.is_low_value_candidate("User likes the weather here", &tags));
        assert!(!f.is_low_value_candidate("User always uses dark mode", &tags));
    }

    #[test]
    fn small_talk() {
        let f = filter(GenericPolicy::Drop);
        assert!(f.is_small_talk("Hey, how are you today?"));
        assert!(f.is_small_talk("thanks, you're the best"));
        assert!(!f.is_small_talk("Hey, I always use vim for editing"));
        assert!(!f.is_small_talk("I'm going to visit my sister Sarah in Chicago next week"));
    }

    #[test]
    fn timebound_story_exemptions() {
        let f = filter(GenericPolicy::Drop);
        assert!(f.is_timebound_story("Yesterday I fixed the old bicycle in the garage"));
        assert!(!f.is_timebound_story("Yesterday I moved notes to C:\\notes for good"));
        assert!(!f.is_timebound_story("Yesterday I found https://example.com useful overall"));
        assert!(!f.is_timebound_story("today"));
    }

    #[test]
    fn episodic_markers() {
        let f = filter(GenericPolicy::Drop);
        assert!(f.has_episodic_marker("is visiting her in Chicago next week"));
        assert!(f.has_episodic_marker("what is the plan?"));
        assert!(f.has_episodic_marker("is going to learn piano"));
        assert!(f.has_episodic_marker("User went hiking with friends"));
        assert!(!f.has_episodic_marker("User has a sister named Sarah"));
        assert!(!f.has_episodic_marker("User was born in Ohio"));
        assert!(!f.has_episodic_marker("User met their wife at college"));
    }

    #[test]
    fn biographical_facts_are_not_stories() {
        let f = filter(GenericPolicy::Drop);
        let none = BTreeSet::new();
        assert!(!f.is_low_value_candidate("User was born in Ohio", &none));
        assert!(!f.is_low_value_candidate("User met their wife at college", &none));
        assert!(f.is_timebound_story("I met an old friend at the station downtown"));
    }

    #[test]
    fn greeting_stripped_only_when_meaningful() {
        let f = filter(GenericPolicy::Drop);
        assert_eq!(
            f.strip_leading_greeting("Hello,  I always use PowerShell on Windows"),
            "I always use PowerShell on Windows"
        );
        assert_eq!(
            f.strip_leading_greeting("Good morning: nice weather"),
            "Good morning: nice weather"
        );
        assert_eq!(f.strip_leading_greeting("no greeting here"), "no greeting here");
    }

    #[test]
    fn style_cues() {
        assert_eq!(estimate_style("I regret nothing"), Some("somber"));
        assert_eq!(estimate_style("We fight on"), Some("defiant"));
        assert_eq!(estimate_style("The stars remember"), Some("poetic"));
        assert_eq!(estimate_style("The sadness lingers"), None);
        assert_eq!(estimate_style("plain words"), None);
    }
}
