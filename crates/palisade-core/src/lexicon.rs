//! Lexicon tables: banned terms, contextual keywords, and weights.
//!
//! The tables live as embedded JSON under `src/data/` and are parsed once
//! into a process-wide [`Lexicon`]. Entries hold their canonical form only;
//! obfuscated spellings are recovered by the normalizer and the fuzzy
//! matcher rather than being expanded into the tables.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Signal categories a piece of text can be flagged with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Terms that block on any hit, regardless of score.
    HardBan,
    /// Indicators that the subject is a minor.
    MinorAge,
    /// School-setting vocabulary.
    SchoolContext,
    /// Youth terms that are harmless alone but damning in combination.
    AmbiguousYouth,
    /// Sexual or suggestive context.
    SexualContext,
    /// A stated adult age; carries negative weight.
    AdultMarker,
    /// Prompt-injection attempt.
    Injection,
}

impl Category {
    /// Returns all categories.
    pub fn all() -> &'static [Category] {
        &[
            Category::HardBan,
            Category::MinorAge,
            Category::SchoolContext,
            Category::AmbiguousYouth,
            Category::SexualContext,
            Category::AdultMarker,
            Category::Injection,
        ]
    }

    /// Returns a human-readable name for this category.
    pub fn name(&self) -> &'static str {
        match self {
            Category::HardBan => "Hard Ban",
            Category::MinorAge => "Minor Age",
            Category::SchoolContext => "School Context",
            Category::AmbiguousYouth => "Ambiguous Youth",
            Category::SexualContext => "Sexual Context",
            Category::AdultMarker => "Adult Marker",
            Category::Injection => "Injection",
        }
    }
}

/// One lexicon term with its category and score weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntry {
    /// Canonical single-token form, already in normalized shape.
    pub term: String,
    /// Category credited on a match.
    pub category: Category,
    /// Non-negative score weight.
    pub weight: i32,
    /// Alternate spellings checked by exact match only.
    #[serde(default)]
    pub variants: Vec<String>,
}

/// The full term and pattern tables.
#[derive(Debug)]
pub struct Lexicon {
    entries: Vec<LexiconEntry>,
    injection_patterns: Vec<String>,
}

static LEXICON: Lazy<Lexicon> = Lazy::new(Lexicon::load_embedded);

impl Lexicon {
    /// Returns the process-wide lexicon, parsed on first use.
    pub fn embedded() -> &'static Lexicon {
        &LEXICON
    }

    fn load_embedded() -> Self {
        let hard: Vec<LexiconEntry> =
            serde_json::from_str(include_str!("data/hard_terms.json"))
                .expect("embedded hard term table is valid JSON");
        let context: Vec<LexiconEntry> =
            serde_json::from_str(include_str!("data/context_terms.json"))
                .expect("embedded context term table is valid JSON");
        let injection_patterns: Vec<String> =
            serde_json::from_str(include_str!("data/injection_patterns.json"))
                .expect("embedded injection pattern table is valid JSON");

        let mut entries = hard;
        entries.extend(context);
        for entry in &entries {
            assert!(
                entry.weight >= 0,
                "lexicon weight for {:?} must be non-negative",
                entry.term
            );
        }

        tracing::debug!(
            terms = entries.len(),
            injection_patterns = injection_patterns.len(),
            "lexicon loaded"
        );

        Self {
            entries,
            injection_patterns,
        }
    }

    /// All hard and context entries.
    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    /// Raw regex sources for the injection detector.
    pub fn injection_patterns(&self) -> &[String] {
        &self.injection_patterns
    }
}
