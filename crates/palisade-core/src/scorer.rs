//! Context scoring: weighted evidence, windowed clusters, cross-sentence
//! co-occurrence, and numeric age extraction.
//!
//! Individual hits are often weak signals; the scorer promotes
//! combinations. Several distinct entries inside a short token window get
//! their weights doubled, and a minor-age signal in one sentence combined
//! with sexual context in another draws a surcharge equal to the block
//! threshold.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::GuardConfig;
use crate::lexicon::{Category, Lexicon};
use crate::matcher::{self, TermMatch};
use crate::normalize::normalize_text;

/// Aggregated scoring outcome for one assessment.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    /// Final score after cluster, cross-sentence, and age adjustments.
    pub score: i32,
    /// Categories credited by term matches and age statements.
    pub categories: BTreeSet<Category>,
    /// Youngest stated minor age, if any.
    pub minor_age: Option<u32>,
}

/// Age statement patterns: "17 year old" / "17-year-old", "17 yo",
/// "17 y/o", "age 17". Anchored on word boundaries with bounded
/// quantifiers only.
static AGE_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"\b(\d{1,3})[\s-]*(?:years?[\s-]*old\b|y\s*/\s*o\b|yo\b)")
            .expect("age pattern compiles"),
        Regex::new(r"\bage[:\s]+(\d{1,3})\b").expect("age pattern compiles"),
    ]
});

/// Scores one assessment. `matches` must come from the full normalized
/// token stream; the raw text is consulted for age statements and
/// sentence boundaries (the normalizer erases both digit context and
/// punctuation).
pub fn score(
    raw: &str,
    normalized: &str,
    matches: &[TermMatch],
    lexicon: &Lexicon,
    config: &GuardConfig,
) -> ScoreOutcome {
    let mut score: i32 = matches.iter().map(|m| m.weight).sum();
    let mut categories: BTreeSet<Category> = matches.iter().map(|m| m.category).collect();

    if config.enable_clustering {
        score += cluster_bonus(matches, config);
    }

    // Age statements are read from both forms: the raw text keeps
    // unspaced shapes like "17yo", the normalized text keeps forms that
    // separator stuffing would otherwise hide.
    let mut ages = parse_ages(&raw.to_lowercase());
    for age in parse_ages(normalized) {
        if !ages.contains(&age) {
            ages.push(age);
        }
    }

    let mut minor_age: Option<u32> = None;
    for age in ages {
        if age >= 100 {
            continue;
        }
        if age < 18 {
            categories.insert(Category::MinorAge);
            score += config.context_score_threshold;
            minor_age = Some(minor_age.map_or(age, |m| m.min(age)));
        } else {
            categories.insert(Category::AdultMarker);
            score += config.adult_marker_weight();
        }
    }

    if config.enable_cross_sentence && cross_sentence_cooccurrence(raw, lexicon, config) {
        score += config.context_score_threshold;
    }

    ScoreOutcome {
        score,
        categories,
        minor_age,
    }
}

/// Extracts all stated ages, in order of appearance, deduplicated.
fn parse_ages(text: &str) -> Vec<u32> {
    let mut ages = Vec::new();
    for pattern in AGE_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            if let Some(age) = captures.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
                if !ages.contains(&age) {
                    ages.push(age);
                }
            }
        }
    }
    ages
}

/// Windowed cluster bonus: whenever at least `cluster_match_threshold`
/// distinct entries match inside one window of `cluster_window_tokens`
/// tokens, each involved entry's weight is credited a second time.
fn cluster_bonus(matches: &[TermMatch], config: &GuardConfig) -> i32 {
    if matches.len() < config.cluster_match_threshold {
        return 0;
    }

    let mut order: Vec<usize> = (0..matches.len()).collect();
    order.sort_by_key(|&i| matches[i].token_index);

    let mut clustered: BTreeSet<usize> = BTreeSet::new();
    for (start, &first) in order.iter().enumerate() {
        let window_end = matches[first].token_index + config.cluster_window_tokens;
        let in_window: Vec<usize> = order[start..]
            .iter()
            .copied()
            .take_while(|&i| matches[i].token_index < window_end)
            .collect();
        if in_window.len() >= config.cluster_match_threshold {
            clustered.extend(in_window);
        }
    }
    clustered.iter().map(|&i| matches[i].weight).sum()
}

/// True when a minor-age signal and a sexual-context hit land in two
/// different sentences of the same input.
fn cross_sentence_cooccurrence(raw: &str, lexicon: &Lexicon, config: &GuardConfig) -> bool {
    let sentences: Vec<&str> = raw
        .split(['.', '!', '?', ';', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.len() < 2 {
        return false;
    }

    let mut minor_sentences = Vec::new();
    let mut sexual_sentences = Vec::new();
    for (index, sentence) in sentences.iter().enumerate() {
        let normalized = normalize_text(sentence);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        let matches = matcher::find_matches(&tokens, lexicon, config);

        let minor_by_term = matches.iter().any(|m| m.category == Category::MinorAge);
        let minor_by_age = parse_ages(&sentence.to_lowercase())
            .into_iter()
            .any(|age| age < 18);
        if minor_by_term || minor_by_age {
            minor_sentences.push(index);
        }
        if matches.iter().any(|m| m.category == Category::SexualContext) {
            sexual_sentences.push(index);
        }
    }

    // At least one pair must sit in different sentences.
    minor_sentences
        .iter()
        .any(|m| sexual_sentences.iter().any(|s| s != m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(text: &str, config: &GuardConfig) -> ScoreOutcome {
        let normalized = normalize_text(text);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        let matches = matcher::find_matches(&tokens, Lexicon::embedded(), config);
        score(text, &normalized, &matches, Lexicon::embedded(), config)
    }

    // === Base score and clustering ===

    #[test]
    fn single_term_scores_its_weight() {
        let result = outcome("teen", &GuardConfig::default());
        assert_eq!(result.score, 5);
        assert!(result.categories.contains(&Category::AmbiguousYouth));
    }

    #[test]
    fn clustered_terms_double_their_weights() {
        // school (4) + girl (3), adjacent: 7 base + 7 cluster bonus.
        let result = outcome("high school girl", &GuardConfig::default());
        assert_eq!(result.score, 14);
    }

    #[test]
    fn cluster_bonus_respects_window() {
        // school at token 0, girl at token 9: outside the 6-token window.
        let text = "school is where we learn many things every day girl";
        let result = outcome(text, &GuardConfig::default());
        assert_eq!(result.score, 7);
    }

    #[test]
    fn clustering_can_be_disabled() {
        let config = GuardConfig {
            enable_clustering: false,
            ..GuardConfig::default()
        };
        let result = outcome("high school girl", &config);
        assert_eq!(result.score, 7);
    }

    // === Age parsing ===

    #[test]
    fn minor_age_forces_threshold_weight() {
        let config = GuardConfig::default();
        let result = outcome("a 17 year old", &config);
        assert_eq!(result.minor_age, Some(17));
        assert!(result.categories.contains(&Category::MinorAge));
        assert!(result.score >= config.context_score_threshold);
    }

    #[test]
    fn adult_age_subtracts_half_threshold() {
        let result = outcome("a 25 year old", &GuardConfig::default());
        assert_eq!(result.minor_age, None);
        assert!(result.categories.contains(&Category::AdultMarker));
        assert_eq!(result.score, -5);
    }

    #[test]
    fn adult_marker_counteracts_ambiguous_terms() {
        // young (2) - adult marker (5) stays non-positive.
        let result = outcome("a young 25 year old", &GuardConfig::default());
        assert!(result.score <= 0);
    }

    #[test]
    fn huge_numbers_are_not_ages() {
        let result = outcome("a 105 year old tree", &GuardConfig::default());
        assert_eq!(result.minor_age, None);
        assert_eq!(result.score, 0);
        assert!(result.categories.is_empty());
    }

    #[test]
    fn youngest_minor_age_wins() {
        let result = outcome("a 15 year old and a 17 year old", &GuardConfig::default());
        assert_eq!(result.minor_age, Some(15));
    }

    #[test]
    fn age_pattern_shapes() {
        assert_eq!(parse_ages("17 year old"), vec![17]);
        assert_eq!(parse_ages("17-year-old"), vec![17]);
        assert_eq!(parse_ages("17 yo"), vec![17]);
        assert_eq!(parse_ages("17yo"), vec![17]);
        assert_eq!(parse_ages("17 y/o"), vec![17]);
        assert_eq!(parse_ages("age 17"), vec![17]);
        assert_eq!(parse_ages("age: 17"), vec![17]);
        assert_eq!(parse_ages("in 2020 years"), Vec::<u32>::new());
        assert_eq!(parse_ages("no ages here"), Vec::<u32>::new());
    }

    // === Cross-sentence ===

    #[test]
    fn cross_sentence_surcharge_applies() {
        let text = "She is a minor. They got naked.";
        let with = outcome(text, &GuardConfig::default());
        let without = outcome(
            text,
            &GuardConfig {
                enable_cross_sentence: false,
                ..GuardConfig::default()
            },
        );
        assert_eq!(with.score - without.score, 10);
    }

    #[test]
    fn same_sentence_draws_no_surcharge() {
        let text = "The minor got naked";
        let with = outcome(text, &GuardConfig::default());
        let without = outcome(
            text,
            &GuardConfig {
                enable_cross_sentence: false,
                ..GuardConfig::default()
            },
        );
        assert_eq!(with.score, without.score);
    }

    #[test]
    fn numeric_age_counts_for_cross_sentence() {
        let text = "He just turned 16 years old. Send nudes.";
        let with = outcome(text, &GuardConfig::default());
        let without = outcome(
            text,
            &GuardConfig {
                enable_cross_sentence: false,
                ..GuardConfig::default()
            },
        );
        assert_eq!(with.score - without.score, 10);
    }
}
