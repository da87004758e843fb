//! Fuzzy matching of lexicon entries against normalized tokens.
//!
//! Four checks run in order per token: exact equality, Hamming distance on
//! equal-length tokens, Jaccard similarity over character 2-grams, and a
//! Soundex-style phonetic code. The first hit wins and each entry reports
//! at most one match. Variants listed on an entry are checked exactly;
//! only the canonical term goes through the fuzzy checks.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::GuardConfig;
use crate::lexicon::{Category, Lexicon, LexiconEntry};

/// Hamming runs only on tokens at least this long; equal-length edits on
/// shorter tokens turn common words into matches.
const MIN_HAMMING_TOKEN_LEN: usize = 5;

/// How a lexicon entry matched a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Hamming,
    Jaccard,
    Phonetic,
}

/// A single lexicon hit against the normalized token stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermMatch {
    /// Canonical lexicon term that matched.
    pub term: String,
    /// Category credited for the hit.
    pub category: Category,
    /// Score weight credited for the hit.
    pub weight: i32,
    /// The token that triggered the match.
    pub token: String,
    /// Position of the token in the normalized token stream.
    pub token_index: usize,
    /// Which check produced the match.
    pub kind: MatchKind,
}

/// Runs every lexicon entry against every token. Returns at most one match
/// per entry (earliest token, strongest check first).
pub fn find_matches(tokens: &[&str], lexicon: &Lexicon, config: &GuardConfig) -> Vec<TermMatch> {
    let token_codes: Vec<Option<String>> = tokens
        .iter()
        .map(|t| {
            if config.enable_fuzzy_matching && t.len() >= config.soundex_min_length {
                soundex(t)
            } else {
                None
            }
        })
        .collect();

    let mut matches = Vec::new();
    for entry in lexicon.entries() {
        let entry_code = if config.enable_fuzzy_matching
            && entry.term.len() >= config.soundex_min_length
        {
            soundex(&entry.term)
        } else {
            None
        };

        for (i, token) in tokens.iter().enumerate() {
            if let Some(kind) =
                match_token(token, token_codes[i].as_deref(), entry, entry_code.as_deref(), config)
            {
                matches.push(TermMatch {
                    term: entry.term.clone(),
                    category: entry.category,
                    weight: entry.weight,
                    token: (*token).to_string(),
                    token_index: i,
                    kind,
                });
                break;
            }
        }
    }
    matches
}

fn match_token(
    token: &str,
    token_code: Option<&str>,
    entry: &LexiconEntry,
    entry_code: Option<&str>,
    config: &GuardConfig,
) -> Option<MatchKind> {
    if token == entry.term || entry.variants.iter().any(|v| v == token) {
        return Some(MatchKind::Exact);
    }
    if !config.enable_fuzzy_matching {
        return None;
    }

    // Hamming: equal length, shared leading character.
    if token.len() >= MIN_HAMMING_TOKEN_LEN && token.chars().next() == entry.term.chars().next() {
        if let Some(distance) = hamming_distance(token, &entry.term) {
            if distance <= config.hamming_distance_threshold {
                return Some(MatchKind::Hamming);
            }
        }
    }

    if jaccard_bigrams(token, &entry.term) >= config.jaccard_threshold {
        return Some(MatchKind::Jaccard);
    }

    if let (Some(tc), Some(ec)) = (token_code, entry_code) {
        if tc == ec {
            return Some(MatchKind::Phonetic);
        }
    }

    None
}

/// Count of differing positions; `None` when lengths differ.
fn hamming_distance(a: &str, b: &str) -> Option<usize> {
    if a.chars().count() != b.chars().count() {
        return None;
    }
    Some(a.chars().zip(b.chars()).filter(|(x, y)| x != y).count())
}

/// Jaccard similarity of the character-2-gram sets of two strings.
/// Strings too short to produce a 2-gram only compare equal-or-not.
fn jaccard_bigrams(a: &str, b: &str) -> f64 {
    let a_grams = bigrams(a);
    let b_grams = bigrams(b);
    if a_grams.is_empty() || b_grams.is_empty() {
        return if a == b { 1.0 } else { 0.0 };
    }
    let intersection = a_grams.intersection(&b_grams).count();
    let union = a_grams.union(&b_grams).count();
    intersection as f64 / union as f64
}

fn bigrams(s: &str) -> HashSet<(char, char)> {
    s.chars().zip(s.chars().skip(1)).collect()
}

/// Four-character phonetic code: the first letter, then consonant classes
/// (`bfpv`=1, `cgjkqsxz`=2, `dt`=3, `l`=4, `mn`=5, `r`=6). Vowels reset
/// the running class without being coded; `h` and `w` are transparent;
/// adjacent duplicate classes collapse; padded with zeros. `None` for
/// tokens with any non-letter character.
fn soundex(token: &str) -> Option<String> {
    if token.is_empty() || token.chars().any(|c| !c.is_ascii_alphabetic()) {
        return None;
    }
    let mut chars = token.chars();
    let first = chars.next()?;

    let mut code = String::with_capacity(4);
    code.push(first.to_ascii_uppercase());
    let mut last_class = consonant_class(first);
    for c in chars {
        match consonant_class(c) {
            Some(digit) => {
                if last_class != Some(digit) {
                    code.push(digit);
                    if code.len() == 4 {
                        break;
                    }
                }
                last_class = Some(digit);
            }
            None => {
                if !matches!(c, 'h' | 'w') {
                    last_class = None;
                }
            }
        }
    }
    while code.len() < 4 {
        code.push('0');
    }
    Some(code)
}

fn consonant_class(c: char) -> Option<char> {
    match c {
        'b' | 'f' | 'p' | 'v' => Some('1'),
        'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some('2'),
        'd' | 't' => Some('3'),
        'l' => Some('4'),
        'm' | 'n' => Some('5'),
        'r' => Some('6'),
        _ => None,
    }
}
