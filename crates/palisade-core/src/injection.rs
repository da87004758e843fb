//! Prompt-injection detection.
//!
//! Scans for role-override phrases, system-prompt delimiters, and
//! instruction-negation constructs. Both the lowercased raw text and the
//! normalized text are checked: delimiters like `<|system|>` only exist in
//! the raw form, while separator stuffing only collapses in the normalized
//! form. The pattern bank lives in `data/injection_patterns.json`.

use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

use crate::lexicon::Lexicon;

struct InjectionMatcher {
    /// Fast multi-pattern pre-check.
    set: RegexSet,
    /// Individual patterns for extracting the matched text.
    patterns: Vec<Regex>,
}

static MATCHER: Lazy<InjectionMatcher> = Lazy::new(|| {
    let sources = Lexicon::embedded().injection_patterns();
    let set = RegexSet::new(sources).expect("injection patterns compile");
    let patterns = sources
        .iter()
        .map(|p| Regex::new(p).expect("injection pattern compiles"))
        .collect();
    InjectionMatcher { set, patterns }
});

/// Returns the first matched injection fragment, or `None` when the text
/// is clean.
pub fn detect(raw: &str, normalized: &str) -> Option<String> {
    let raw_lower = raw.to_lowercase();
    for text in [raw_lower.as_str(), normalized] {
        let hits = MATCHER.set.matches(text);
        if let Some(index) = hits.iter().next() {
            if let Some(found) = MATCHER.patterns[index].find(text) {
                return Some(found.as_str().to_string());
            }
        }
    }
    None
}
