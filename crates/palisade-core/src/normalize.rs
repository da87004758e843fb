//! Text canonicalization for obfuscation-resistant matching.
//!
//! Collapses the common evasion channels (diacritics, mixed case,
//! Cyrillic/Greek lookalikes, leet digits, separator stuffing, letter
//! spacing, character stretching) into a canonical lowercase ASCII form
//! that all downstream matching runs against.
//!
//! Guarantees of [`normalize_text`]:
//! - pure function, no configuration involved;
//! - output contains only `[a-z0-9 ]` with single spaces, trimmed;
//! - output is never longer than the input (in characters);
//! - idempotent: normalizing twice equals normalizing once.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lookalike characters folded to their ASCII twins: Cyrillic and Greek
/// letters that render like Latin ones, plus Latin letters NFD cannot
/// decompose. Fullwidth forms are folded by offset in [`fold_homoglyph`].
const HOMOGLYPHS: &[(char, char)] = &[
    // Cyrillic
    ('а', 'a'),
    ('в', 'b'),
    ('е', 'e'),
    ('ё', 'e'),
    ('з', '3'),
    ('и', 'n'),
    ('і', 'i'),
    ('ї', 'i'),
    ('ј', 'j'),
    ('к', 'k'),
    ('м', 'm'),
    ('н', 'h'),
    ('о', 'o'),
    ('р', 'p'),
    ('с', 'c'),
    ('ѕ', 's'),
    ('т', 't'),
    ('у', 'y'),
    ('х', 'x'),
    ('ь', 'b'),
    // Greek
    ('α', 'a'),
    ('β', 'b'),
    ('ε', 'e'),
    ('η', 'n'),
    ('ι', 'i'),
    ('κ', 'k'),
    ('μ', 'u'),
    ('ν', 'v'),
    ('ο', 'o'),
    ('ρ', 'p'),
    ('ς', 's'),
    ('σ', 's'),
    ('τ', 't'),
    ('υ', 'u'),
    ('χ', 'x'),
    ('ω', 'w'),
    // Latin without a canonical decomposition
    ('æ', 'a'),
    ('ð', 'd'),
    ('đ', 'd'),
    ('ħ', 'h'),
    ('ı', 'i'),
    ('ł', 'l'),
    ('ø', 'o'),
    ('œ', 'o'),
    ('ß', 's'),
];

/// Character substitutions used to dodge keyword filters. Applied only
/// inside tokens that carry at least one letter; pure-numeric tokens keep
/// their digits so age expressions like "17 year old" survive. `1` always
/// folds to `i`; the `l` reading is left to the fuzzy matcher.
const LEET: &[(char, char)] = &[
    ('0', 'o'),
    ('1', 'i'),
    ('3', 'e'),
    ('4', 'a'),
    ('5', 's'),
    ('7', 't'),
    ('@', 'a'),
    ('$', 's'),
    ('!', 'i'),
];

/// Canonicalizes text for matching. See the module docs for guarantees.
pub fn normalize_text(input: &str) -> String {
    // Decompose, strip combining marks, fold case, fold lookalikes.
    let folded: String = input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(fold_homoglyph)
        .collect();

    // Everything outside the token alphabet is a separator, including
    // zero-width characters, narrow spaces, hyphens, underscores, and
    // dots between letters.
    let mut tokens: Vec<String> = folded
        .split(|c: char| !is_token_char(c))
        .filter(|run| !run.is_empty())
        .map(fold_token)
        .filter(|token| !token.is_empty())
        .collect();

    fuse_spaced_letters(&mut tokens);

    let tokens: Vec<String> = tokens.iter().map(|t| collapse_repeats(t)).collect();
    tokens.join(" ")
}

/// Characters that belong to a token before the leet fold runs.
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '@' | '$' | '!')
}

fn fold_homoglyph(c: char) -> char {
    // Fullwidth ASCII block maps back to ASCII by offset.
    if ('\u{ff01}'..='\u{ff5e}').contains(&c) {
        return char::from_u32(c as u32 - 0xff01 + 0x21).unwrap_or(c);
    }
    HOMOGLYPHS
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
        .unwrap_or(c)
}

/// Applies the leet fold to a letter-bearing token, or strips a pure
/// symbol/digit run down to its digits.
fn fold_token(run: &str) -> String {
    if run.chars().any(|c| c.is_ascii_alphabetic()) {
        run.chars().map(fold_leet).collect()
    } else {
        run.chars().filter(char::is_ascii_digit).collect()
    }
}

fn fold_leet(c: char) -> char {
    LEET.iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
        .unwrap_or(c)
}

/// Fuses runs of two or more single-letter tokens back into one token, so
/// letter-spacing obfuscation ("l.o.l.i", "l o l i") cannot split a term
/// across token boundaries. Lone single-letter tokens are left alone.
fn fuse_spaced_letters(tokens: &mut Vec<String>) {
    fn is_single_letter(t: &str) -> bool {
        t.len() == 1 && t.chars().all(|c| c.is_ascii_alphabetic())
    }

    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if is_single_letter(&tokens[i]) {
            let mut j = i + 1;
            while j < tokens.len() && is_single_letter(&tokens[j]) {
                j += 1;
            }
            if j - i >= 2 {
                out.push(tokens[i..j].concat());
            } else {
                out.push(tokens[i].clone());
            }
            i = j;
        } else {
            out.push(tokens[i].clone());
            i += 1;
        }
    }
    *tokens = out;
}

/// Collapses letter runs of length >= 3 down to 2 ("loooli" -> "looli").
/// Length-2 runs and digit runs are preserved.
fn collapse_repeats(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut run_char: Option<char> = None;
    let mut run_len = 0usize;
    for c in token.chars() {
        if run_char == Some(c) && c.is_ascii_alphabetic() {
            run_len += 1;
            if run_len <= 2 {
                out.push(c);
            }
        } else {
            run_char = Some(c);
            run_len = 1;
            out.push(c);
        }
    }
    out
}
