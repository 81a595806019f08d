//! Name canonicalization.
//!
//! Builds the comparison key used by the exclusion filter and the substring
//! lookup. Steps run in a fixed order: NFKD decomposition, ASCII-only
//! filtering, removal of anything that is not a word character or whitespace,
//! lower-casing, trimming. Interior whitespace runs collapse to one space.

use unicode_normalization::UnicodeNormalization;

/// Normalize an optional name. Absent names normalize to `""`.
pub fn normalize_name(raw: Option<&str>) -> String {
    raw.map(normalize).unwrap_or_default()
}

/// Normalize a name. Never fails; unusable input yields `""`.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .nfkd()
        .filter(char::is_ascii)
        .filter(|c| is_word(*c) || is_space(*c))
        .map(|c| c.to_ascii_lowercase())
        .collect();

    stripped
        .split(is_space)
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ASCII whitespace plus vertical tab and the information separators.
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c' | '\x1c'..='\x1f')
}
