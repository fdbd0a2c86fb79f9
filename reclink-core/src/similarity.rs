//! Fuzzy comparisons used to decide whether a recording could be the one a
//! track refers to.

use std::sync::OnceLock;

use regex::Regex;
use strsim::normalized_levenshtein;

/// Largest length difference, in milliseconds, at which two durations are
/// still considered the same recording.
pub const MAX_LENGTH_DIFFERENCE: u64 = 10_500;

/// Minimum normalized Levenshtein similarity for two names to match.
pub const MIN_NAME_SIMILARITY: f64 = 0.75;

fn trailing_parenthetical() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s*\([^()]*\)\s*$").unwrap())
}

/// Lowercase and collapse whitespace.
fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether two names are close enough to refer to the same recording.
pub fn similar_names(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let a = normalize_name(a);
    let b = normalize_name(b);
    if a.is_empty() || b.is_empty() {
        return a == b;
    }
    a == b || normalized_levenshtein(&a, &b) >= MIN_NAME_SIMILARITY
}

/// Drop one trailing parenthetical qualifier: `"Intro (Live)"` becomes
/// `"Intro"`. A name that is nothing but a parenthetical is kept as is.
pub fn strip_parenthetical(name: &str) -> &str {
    match trailing_parenthetical().find(name) {
        Some(m) if m.start() > 0 => name[..m.start()].trim(),
        _ => name.trim(),
    }
}

/// [`similar_names`], also trying each side without its trailing
/// parenthetical qualifier.
pub fn similar_titles(a: &str, b: &str) -> bool {
    let stripped_a = strip_parenthetical(a);
    let stripped_b = strip_parenthetical(b);
    similar_names(a, b)
        || similar_names(stripped_a, b)
        || similar_names(a, stripped_b)
        || similar_names(stripped_a, stripped_b)
}

/// Whether two durations are within [`MAX_LENGTH_DIFFERENCE`]. A missing
/// duration never disqualifies a match.
pub fn similar_lengths(a: Option<u64>, b: Option<u64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.abs_diff(b) <= MAX_LENGTH_DIFFERENCE,
        _ => true,
    }
}
