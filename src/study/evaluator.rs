//! Free-text answer scoring.
//!
//! Matching is deliberately lenient: after normalization an answer is
//! accepted when it contains, or is contained in, either the expected
//! answer of the variation or the card's original answer.

use std::sync::LazyLock;

use regex::Regex;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("non-word pattern is valid"));

/// Lowercases, trims, and removes everything that is not a word character
/// or whitespace, in that order.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    NON_WORD.replace_all(lowered.trim(), "").into_owned()
}

/// Scores a user answer against a variation's expected answer and the
/// card's original answer.
///
/// An empty normalized answer is contained in every string and is always
/// accepted.
pub fn is_correct(user_answer: &str, expected_answer: &str, original_answer: &str) -> bool {
    let user = normalize(user_answer);
    let expected = normalize(expected_answer);
    let original = normalize(original_answer);

    user.contains(&expected)
        || expected.contains(&user)
        || user.contains(&original)
        || original.contains(&user)
}
