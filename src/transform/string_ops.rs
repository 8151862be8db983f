use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Returns a lowercase representation, reusing the original string if already lowercase.
pub fn lowercase(input: &str) -> Cow<'_, str> {
    if input.chars().all(|ch| !ch.is_uppercase()) {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(input.to_lowercase())
    }
}

/// Collapses every internal whitespace run (tabs and newlines included) to one space.
pub fn collapse_whitespace(input: &str) -> Cow<'_, str> {
    let needs_rewrite = WHITESPACE_RUN
        .find_iter(input)
        .any(|m| m.as_str() != " ");
    if needs_rewrite {
        Cow::Owned(WHITESPACE_RUN.replace_all(input, " ").into_owned())
    } else {
        Cow::Borrowed(input)
    }
}

/// Canonical categorical form: trimmed, whitespace-collapsed, lowercase.
pub fn normalize_category(input: &str) -> Cow<'_, str> {
    match collapse_whitespace(input.trim()) {
        Cow::Borrowed(collapsed) => lowercase(collapsed),
        Cow::Owned(collapsed) => Cow::Owned(lowercase(&collapsed).into_owned()),
    }
}
