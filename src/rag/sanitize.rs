//! Cleanup of generated answers.

use std::sync::LazyLock;

use regex::Regex;

/// `[doc1]`, `[doc12]`, ... citation markers inserted by the service.
static DOC_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[doc\d+\]").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.;:!?])").unwrap());

/// Strip citation markers and tidy the spacing they leave behind.
pub fn sanitize_answer(text: &str) -> String {
    let without_markers = DOC_MARKER.replace_all(text, "");
    let collapsed = WHITESPACE_RUN.replace_all(&without_markers, " ");
    let tightened = SPACE_BEFORE_PUNCT.replace_all(&collapsed, "$1");
    tightened.trim().to_string()
}
