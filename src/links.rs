use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("link pattern should compile"));

/// Titles referenced from `content` with `[[Title]]`, trimmed, de-duplicated
/// and sorted.
pub fn extract_links(content: &str) -> Vec<String> {
    LINK_RE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|span| span.as_str().trim().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The literal text a note must contain to link to `title`.
pub fn link_marker(title: &str) -> String {
    format!("[[{title}]]")
}
