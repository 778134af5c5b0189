//! Text field cleanup for names and genres.

use std::collections::BTreeSet;

/// Collapse runs of whitespace and trim; `None` when nothing is left
#[must_use]
pub fn clean_name(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Lower-cased genre set; a raw value may hold several comma-separated genres
#[must_use]
pub fn clean_genres<S: AsRef<str>>(raw: &[S]) -> BTreeSet<String> {
    raw.iter()
        .flat_map(|value| value.as_ref().split(','))
        .filter_map(clean_name)
        .map(|genre| genre.to_lowercase())
        .collect()
}
