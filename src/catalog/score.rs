use crate::model::Title;

/// Blend of rating and popularity in [0, 1]
///
/// `0.5 * rating / 10 + 0.5 * votes / max_votes`. Needs both a rating and a
/// vote count; `max_votes` is the largest vote count in the compared set.
#[must_use]
pub fn score(title: &Title, max_votes: u64) -> Option<f64> {
    let rating = title.rating()?;
    let votes = title.vote_count()?;
    let popularity = if max_votes == 0 {
        0.0
    } else {
        votes as f64 / max_votes as f64
    };
    Some(0.5 * rating / 10.0 + 0.5 * popularity)
}

/// Top `n` titles by [`score`], best first
///
/// Titles that cannot be scored are left out. Equal scores keep source order.
#[must_use]
pub fn top_by_score(titles: &[Title], n: usize) -> Vec<(&Title, f64)> {
    let max_votes = titles
        .iter()
        .filter_map(Title::vote_count)
        .max()
        .unwrap_or(0);

    let mut scored: Vec<(&Title, f64)> = titles
        .iter()
        .filter_map(|t| score(t, max_votes).map(|s| (t, s)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(n);
    scored
}
