use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::Title;
use crate::normalize::numeric::{RATING_MAX, RATING_MIN};

/// Aggregates for one genre, computed over present values only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreSummary {
    pub genre: String,
    pub count: usize,
    pub average_rating: Option<f64>,
    pub average_duration: Option<f64>,
    pub average_votes: Option<f64>,
    pub total_votes: u64,
    /// Id of the highest-rated title; the first one wins a tie
    pub top_rated: Option<String>,
}

#[derive(Default)]
struct Accumulator<'a> {
    count: usize,
    ratings: Vec<f64>,
    durations: Vec<f64>,
    votes: Vec<u64>,
    top: Option<(&'a Title, f64)>,
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> Option<f64> {
    let len = values.len();
    if len == 0 {
        return None;
    }
    Some(values.sum::<f64>() / len as f64)
}

/// Per-genre summaries sorted by genre name
///
/// A title with several genres counts once in each.
#[must_use]
pub fn summarize_by_genre(titles: &[Title]) -> Vec<GenreSummary> {
    let mut groups: BTreeMap<&str, Accumulator<'_>> = BTreeMap::new();

    for title in titles {
        for genre in title.genres() {
            let acc = groups.entry(genre.as_str()).or_default();
            acc.count += 1;
            if let Some(rating) = title.rating() {
                acc.ratings.push(rating);
                if acc.top.is_none_or(|(_, best)| rating > best) {
                    acc.top = Some((title, rating));
                }
            }
            if let Some(minutes) = title.duration_minutes() {
                acc.durations.push(f64::from(minutes));
            }
            if let Some(votes) = title.vote_count() {
                acc.votes.push(votes);
            }
        }
    }

    groups
        .into_iter()
        .map(|(genre, acc)| GenreSummary {
            genre: genre.to_string(),
            count: acc.count,
            average_rating: mean(acc.ratings.iter().copied()),
            average_duration: mean(acc.durations.iter().copied()),
            average_votes: mean(acc.votes.iter().map(|&v| v as f64)),
            total_votes: acc.votes.iter().sum(),
            top_rated: acc.top.map(|(t, _)| t.id().to_string()),
        })
        .collect()
}

/// Shortest and longest titles with a known runtime
#[must_use]
pub fn duration_extremes(titles: &[Title]) -> Option<(&Title, &Title)> {
    let mut timed = titles
        .iter()
        .filter_map(|t| t.duration_minutes().map(|d| (t, d)));
    let (first, minutes) = timed.next()?;

    let mut shortest = (first, minutes);
    let mut longest = (first, minutes);
    for (title, minutes) in timed {
        if minutes < shortest.1 {
            shortest = (title, minutes);
        }
        if minutes > longest.1 {
            longest = (title, minutes);
        }
    }
    Some((shortest.0, longest.0))
}

/// Counts of present ratings in `bins` equal-width buckets over [0, 10]
///
/// The top bucket includes 10.0.
#[must_use]
pub fn rating_histogram(titles: &[Title], bins: usize) -> Vec<usize> {
    let mut counts = vec![0; bins];
    if bins == 0 {
        return counts;
    }
    let width = (RATING_MAX - RATING_MIN) / bins as f64;
    for rating in titles.iter().filter_map(Title::rating) {
        let index = (((rating - RATING_MIN) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }
    counts
}
