//! Query helpers over emitted titles
//!
//! Consumer-side filtering, ranking and per-genre summaries. Absent numeric
//! fields are never treated as 0: a title without a rating does not match
//! a rating range and does not contribute to a rating average.

mod filter;
mod score;
mod summary;

pub use filter::{DurationCategory, TitleFilter};
pub use score::{score, top_by_score};
pub use summary::{GenreSummary, duration_extremes, rating_histogram, summarize_by_genre};
