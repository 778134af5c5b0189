//! Normalized title records produced by the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One normalized movie record
///
/// Immutable once emitted: fields are only readable, and the only producer is
/// [`crate::normalize::normalize`]. Absent numeric fields stay `None`; they are
/// never coerced to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    id: String,
    name: String,
    genres: BTreeSet<String>,
    rating: Option<f64>,
    vote_count: Option<u64>,
    duration_minutes: Option<u32>,
    source_url: String,
}

impl Title {
    pub(crate) fn new(
        id: String,
        name: String,
        genres: BTreeSet<String>,
        rating: Option<f64>,
        vote_count: Option<u64>,
        duration_minutes: Option<u32>,
        source_url: String,
    ) -> Self {
        Self {
            id,
            name,
            genres,
            rating,
            vote_count,
            duration_minutes,
            source_url,
        }
    }

    /// Stable identifier derived from the canonical source URL
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased genre names
    #[must_use]
    pub fn genres(&self) -> &BTreeSet<String> {
        &self.genres
    }

    /// Rating in [0.0, 10.0], or `None` when unknown
    #[must_use]
    pub fn rating(&self) -> Option<f64> {
        self.rating
    }

    #[must_use]
    pub fn vote_count(&self) -> Option<u64> {
        self.vote_count
    }

    /// Runtime in minutes (always positive when present)
    #[must_use]
    pub fn duration_minutes(&self) -> Option<u32> {
        self.duration_minutes
    }

    /// Canonical detail-page URL
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    #[must_use]
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.contains(&genre.trim().to_lowercase())
    }
}
