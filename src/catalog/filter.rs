use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use crate::model::Title;

/// Runtime buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationCategory {
    /// Under 90 minutes
    Short,
    /// 90 to 150 minutes inclusive
    Medium,
    /// Over 150 minutes
    Long,
}

impl DurationCategory {
    #[must_use]
    pub fn of(minutes: u32) -> Self {
        match minutes {
            0..=89 => Self::Short,
            90..=150 => Self::Medium,
            _ => Self::Long,
        }
    }

    #[must_use]
    pub fn range(self) -> RangeInclusive<u32> {
        match self {
            Self::Short => 1..=89,
            Self::Medium => 90..=150,
            Self::Long => 151..=u32::MAX,
        }
    }
}

/// Conjunction of optional criteria; an unset criterion matches everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleFilter {
    genres: Option<BTreeSet<String>>,
    rating: Option<(f64, f64)>,
    votes: Option<(u64, u64)>,
    duration: Option<RangeInclusive<u32>>,
}

impl TitleFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep titles having any of `genres` (case-insensitive)
    #[must_use]
    pub fn genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.genres = Some(
            genres
                .into_iter()
                .map(|g| g.as_ref().trim().to_lowercase())
                .collect(),
        );
        self
    }

    /// Inclusive rating range
    #[must_use]
    pub fn rating_between(mut self, min: f64, max: f64) -> Self {
        self.rating = Some((min, max));
        self
    }

    /// Inclusive vote count range
    #[must_use]
    pub fn votes_between(mut self, min: u64, max: u64) -> Self {
        self.votes = Some((min, max));
        self
    }

    /// Inclusive runtime range in minutes
    #[must_use]
    pub fn duration_between(mut self, min: u32, max: u32) -> Self {
        self.duration = Some(min..=max);
        self
    }

    #[must_use]
    pub fn duration_category(mut self, category: DurationCategory) -> Self {
        self.duration = Some(category.range());
        self
    }

    #[must_use]
    pub fn matches(&self, title: &Title) -> bool {
        if let Some(ref genres) = self.genres
            && !title.genres().iter().any(|g| genres.contains(g))
        {
            return false;
        }
        if let Some((min, max)) = self.rating
            && !title.rating().is_some_and(|r| r >= min && r <= max)
        {
            return false;
        }
        if let Some((min, max)) = self.votes
            && !title.vote_count().is_some_and(|v| v >= min && v <= max)
        {
            return false;
        }
        if let Some(ref range) = self.duration
            && !title.duration_minutes().is_some_and(|d| range.contains(&d))
        {
            return false;
        }
        true
    }

    /// Matching titles in their original order
    #[must_use]
    pub fn apply<'a>(&self, titles: &'a [Title]) -> Vec<&'a Title> {
        titles.iter().filter(|t| self.matches(t)).collect()
    }
}
