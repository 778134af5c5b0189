//! Record normalization
//!
//! Turns the raw strings read from a detail page into a typed [`Title`].
//! Unparseable or out-of-range values never fail normalization: the field is
//! left absent and an [`Anomaly`] is recorded next to the title.

pub mod numeric;
mod text;

use serde::{Deserialize, Serialize};

use crate::error::{ScrapeError, ScrapeResult};
use crate::model::Title;

pub use numeric::{parse_duration_minutes, parse_rating, parse_vote_count};
pub use text::{clean_genres, clean_name};

/// Why a raw value was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyReason {
    Unparseable,
    OutOfRange,
    NonPositive,
    /// A rating beyond the first one found on the page
    ExtraRatingSource,
}

/// A successfully extracted but semantically invalid field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub field: String,
    pub raw: String,
    pub reason: AnomalyReason,
}

impl Anomaly {
    fn new(field: &str, raw: &str, reason: AnomalyReason) -> Self {
        Self {
            field: field.to_string(),
            raw: raw.to_string(),
            reason,
        }
    }
}

/// Raw field text as read from a detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTitle {
    pub source_url: String,
    pub id: String,
    pub name: Option<String>,
    pub genres: Vec<String>,
    /// Every rating source found, in page order
    pub ratings: Vec<String>,
    pub vote_count: Option<String>,
    pub duration: Option<String>,
}

/// A normalized title with the anomalies recorded while typing it
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub title: Title,
    pub anomalies: Vec<Anomaly>,
}

/// Convert raw fields into a [`Title`]
///
/// Fails only when the id or name is empty; numeric problems become anomalies.
pub fn normalize(raw: RawTitle) -> ScrapeResult<Normalized> {
    let id = raw.id.trim().to_string();
    if id.is_empty() {
        return Err(ScrapeError::MissingField("id".to_string()));
    }
    let name = raw
        .name
        .as_deref()
        .and_then(clean_name)
        .ok_or_else(|| ScrapeError::MissingField("name".to_string()))?;

    let mut anomalies = Vec::new();

    let mut ratings = raw.ratings.iter();
    let rating = ratings
        .next()
        .and_then(|first| typed_field("rating", first, parse_rating, &mut anomalies));
    for extra in ratings {
        anomalies.push(Anomaly::new(
            "rating",
            extra,
            AnomalyReason::ExtraRatingSource,
        ));
    }

    let vote_count = raw
        .vote_count
        .as_deref()
        .and_then(|v| typed_field("vote_count", v, parse_vote_count, &mut anomalies));

    let duration_minutes = raw.duration.as_deref().and_then(|d| {
        typed_field("duration_minutes", d, parse_duration_minutes, &mut anomalies)
    });

    let title = Title::new(
        id,
        name,
        clean_genres(&raw.genres),
        rating,
        vote_count,
        duration_minutes,
        raw.source_url,
    );

    Ok(Normalized { title, anomalies })
}

fn typed_field<T>(
    field: &str,
    raw: &str,
    parse: fn(&str) -> Result<T, AnomalyReason>,
    anomalies: &mut Vec<Anomaly>,
) -> Option<T> {
    match parse(raw) {
        Ok(value) => Some(value),
        Err(reason) => {
            anomalies.push(Anomaly::new(field, raw, reason));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawTitle {
        RawTitle {
            source_url: "https://www.imdb.com/title/tt0111161".to_string(),
            id: "tt0111161".to_string(),
            name: Some(" The Shawshank\n Redemption ".to_string()),
            genres: vec!["Drama".to_string()],
            ratings: vec!["9.3".to_string()],
            vote_count: Some("2,900,000".to_string()),
            duration: Some("2h 22m".to_string()),
        }
    }

    #[test]
    fn well_formed_fields_are_typed() {
        let normalized = normalize(raw()).unwrap();
        let title = normalized.title;
        assert_eq!(title.name(), "The Shawshank Redemption");
        assert_eq!(title.rating(), Some(9.3));
        assert_eq!(title.vote_count(), Some(2_900_000));
        assert_eq!(title.duration_minutes(), Some(142));
        assert!(title.has_genre("drama"));
        assert!(normalized.anomalies.is_empty());
    }

    #[test]
    fn out_of_range_rating_is_absent_with_anomaly() {
        let mut input = raw();
        input.ratings = vec!["11.2".to_string()];
        let normalized = normalize(input).unwrap();
        assert_eq!(normalized.title.rating(), None);
        assert_eq!(
            normalized.anomalies,
            vec![Anomaly::new("rating", "11.2", AnomalyReason::OutOfRange)]
        );
    }

    #[test]
    fn first_rating_source_wins() {
        let mut input = raw();
        input.ratings = vec!["8.0".to_string(), "7.1".to_string(), "6.4".to_string()];
        let normalized = normalize(input).unwrap();
        assert_eq!(normalized.title.rating(), Some(8.0));
        assert_eq!(normalized.anomalies.len(), 2);
        assert!(
            normalized
                .anomalies
                .iter()
                .all(|a| a.reason == AnomalyReason::ExtraRatingSource)
        );
    }

    #[test]
    fn missing_numeric_fields_stay_absent() {
        let mut input = raw();
        input.ratings.clear();
        input.vote_count = None;
        input.duration = None;
        let normalized = normalize(input).unwrap();
        assert_eq!(normalized.title.rating(), None);
        assert_eq!(normalized.title.vote_count(), None);
        assert_eq!(normalized.title.duration_minutes(), None);
        assert!(normalized.anomalies.is_empty());
    }

    #[test]
    fn empty_identity_fields_fail() {
        let mut no_name = raw();
        no_name.name = Some("   ".to_string());
        assert!(matches!(
            normalize(no_name),
            Err(ScrapeError::MissingField(field)) if field == "name"
        ));

        let mut no_id = raw();
        no_id.id = String::new();
        assert!(matches!(
            normalize(no_id),
            Err(ScrapeError::MissingField(field)) if field == "id"
        ));
    }
}
