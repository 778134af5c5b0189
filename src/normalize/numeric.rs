//! Numeric field parsers
//!
//! Each parser takes the raw text read from the page and returns either the
//! typed value or the reason it was rejected. Rejections never fail the
//! extraction; the caller records them as anomalies and leaves the field absent.

use regex::Regex;
use std::sync::LazyLock;

use super::AnomalyReason;

pub const RATING_MIN: f64 = 0.0;
pub const RATING_MAX: f64 = 10.0;

static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+(?:\.\d+)?$").expect("DECIMAL: hardcoded regex is valid"));

static VOTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<num>\d[\d.,']*)(?P<suffix>[kmb])?$").expect("VOTES: hardcoded regex is valid")
});

static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^pt(?:(?P<h>\d+)h)?(?:(?P<m>\d+)m)?(?:\d+s)?$")
        .expect("ISO_DURATION: hardcoded regex is valid")
});

static HUMAN_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<h>\d+)\s*h(?:ours?|rs?)?)?\s*(?:(?P<m>\d+)\s*m(?:in(?:utes?|s)?)?)?$",
    )
    .expect("HUMAN_DURATION: hardcoded regex is valid")
});

/// Characters used as digit-group separators across locales
fn is_space_separator(c: char) -> bool {
    c.is_whitespace() || c == '\u{a0}' || c == '\u{202f}'
}

/// Parse a rating such as `7.5`, `7,5` or `7.5/10`
///
/// Values outside [0.0, 10.0] are rejected as `OutOfRange`; they are never
/// clamped.
pub fn parse_rating(raw: &str) -> Result<f64, AnomalyReason> {
    let head = raw.split('/').next().unwrap_or_default();
    let mut text: String = head.chars().filter(|c| !is_space_separator(*c)).collect();

    // Decimal comma (`7,5`) when no dot is present
    if text.contains(',') && !text.contains('.') {
        text = text.replace(',', ".");
    }

    if !DECIMAL.is_match(&text) {
        return Err(AnomalyReason::Unparseable);
    }

    let value: f64 = text.parse().map_err(|_| AnomalyReason::Unparseable)?;
    if !value.is_finite() || !(RATING_MIN..=RATING_MAX).contains(&value) {
        return Err(AnomalyReason::OutOfRange);
    }
    Ok(value)
}

/// Parse a vote count such as `1,234`, `1.234.567`, `(12K)` or `1.2M votes`
pub fn parse_vote_count(raw: &str) -> Result<u64, AnomalyReason> {
    let mut text = raw.trim().to_lowercase();
    for word in ["votes", "vote", "ratings", "rating"] {
        if let Some(stripped) = text.strip_suffix(word) {
            text = stripped.trim_end().to_string();
            break;
        }
    }
    let text = text.trim_start_matches('(').trim_end_matches(')');
    let text: String = text.chars().filter(|c| !is_space_separator(*c)).collect();

    if text.starts_with('-') {
        return Err(AnomalyReason::OutOfRange);
    }

    let captures = VOTES.captures(&text).ok_or(AnomalyReason::Unparseable)?;
    let number = &captures["num"];

    match captures.name("suffix").map(|m| m.as_str()) {
        Some(suffix) => {
            let multiplier: u64 = match suffix {
                "k" => 1_000,
                "m" => 1_000_000,
                _ => 1_000_000_000,
            };
            parse_scaled(number, multiplier)
        }
        None => parse_grouped(number),
    }
}

/// Integer with optional digit grouping; every group after the first must have 3 digits
fn parse_grouped(number: &str) -> Result<u64, AnomalyReason> {
    let groups: Vec<&str> = number.split(['.', ',', '\'']).collect();
    let (first, rest) = groups.split_first().ok_or(AnomalyReason::Unparseable)?;

    if first.is_empty() || rest.iter().any(|g| g.len() != 3) {
        return Err(AnomalyReason::Unparseable);
    }

    groups
        .concat()
        .parse::<u64>()
        .map_err(|_| AnomalyReason::OutOfRange)
}

/// Mantissa with an optional decimal part scaled by a K/M/B multiplier
fn parse_scaled(number: &str, multiplier: u64) -> Result<u64, AnomalyReason> {
    let separators = number.matches(['.', ',']).count();

    let (int_part, frac_part) = match number.find(['.', ',']) {
        Some(pos) if separators == 1 && number.len() - pos - 1 < 3 => {
            (&number[..pos], &number[pos + 1..])
        }
        _ => {
            return parse_grouped(number)?
                .checked_mul(multiplier)
                .ok_or(AnomalyReason::OutOfRange);
        }
    };

    if int_part.is_empty() || frac_part.is_empty() {
        return Err(AnomalyReason::Unparseable);
    }

    let int_value: u64 = int_part.parse().map_err(|_| AnomalyReason::Unparseable)?;
    let frac_value: u64 = frac_part.parse().map_err(|_| AnomalyReason::Unparseable)?;
    let scale = 10u64.pow(frac_part.len() as u32);

    int_value
        .checked_mul(multiplier)
        .and_then(|whole| whole.checked_add(frac_value * multiplier / scale))
        .ok_or(AnomalyReason::OutOfRange)
}

/// Parse a runtime such as `2h 14m`, `134 min`, `PT2H14M` or `134`
pub fn parse_duration_minutes(raw: &str) -> Result<u32, AnomalyReason> {
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return Err(AnomalyReason::Unparseable);
    }

    let minutes = if let Ok(bare) = text.parse::<u64>() {
        bare
    } else {
        let captures = ISO_DURATION
            .captures(&text)
            .or_else(|| HUMAN_DURATION.captures(&text))
            .ok_or(AnomalyReason::Unparseable)?;

        let hours = captures.name("h");
        let mins = captures.name("m");
        if hours.is_none() && mins.is_none() {
            return Err(AnomalyReason::Unparseable);
        }

        let hours: u64 = hours
            .map(|h| h.as_str().parse())
            .transpose()
            .map_err(|_| AnomalyReason::OutOfRange)?
            .unwrap_or(0);
        let mins: u64 = mins
            .map(|m| m.as_str().parse())
            .transpose()
            .map_err(|_| AnomalyReason::OutOfRange)?
            .unwrap_or(0);

        hours
            .checked_mul(60)
            .and_then(|h| h.checked_add(mins))
            .ok_or(AnomalyReason::OutOfRange)?
    };

    if minutes == 0 {
        return Err(AnomalyReason::NonPositive);
    }
    u32::try_from(minutes).map_err(|_| AnomalyReason::OutOfRange)
}
