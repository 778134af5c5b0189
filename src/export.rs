//! Storage-boundary helpers
//!
//! One row per title, ids unique, absent numbers left empty (CSV) or null
//! (JSON Lines).

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::model::Title;

pub const CSV_HEADER: [&str; 7] = [
    "id",
    "name",
    "genres",
    "rating",
    "vote_count",
    "duration_minutes",
    "source_url",
];

/// Titles with a given id kept once, first occurrence wins
fn unique_by_id(titles: &[Title]) -> Vec<&Title> {
    let mut seen = HashSet::new();
    titles
        .iter()
        .filter(|title| {
            let fresh = seen.insert(title.id());
            if !fresh {
                warn!("Dropping duplicate title {} on export", title.id());
            }
            fresh
        })
        .collect()
}

/// Write titles as JSON Lines; returns the number of lines written
pub async fn write_json_lines(path: &Path, titles: &[Title]) -> Result<usize> {
    let unique = unique_by_id(titles);
    let mut out = String::new();
    for title in &unique {
        out.push_str(&serde_json::to_string(title).context("Failed to serialize title")?);
        out.push('\n');
    }

    tokio::fs::write(path, out)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {} titles to {}", unique.len(), path.display());
    Ok(unique.len())
}

/// Read titles written by [`write_json_lines`]; blank lines are ignored
pub async fn read_json_lines(path: &Path) -> Result<Vec<Title>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid title record", path.display(), index + 1))
        })
        .collect()
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn push_cell(out: &mut String, cell: &str) {
    if needs_quotes(cell) {
        out.push('"');
        out.push_str(&cell.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(cell);
    }
}

fn push_row<'a>(out: &mut String, cells: impl IntoIterator<Item = &'a str>) {
    for (index, cell) in cells.into_iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        push_cell(out, cell);
    }
    out.push_str("\r\n");
}

/// Render titles as CSV with a header row
///
/// Genres are joined with `|`.
#[must_use]
pub fn to_csv(titles: &[Title]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER);

    for title in unique_by_id(titles) {
        let genres = title
            .genres()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("|");
        let rating = title.rating().map(|r| r.to_string()).unwrap_or_default();
        let votes = title.vote_count().map(|v| v.to_string()).unwrap_or_default();
        let minutes = title
            .duration_minutes()
            .map(|m| m.to_string())
            .unwrap_or_default();

        push_row(
            &mut out,
            [
                title.id(),
                title.name(),
                genres.as_str(),
                rating.as_str(),
                votes.as_str(),
                minutes.as_str(),
                title.source_url(),
            ],
        );
    }
    out
}

/// Write [`to_csv`] output to `path`
pub async fn write_csv(path: &Path, titles: &[Title]) -> Result<()> {
    tokio::fs::write(path, to_csv(titles))
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
