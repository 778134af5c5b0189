//! Site profile: where the fields of a title live on the target site

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ScrapeError, ScrapeResult};
use crate::locator::FieldSpec;
use crate::navigation::PageCursor;

/// URL templates and field selectors for one listing site
///
/// The search template accepts three placeholders: `{query}` (URL-encoded),
/// `{start}` (1-based offset of the first result on the page) and `{page}`
/// (1-based page number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub base_url: String,
    pub search_url_template: String,
    /// Links to detail pages on a search results page
    pub result_link: FieldSpec,
    /// Marker present on a results page when a further page exists
    pub next_page: Option<String>,
    /// Marker shown when a search matched nothing
    pub no_results: Option<String>,
    pub name: FieldSpec,
    pub genres: FieldSpec,
    pub rating: FieldSpec,
    pub vote_count: FieldSpec,
    pub duration: FieldSpec,
}

impl SiteProfile {
    /// IMDb title search and title pages
    #[must_use]
    pub fn imdb() -> Self {
        Self {
            base_url: "https://www.imdb.com".to_string(),
            search_url_template:
                "https://www.imdb.com/search/title/?title_type=feature&title={query}&start={start}"
                    .to_string(),
            result_link: FieldSpec::attribute(
                "link",
                "li.ipc-metadata-list-summary-item a.ipc-title-link-wrapper",
                "href",
            ),
            next_page: Some("button.ipc-see-more__button".to_string()),
            no_results: Some("div.ipc-message--no-results".to_string()),
            name: FieldSpec::text(
                "name",
                r#"h1[data-testid="hero__pageTitle"] span.hero__primary-text"#,
            ),
            genres: FieldSpec::text(
                "genres",
                r#"div[data-testid="interests"] a.ipc-chip span.ipc-chip__text"#,
            ),
            rating: FieldSpec::text(
                "rating",
                r#"div[data-testid="hero-rating-bar__aggregate-rating__score"] > span:first-child"#,
            ),
            vote_count: FieldSpec::text(
                "vote_count",
                r#"div[data-testid="hero-rating-bar__aggregate-rating__score"] + div + div"#,
            ),
            duration: FieldSpec::text(
                "duration",
                r#"ul[data-testid="hero-title-block__metadata"] > li:last-child"#,
            ),
        }
    }

    /// Parsed base URL that result links are resolved against
    pub fn base(&self) -> ScrapeResult<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| ScrapeError::Config(format!("invalid base_url '{}': {e}", self.base_url)))
    }

    /// Build the search URL for `query` at `cursor`
    #[must_use]
    pub fn search_url(&self, query: &str, cursor: &PageCursor) -> String {
        self.search_url_template
            .replace("{query}", &urlencoding::encode(query.trim()))
            .replace("{start}", &cursor.start_offset().to_string())
            .replace("{page}", &cursor.page_number().to_string())
    }

    /// Every CSS selector in the profile, labelled for error messages
    pub(crate) fn selectors(&self) -> Vec<(&str, &str)> {
        let mut selectors: Vec<(&str, &str)> = [
            &self.result_link,
            &self.name,
            &self.genres,
            &self.rating,
            &self.vote_count,
            &self.duration,
        ]
        .into_iter()
        .map(|spec| (spec.name.as_str(), spec.selector.as_str()))
        .collect();

        if let Some(ref marker) = self.next_page {
            selectors.push(("next_page", marker));
        }
        if let Some(ref marker) = self.no_results {
            selectors.push(("no_results", marker));
        }
        selectors
    }
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::imdb()
    }
}
