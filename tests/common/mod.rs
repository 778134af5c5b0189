//! Test utilities and fixture builders for the cinescrape test suite

use cinescrape::session::{CannedPage, PageScript, ReplaySite};
use cinescrape::{FieldSpec, PageCursor, RawTitle, ScrapeConfig, SiteProfile, Title, normalize};

pub const BASE: &str = "http://movies.test";

/// Site profile matching the HTML produced by this module
#[allow(dead_code)]
pub fn test_site_profile() -> SiteProfile {
    SiteProfile {
        base_url: BASE.to_string(),
        search_url_template: format!("{BASE}/search?q={{query}}&start={{start}}"),
        result_link: FieldSpec::attribute("link", "ul.results li a.title-link", "href"),
        next_page: Some("a.next-page".to_string()),
        no_results: Some("p.no-results".to_string()),
        name: FieldSpec::text("name", "h1.title-name"),
        genres: FieldSpec::text("genres", "ul.genres li"),
        rating: FieldSpec::text("rating", "span.rating"),
        vote_count: FieldSpec::text("vote_count", "span.votes"),
        duration: FieldSpec::text("duration", "span.runtime"),
    }
}

/// Short locate timeouts; backoff keeps its 1s/2s/4s schedule
#[allow(dead_code)]
pub fn fast_config(page_size: usize) -> ScrapeConfig {
    ScrapeConfig::builder()
        .site(test_site_profile())
        .page_size(page_size)
        .locate_timeout_ms(500)
        .poll_interval_ms(50)
        .build()
        .expect("test config is valid")
}

#[allow(dead_code)]
pub fn search_page_url(query: &str, page_number: usize, page_size: usize) -> String {
    let mut cursor = PageCursor::first(page_size);
    for _ in 1..page_number {
        cursor = cursor.advance();
    }
    test_site_profile().search_url(query, &cursor)
}

#[allow(dead_code)]
pub fn detail_url(id: &str) -> String {
    format!("{BASE}/title/{id}")
}

/// A search results page linking to `ids`, with tracking parameters on every link
#[allow(dead_code)]
pub fn results_html(ids: &[&str], has_next: bool) -> String {
    let items: String = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            format!(
                r#"<li><a class="title-link" href="/title/{id}/?ref_=sr_t_{}">{}. Movie {id}</a></li>"#,
                i + 1,
                i + 1
            )
        })
        .collect();
    let next = if has_next {
        r##"<a class="next-page" href="#">50 more</a>"##
    } else {
        ""
    };
    format!(
        r#"<!DOCTYPE html><html><body><ul class="results">{items}</ul>{next}</body></html>"#
    )
}

#[allow(dead_code)]
pub fn no_results_html() -> String {
    r#"<!DOCTYPE html><html><body><p class="no-results">No results found.</p></body></html>"#
        .to_string()
}

/// Detail page content; `None` fields are left out of the page entirely
#[derive(Debug, Clone)]
pub struct MovieFixture {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub ratings: Vec<String>,
    pub votes: Option<String>,
    pub runtime: Option<String>,
}

#[allow(dead_code)]
impl MovieFixture {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Movie {id}"),
            genres: vec!["Drama".to_string()],
            ratings: vec!["7.1".to_string()],
            votes: Some("12,345".to_string()),
            runtime: Some("1h 52m".to_string()),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn genres(mut self, genres: &[&str]) -> Self {
        self.genres = genres.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn ratings(mut self, ratings: &[&str]) -> Self {
        self.ratings = ratings.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn without_rating(self) -> Self {
        self.ratings(&[])
    }

    pub fn votes(mut self, votes: Option<&str>) -> Self {
        self.votes = votes.map(str::to_string);
        self
    }

    pub fn runtime(mut self, runtime: Option<&str>) -> Self {
        self.runtime = runtime.map(str::to_string);
        self
    }

    pub fn html(&self) -> String {
        let genres: String = self
            .genres
            .iter()
            .map(|g| format!("<li>{g}</li>"))
            .collect();
        let ratings: String = self
            .ratings
            .iter()
            .map(|r| format!(r#"<span class="rating">{r}</span>"#))
            .collect();
        let votes = self
            .votes
            .as_ref()
            .map(|v| format!(r#"<span class="votes">{v}</span>"#))
            .unwrap_or_default();
        let runtime = self
            .runtime
            .as_ref()
            .map(|r| format!(r#"<span class="runtime">{r}</span>"#))
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html><html><body>
<h1 class="title-name">{}</h1>
<ul class="genres">{genres}</ul>
<div class="ratings">{ratings}{votes}</div>
{runtime}
</body></html>"#,
            self.name
        )
    }

    pub fn page(&self) -> CannedPage {
        CannedPage::new(self.html())
    }
}

/// Generated ids `tt0000001`, `tt0000002`, ...
#[allow(dead_code)]
pub fn movie_ids(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("tt{n:07}")).collect()
}

/// A site with `total` results for `query`, split into pages of `page_size`
#[allow(dead_code)]
pub fn catalog_site(query: &str, total: usize, page_size: usize) -> ReplaySite {
    catalog_site_with_search_script(query, total, page_size, PageScript::default())
}

/// Like [`catalog_site`], with `script` applied to every results page
#[allow(dead_code)]
pub fn catalog_site_with_search_script(
    query: &str,
    total: usize,
    page_size: usize,
    script: PageScript,
) -> ReplaySite {
    let ids = movie_ids(total);
    let mut site = ReplaySite::new();

    let pages: Vec<&[String]> = ids.chunks(page_size).collect();
    for (index, chunk) in pages.iter().enumerate() {
        let refs: Vec<&str> = chunk.iter().map(String::as_str).collect();
        let has_next = index + 1 < pages.len();
        site.insert(
            search_page_url(query, index + 1, page_size),
            CannedPage::new(results_html(&refs, has_next)).with_script(script.clone()),
        );
    }
    for id in &ids {
        site.insert(detail_url(id), MovieFixture::new(id).page());
    }
    site
}

/// One results page plus detail pages for `movies`
#[allow(dead_code)]
pub fn single_page_site(query: &str, page_size: usize, movies: &[MovieFixture]) -> ReplaySite {
    let ids: Vec<&str> = movies.iter().map(|m| m.id.as_str()).collect();
    let mut site = ReplaySite::new().page(
        search_page_url(query, 1, page_size),
        CannedPage::new(results_html(&ids, false)),
    );
    for movie in movies {
        site.insert(detail_url(&movie.id), movie.page());
    }
    site
}

#[allow(dead_code)]
pub fn scripted(movie: &MovieFixture, script: PageScript) -> CannedPage {
    movie.page().with_script(script)
}

/// Build a `Title` through the normalizer
#[allow(dead_code)]
pub fn title(
    id: &str,
    genres: &[&str],
    rating: Option<&str>,
    votes: Option<&str>,
    duration: Option<&str>,
) -> Title {
    normalize(RawTitle {
        source_url: detail_url(id),
        id: id.to_string(),
        name: Some(format!("Movie {id}")),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        ratings: rating.into_iter().map(str::to_string).collect(),
        vote_count: votes.map(str::to_string),
        duration: duration.map(str::to_string),
    })
    .expect("fixture title normalizes")
    .title
}
