//! Navigation state machine
//!
//! `SearchResults -> DetailPage -> ... -> SearchResults(next) -> Done`.
//! The controller decides what to visit next; the pipeline performs the
//! visits and owns retry decisions.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use url::Url;

use super::cursor::PageCursor;
use crate::config::SiteProfile;
use crate::error::ScrapeResult;
use crate::locator::{
    LocateOptions, locate_first_of, read_all_present, settled_count, settled_presence,
};
use crate::session::PageSession;
use crate::utils::canonicalize_link;

const LOG_TARGET: &str = "cinescrape::navigation";

/// Why traversal ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopReason {
    /// The source has no further results
    NoMoreResults,
    /// The requested number of titles was emitted
    RecordCapReached,
    /// A search page could not be loaded after every retry
    SearchUnavailable,
    Cancelled,
    DeadlineReached,
    /// The browser session died
    SessionFailed,
}

/// A canonical detail-page link in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailLink {
    pub id: String,
    pub url: String,
    /// 1-based position among all links read in this run
    pub position: usize,
}

/// Current page type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    SearchResults(PageCursor),
    DetailPage(DetailLink),
    Done(StopReason),
}

/// What the pipeline should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavStep {
    /// Load (or reload) the search results page at this cursor
    LoadResults(PageCursor),
    /// Visit a detail page
    Visit(DetailLink),
    Stop(StopReason),
}

/// Drives traversal for one query within one session
#[derive(Debug)]
pub struct NavigationController {
    site: SiteProfile,
    base: Url,
    query: String,
    page_size: usize,
    max_records: usize,
    options: LocateOptions,
    state: NavState,
    pending: VecDeque<DetailLink>,
    seen: HashSet<String>,
    next_cursor: Option<PageCursor>,
    /// Last results page loaded
    current_cursor: PageCursor,
    emitted: usize,
    pages_loaded: usize,
    links_read: usize,
}

impl NavigationController {
    pub fn new(
        site: SiteProfile,
        query: impl Into<String>,
        page_size: usize,
        max_records: usize,
        options: LocateOptions,
    ) -> ScrapeResult<Self> {
        let base = site.base()?;
        let first = PageCursor::first(page_size);
        Ok(Self {
            site,
            base,
            query: query.into(),
            page_size: page_size.max(1),
            max_records,
            options,
            state: NavState::SearchResults(first),
            pending: VecDeque::new(),
            seen: HashSet::new(),
            next_cursor: Some(first),
            current_cursor: first,
            emitted: 0,
            pages_loaded: 0,
            links_read: 0,
        })
    }

    #[must_use]
    pub fn state(&self) -> &NavState {
        &self.state
    }

    /// Search pages successfully loaded so far
    #[must_use]
    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.state, NavState::Done(_))
    }

    /// Decide the next step
    ///
    /// Queued links are visited before the next page is requested, so a
    /// further page is only loaded when the current one is exhausted.
    pub fn next_step(&mut self) -> NavStep {
        if let NavState::Done(reason) = self.state {
            return NavStep::Stop(reason);
        }
        if self.emitted >= self.max_records {
            return NavStep::Stop(self.finish(StopReason::RecordCapReached));
        }
        if let Some(link) = self.pending.pop_front() {
            self.state = NavState::DetailPage(link.clone());
            return NavStep::Visit(link);
        }
        match self.next_cursor {
            Some(cursor) => {
                self.state = NavState::SearchResults(cursor);
                NavStep::LoadResults(cursor)
            }
            None => NavStep::Stop(self.finish(StopReason::NoMoreResults)),
        }
    }

    /// Load the results page at `cursor` and queue its new links
    ///
    /// Returns the number of links queued. On error nothing changes, so the
    /// same cursor can be loaded again.
    pub async fn load_results<S: PageSession>(
        &mut self,
        session: &mut S,
        cursor: PageCursor,
    ) -> ScrapeResult<usize> {
        let url = self.site.search_url(&self.query, &cursor);
        info!(target: LOG_TARGET, "Loading results page {} for '{}': {url}", cursor.page_number(), self.query);
        session.navigate(&url).await?;

        let mut markers = vec![self.site.result_link.selector.as_str()];
        if let Some(ref no_results) = self.site.no_results {
            markers.push(no_results.as_str());
        }
        let (matched, _) = locate_first_of(session, &markers, &self.options).await?;

        let hrefs = if matched == 0 {
            // The first link can render before the rest of the list
            let settled =
                settled_count(session, &self.site.result_link.selector, &self.options).await?;
            debug!(target: LOG_TARGET, "Page {} settled with {settled} link(s)", cursor.page_number());
            read_all_present(session, &self.site.result_link).await?
        } else {
            debug!(target: LOG_TARGET, "No-results marker on page {}", cursor.page_number());
            Vec::new()
        };

        // Only read once the list has settled; the control may hydrate later
        let has_next_marker = match self.site.next_page {
            Some(ref marker) if !hrefs.is_empty() => {
                Some(settled_presence(session, marker, &self.options).await?)
            }
            _ => None,
        };

        self.pages_loaded += 1;
        self.current_cursor = cursor;
        let on_page = hrefs.len().min(self.page_size);
        let queued = self.enqueue(hrefs.into_iter().take(self.page_size));

        self.next_cursor = match has_next_marker {
            _ if on_page == 0 => None,
            Some(true) => Some(cursor.advance()),
            Some(false) => None,
            None if on_page >= self.page_size => Some(cursor.advance()),
            None => None,
        };

        info!(
            target: LOG_TARGET,
            "Page {}: {on_page} link(s), {queued} new, next page: {}",
            cursor.page_number(),
            self.next_cursor.is_some()
        );
        Ok(queued)
    }

    /// Canonicalize, dedupe by id and queue links in source order
    fn enqueue(&mut self, hrefs: impl Iterator<Item = String>) -> usize {
        let mut queued = 0;
        for href in hrefs {
            let Some(link) = canonicalize_link(&self.base, &href) else {
                debug!(target: LOG_TARGET, "Ignoring link that cannot be canonicalized: {href}");
                continue;
            };
            if !self.seen.insert(link.id.clone()) {
                debug!(target: LOG_TARGET, "Skipping duplicate title {}", link.id);
                continue;
            }
            self.links_read += 1;
            self.pending.push_back(DetailLink {
                id: link.id,
                url: link.url,
                position: self.links_read,
            });
            queued += 1;
        }
        queued
    }

    /// Load a detail page
    pub async fn enter_detail<S: PageSession>(
        &mut self,
        session: &mut S,
        link: &DetailLink,
    ) -> ScrapeResult<()> {
        self.state = NavState::DetailPage(link.clone());
        debug!(target: LOG_TARGET, "Visiting #{} {}", link.position, link.url);
        session.navigate(&link.url).await
    }

    /// Return to the results listing after a detail page is finished
    pub fn leave_detail(&mut self) {
        if let NavState::DetailPage(_) = self.state {
            self.state = NavState::SearchResults(self.current_cursor);
        }
    }

    pub fn record_emitted(&mut self) {
        self.emitted += 1;
    }

    /// Enter `Done`; the cursor and queued links are discarded
    pub fn finish(&mut self, reason: StopReason) -> StopReason {
        if let NavState::Done(existing) = self.state {
            return existing;
        }
        if reason == StopReason::SearchUnavailable {
            warn!(target: LOG_TARGET, "Search for '{}' abandoned", self.query);
        }
        info!(
            target: LOG_TARGET,
            "Traversal finished: {reason:?} after {} page(s), {} title(s)",
            self.pages_loaded, self.emitted
        );
        self.pending.clear();
        self.next_cursor = None;
        self.state = NavState::Done(reason);
        reason
    }
}
