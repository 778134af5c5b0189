//! Replay session: canned HTML pages behind the [`PageSession`] seam
//!
//! Pages are keyed by exact URL and evaluated with real CSS selectors via
//! `scraper`. A [`PageScript`] injects the faults a live site produces:
//! pages that never render, late renders, lists and controls that hydrate
//! after the first match, DOM mutations between locate and read, failed
//! loads and browser crashes.

use async_trait::async_trait;
use parking_lot::Mutex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{PageSession, SessionLauncher};
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::locator::FieldSource;

/// Fault script for one canned page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageScript {
    /// The first N visits render an empty document
    pub blank_visits: u32,
    /// After every visit, the first N element queries find nothing
    pub render_after_polls: u32,
    /// After every visit, the first N element queries see at most one match
    pub partial_polls: u32,
    /// After every visit, the first N queries for a given selector find nothing
    pub late_elements: Vec<(String, u32)>,
    /// The first N reads on this page hit a DOM mutation
    pub stale_reads: u32,
    /// The first N visits fail to load
    pub failed_loads: u32,
    /// The browser dies on this (1-based) visit
    pub crash_on_visit: Option<u32>,
}

impl PageScript {
    #[must_use]
    pub fn blank_visits(mut self, visits: u32) -> Self {
        self.blank_visits = visits;
        self
    }

    #[must_use]
    pub fn render_after_polls(mut self, polls: u32) -> Self {
        self.render_after_polls = polls;
        self
    }

    #[must_use]
    pub fn partial_polls(mut self, polls: u32) -> Self {
        self.partial_polls = polls;
        self
    }

    /// `selector` (matched by exact string) renders `polls` queries late
    #[must_use]
    pub fn late_element(mut self, selector: impl Into<String>, polls: u32) -> Self {
        self.late_elements.push((selector.into(), polls));
        self
    }

    #[must_use]
    pub fn stale_reads(mut self, reads: u32) -> Self {
        self.stale_reads = reads;
        self
    }

    #[must_use]
    pub fn failed_loads(mut self, loads: u32) -> Self {
        self.failed_loads = loads;
        self
    }

    #[must_use]
    pub fn crash_on_visit(mut self, visit: u32) -> Self {
        self.crash_on_visit = Some(visit);
        self
    }
}

/// A page served by the replay session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedPage {
    pub html: String,
    pub script: PageScript,
}

impl CannedPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            script: PageScript::default(),
        }
    }

    #[must_use]
    pub fn with_script(mut self, script: PageScript) -> Self {
        self.script = script;
        self
    }
}

/// Canned pages keyed by URL
#[derive(Debug, Clone, Default)]
pub struct ReplaySite {
    pages: HashMap<String, CannedPage>,
}

impl ReplaySite {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn page(mut self, url: impl Into<String>, page: CannedPage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, page: CannedPage) {
        self.pages.insert(url.into(), page);
    }

    fn get(&self, url: &str) -> Option<&CannedPage> {
        self.pages.get(url)
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    opened: usize,
    closed: usize,
    released_on_drop: usize,
    navigations: Vec<String>,
    visits: HashMap<String, u32>,
    stale_reads_left: HashMap<String, u32>,
}

/// Shared view of what replay sessions did, for assertions in tests
#[derive(Debug, Clone, Default)]
pub struct ReplayProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl ReplayProbe {
    #[must_use]
    pub fn opened(&self) -> usize {
        self.state.lock().opened
    }

    /// Sessions released through an explicit `close()`
    #[must_use]
    pub fn closed(&self) -> usize {
        self.state.lock().closed
    }

    /// Sessions released only by being dropped
    #[must_use]
    pub fn released_on_drop(&self) -> usize {
        self.state.lock().released_on_drop
    }

    /// Sessions opened and not yet released by any path
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        let state = self.state.lock();
        state.opened - state.closed - state.released_on_drop
    }

    /// Every URL navigated to, in order, across all sessions
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    #[must_use]
    pub fn visits(&self, url: &str) -> u32 {
        self.state.lock().visits.get(url).copied().unwrap_or(0)
    }

    fn record_visit(&self, url: &str) -> u32 {
        let mut state = self.state.lock();
        state.navigations.push(url.to_string());
        let visits = state.visits.entry(url.to_string()).or_insert(0);
        *visits += 1;
        *visits
    }

    /// Consume one scripted stale read for `url`, if any are left
    fn take_stale_read(&self, url: &str, scripted: u32) -> bool {
        let mut state = self.state.lock();
        let left = state
            .stale_reads_left
            .entry(url.to_string())
            .or_insert(scripted);
        if *left > 0 {
            *left -= 1;
            true
        } else {
            false
        }
    }
}

/// Launcher for replay sessions
#[derive(Debug, Clone)]
pub struct ReplayLauncher {
    site: Arc<ReplaySite>,
    probe: ReplayProbe,
    available: bool,
}

impl ReplayLauncher {
    #[must_use]
    pub fn new(site: ReplaySite) -> Self {
        Self {
            site: Arc::new(site),
            probe: ReplayProbe::default(),
            available: true,
        }
    }

    /// A launcher whose browser runtime is missing
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(ReplaySite::default())
        }
    }

    #[must_use]
    pub fn probe(&self) -> ReplayProbe {
        self.probe.clone()
    }
}

#[async_trait]
impl SessionLauncher for ReplayLauncher {
    type Session = ReplaySession;

    async fn open(&self, _config: &ScrapeConfig) -> ScrapeResult<ReplaySession> {
        if !self.available {
            return Err(ScrapeError::Environment(
                "replay browser runtime unavailable".to_string(),
            ));
        }
        self.probe.state.lock().opened += 1;
        Ok(ReplaySession {
            site: Arc::clone(&self.site),
            probe: self.probe.clone(),
            current: None,
            generation: 0,
            closed: false,
            crashed: false,
        })
    }
}

/// Handle to a matched element in the current document version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayElement {
    selector: String,
    index: usize,
    generation: u64,
}

#[derive(Debug)]
struct LoadedPage {
    url: String,
    html: String,
    stale_reads: u32,
    blank: bool,
    polls_before_render: u32,
    partial_polls: u32,
    late_elements: HashMap<String, u32>,
}

/// Session serving pages from a [`ReplaySite`]
#[derive(Debug)]
pub struct ReplaySession {
    site: Arc<ReplaySite>,
    probe: ReplayProbe,
    current: Option<LoadedPage>,
    /// Bumped on every navigation and scripted DOM mutation
    generation: u64,
    closed: bool,
    crashed: bool,
}

impl ReplaySession {
    fn ensure_alive(&self) -> ScrapeResult<()> {
        if self.crashed {
            return Err(ScrapeError::FatalExtraction("browser disconnected".to_string()));
        }
        if self.closed {
            return Err(ScrapeError::FatalExtraction("session already closed".to_string()));
        }
        Ok(())
    }

    fn check_generation(&self, element: &ReplayElement) -> ScrapeResult<&LoadedPage> {
        match &self.current {
            Some(page) if element.generation == self.generation => Ok(page),
            _ => Err(ScrapeError::StaleElement {
                selector: element.selector.clone(),
            }),
        }
    }
}

#[async_trait]
impl PageSession for ReplaySession {
    type Element = ReplayElement;

    async fn navigate(&mut self, url: &str) -> ScrapeResult<()> {
        self.ensure_alive()?;
        let visit = self.probe.record_visit(url);

        let Some(page) = self.site.get(url) else {
            self.current = None;
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        };
        let script = &page.script;

        if script.crash_on_visit == Some(visit) {
            debug!("Replay crash scripted on visit {visit} of {url}");
            self.crashed = true;
            self.current = None;
            return Err(ScrapeError::FatalExtraction("browser disconnected".to_string()));
        }
        if visit <= script.failed_loads {
            self.current = None;
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                message: "navigation timed out".to_string(),
            });
        }

        self.generation += 1;
        self.current = Some(LoadedPage {
            url: url.to_string(),
            html: page.html.clone(),
            stale_reads: script.stale_reads,
            blank: visit <= script.blank_visits,
            polls_before_render: script.render_after_polls,
            partial_polls: script.partial_polls,
            late_elements: script.late_elements.iter().cloned().collect(),
        });
        Ok(())
    }

    async fn find_all(&mut self, selector: &str) -> ScrapeResult<Vec<ReplayElement>> {
        self.ensure_alive()?;
        let generation = self.generation;
        let Some(page) = self.current.as_mut() else {
            return Ok(Vec::new());
        };
        if page.blank {
            return Ok(Vec::new());
        }
        if page.polls_before_render > 0 {
            page.polls_before_render -= 1;
            return Ok(Vec::new());
        }

        if let Some(left) = page.late_elements.get_mut(selector)
            && *left > 0
        {
            *left -= 1;
            return Ok(Vec::new());
        }

        let mut count = count_matches(&page.html, selector)?;
        if page.partial_polls > 0 {
            page.partial_polls -= 1;
            count = count.min(1);
        }
        Ok((0..count)
            .map(|index| ReplayElement {
                selector: selector.to_string(),
                index,
                generation,
            })
            .collect())
    }

    async fn is_interactable(&mut self, element: &ReplayElement) -> ScrapeResult<bool> {
        self.ensure_alive()?;
        let page = self.check_generation(element)?;
        is_visible(&page.html, &element.selector, element.index)
    }

    async fn read(
        &mut self,
        element: &ReplayElement,
        source: &FieldSource,
    ) -> ScrapeResult<Option<String>> {
        self.ensure_alive()?;
        let page = self.check_generation(element)?;

        if self.probe.take_stale_read(&page.url, page.stale_reads) {
            // The page re-rendered under us; every handle is now stale
            self.generation += 1;
            return Err(ScrapeError::StaleElement {
                selector: element.selector.clone(),
            });
        }

        read_value(&page.html, &element.selector, element.index, source)
    }

    async fn close(&mut self) -> ScrapeResult<()> {
        if !self.closed {
            self.closed = true;
            self.current = None;
            self.probe.state.lock().closed += 1;
        }
        Ok(())
    }
}

impl Drop for ReplaySession {
    fn drop(&mut self) {
        if !self.closed {
            debug!("Replay session dropped without close");
            self.probe.state.lock().released_on_drop += 1;
        }
    }
}

// `Html` is not `Send`; it is parsed and dropped inside these helpers so it
// never lives across an await point.

fn parse_selector(selector: &str) -> ScrapeResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::Config(format!("invalid selector '{selector}': {e}")))
}

fn count_matches(html: &str, selector: &str) -> ScrapeResult<usize> {
    let selector = parse_selector(selector)?;
    Ok(Html::parse_document(html).select(&selector).count())
}

fn is_visible(html: &str, selector: &str, index: usize) -> ScrapeResult<bool> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let Some(element) = document.select(&parsed).nth(index) else {
        return Ok(false);
    };
    let hidden = std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|el| el.value().attr("hidden").is_some());
    Ok(!hidden)
}

fn read_value(
    html: &str,
    selector: &str,
    index: usize,
    source: &FieldSource,
) -> ScrapeResult<Option<String>> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let Some(element) = document.select(&parsed).nth(index) else {
        return Err(ScrapeError::StaleElement {
            selector: selector.to_string(),
        });
    };
    Ok(match source {
        FieldSource::Text => Some(element.text().collect::<String>()),
        FieldSource::Attribute(name) => element.value().attr(name).map(str::to_string),
    })
}
