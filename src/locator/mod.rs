//! Element location and field reads on a rendered page
//!
//! Every wait is a bounded polling loop on a success predicate (element
//! present and interactable). There are no fixed sleeps.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::error::{ScrapeError, ScrapeResult};
use crate::session::PageSession;

/// Polling policy for a single locate call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

/// What to read from a located element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldSource {
    /// Rendered text content
    Text,
    /// Value of the named attribute
    Attribute(String),
}

/// A named field on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub selector: String,
    pub source: FieldSource,
}

impl FieldSpec {
    pub fn text(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            source: FieldSource::Text,
        }
    }

    pub fn attribute(
        name: impl Into<String>,
        selector: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            source: FieldSource::Attribute(attribute.into()),
        }
    }
}

/// First element matching `selector` that is interactable right now
async fn first_interactable<S: PageSession>(
    session: &mut S,
    selector: &str,
) -> ScrapeResult<Option<S::Element>> {
    for element in session.find_all(selector).await? {
        match session.is_interactable(&element).await {
            Ok(true) => return Ok(Some(element)),
            Ok(false) => {}
            Err(e) if e.is_fatal() => return Err(e),
            // Detached between find and check; try the next match
            Err(_) => {}
        }
    }
    Ok(None)
}

/// Sleep one poll interval, never past the deadline
async fn pause(options: &LocateOptions, deadline: Instant) {
    let remaining = deadline.saturating_duration_since(Instant::now());
    sleep(options.poll_interval.min(remaining)).await;
}

/// Wait until an element matching `selector` is present and interactable
///
/// # Errors
///
/// `NotFound` when the timeout elapses first; fatal session errors as-is.
pub async fn locate<S: PageSession>(
    session: &mut S,
    selector: &str,
    options: &LocateOptions,
) -> ScrapeResult<S::Element> {
    let deadline = Instant::now() + options.timeout;
    let mut polls = 0u32;

    loop {
        polls += 1;
        if let Some(element) = first_interactable(session, selector).await? {
            trace!("Located '{selector}' after {polls} poll(s)");
            return Ok(element);
        }
        if Instant::now() >= deadline {
            debug!("'{selector}' not found after {polls} poll(s)");
            return Err(ScrapeError::NotFound {
                selector: selector.to_string(),
                timeout: options.timeout,
            });
        }
        pause(options, deadline).await;
    }
}

/// Wait for whichever of `selectors` appears first
///
/// Returns the index of the matching selector with its element. Selectors
/// are checked in order on every poll, so the earlier one wins a tie.
pub async fn locate_first_of<S: PageSession>(
    session: &mut S,
    selectors: &[&str],
    options: &LocateOptions,
) -> ScrapeResult<(usize, S::Element)> {
    let deadline = Instant::now() + options.timeout;

    loop {
        for (index, selector) in selectors.iter().enumerate() {
            if let Some(element) = first_interactable(session, selector).await? {
                return Ok((index, element));
            }
        }
        if Instant::now() >= deadline {
            return Err(ScrapeError::NotFound {
                selector: selectors.join(" | "),
                timeout: options.timeout,
            });
        }
        pause(options, deadline).await;
    }
}

/// Read a field from a located element
///
/// Values are trimmed; an empty value or a missing attribute is absent, not
/// an error.
pub async fn read_field<S: PageSession>(
    session: &mut S,
    element: &S::Element,
    spec: &FieldSpec,
) -> ScrapeResult<Option<String>> {
    let raw = session.read(element, &spec.source).await?;
    Ok(raw
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

/// Locate and read a required field
///
/// A stale read re-locates once; a second stale read surfaces. A field that
/// renders empty fails with `MissingField`.
pub async fn locate_and_read<S: PageSession>(
    session: &mut S,
    spec: &FieldSpec,
    options: &LocateOptions,
) -> ScrapeResult<String> {
    let element = locate(session, &spec.selector, options).await?;
    let value = match read_field(session, &element, spec).await {
        Err(ScrapeError::StaleElement { .. }) => {
            debug!("'{}' went stale, re-locating once", spec.name);
            let element = locate(session, &spec.selector, options).await?;
            read_field(session, &element, spec).await?
        }
        other => other?,
    };
    value.ok_or_else(|| ScrapeError::MissingField(spec.name.clone()))
}

/// Read an optional field without waiting
///
/// The page is assumed rendered (a required field was located first). A
/// stale read is retried once.
pub async fn read_present<S: PageSession>(
    session: &mut S,
    spec: &FieldSpec,
) -> ScrapeResult<Option<String>> {
    let mut retried = false;
    loop {
        let Some(element) = first_interactable(session, &spec.selector).await? else {
            return Ok(None);
        };
        match read_field(session, &element, spec).await {
            Err(ScrapeError::StaleElement { .. }) if !retried => {
                debug!("'{}' went stale, re-reading once", spec.name);
                retried = true;
            }
            other => return other,
        }
    }
}

/// Read every present value of a multi-valued field, in document order
pub async fn read_all_present<S: PageSession>(
    session: &mut S,
    spec: &FieldSpec,
) -> ScrapeResult<Vec<String>> {
    match read_all_once(session, spec).await {
        Err(ScrapeError::StaleElement { .. }) => {
            debug!("'{}' went stale, re-reading all once", spec.name);
            read_all_once(session, spec).await
        }
        other => other,
    }
}

async fn read_all_once<S: PageSession>(
    session: &mut S,
    spec: &FieldSpec,
) -> ScrapeResult<Vec<String>> {
    let mut values = Vec::new();
    for element in session.find_all(&spec.selector).await? {
        if !session.is_interactable(&element).await? {
            continue;
        }
        if let Some(value) = read_field(session, &element, spec).await? {
            values.push(value);
        }
    }
    Ok(values)
}

/// Whether an interactable element matching `selector` exists right now
pub async fn is_present<S: PageSession>(session: &mut S, selector: &str) -> ScrapeResult<bool> {
    Ok(first_interactable(session, selector).await?.is_some())
}

/// What a settle loop observes on each poll
#[derive(Debug, Clone, Copy)]
enum Observe {
    /// Number of elements matching the selector
    Count,
    /// 1 when an interactable match exists, else 0
    Presence,
}

async fn observe<S: PageSession>(
    session: &mut S,
    selector: &str,
    what: Observe,
) -> ScrapeResult<usize> {
    match what {
        Observe::Count => Ok(session.find_all(selector).await?.len()),
        Observe::Presence => Ok(usize::from(
            first_interactable(session, selector).await?.is_some(),
        )),
    }
}

/// Poll until two consecutive observations agree or the timeout elapses
///
/// Returns the last observation; at the deadline that may still be moving.
async fn settle<S: PageSession>(
    session: &mut S,
    selector: &str,
    what: Observe,
    options: &LocateOptions,
) -> ScrapeResult<usize> {
    let deadline = Instant::now() + options.timeout;
    let mut last = observe(session, selector, what).await?;
    let mut polls = 1u32;

    loop {
        if Instant::now() >= deadline {
            debug!("'{selector}' still changing after {polls} poll(s), using {last}");
            return Ok(last);
        }
        pause(options, deadline).await;
        let current = observe(session, selector, what).await?;
        polls += 1;
        if current == last {
            trace!("'{selector}' settled at {current} after {polls} poll(s)");
            return Ok(current);
        }
        last = current;
    }
}

/// Number of elements matching `selector` once the count stops changing
///
/// Lists hydrated by script can grow between polls; a single snapshot may
/// catch them half rendered.
pub async fn settled_count<S: PageSession>(
    session: &mut S,
    selector: &str,
    options: &LocateOptions,
) -> ScrapeResult<usize> {
    settle(session, selector, Observe::Count, options).await
}

/// Whether an interactable `selector` exists once its presence stops changing
pub async fn settled_presence<S: PageSession>(
    session: &mut S,
    selector: &str,
    options: &LocateOptions,
) -> ScrapeResult<bool> {
    Ok(settle(session, selector, Observe::Presence, options).await? > 0)
}
