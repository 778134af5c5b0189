//! Production session backed by chromiumoxide
//!
//! Each session owns one Chrome process, its handler task and a private
//! profile directory. `close()` shuts them down in order (close, wait for
//! exit, abort handler, remove profile); `Drop` is the fallback for paths
//! that never reach `close()`, such as a dropped future.

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use serde::Deserialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{PageSession, SessionLauncher};
use crate::browser_profile::{BrowserProfile, create_unique_profile};
use crate::browser_setup::launch_browser;
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::locator::FieldSource;

/// True when the element is attached and laid out with a non-empty box
const INTERACTABLE_JS: &str = r"function() {
    if (!this.isConnected) { return false; }
    const rect = this.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
}";

/// How a raw CDP error affects the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFailure {
    /// The node was detached or replaced
    Stale,
    /// The browser or its connection is gone
    Fatal,
    /// Anything else; worth another attempt
    Transient,
}

/// Classify a chromiumoxide error message
#[must_use]
pub fn classify_backend_error(message: &str) -> BackendFailure {
    let error_str = message.to_lowercase();

    if error_str.contains("browser closed")
        || error_str.contains("browser disconnected")
        || error_str.contains("page closed")
        || error_str.contains("target closed")
        || error_str.contains("session not found")
        || error_str.contains("session closed")
        || error_str.contains("no response from the chromium instance")
        || error_str.contains("channel")
        || error_str.contains("websocket")
    {
        return BackendFailure::Fatal;
    }

    if error_str.contains("could not find node")
        || error_str.contains("no node with given id")
        || error_str.contains("node is detached")
        || error_str.contains("cannot find context with specified id")
    {
        return BackendFailure::Stale;
    }

    BackendFailure::Transient
}

/// Launches one Chrome process per session
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher;

impl ChromiumLauncher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    type Session = ChromiumSession;

    async fn open(&self, config: &ScrapeConfig) -> ScrapeResult<ChromiumSession> {
        let profile = create_unique_profile(&config.chrome_data_dir())
            .map_err(|e| ScrapeError::Environment(format!("{e:#}")))?;

        let (browser, handler) = launch_browser(config, profile.path())
            .await
            .map_err(|e| ScrapeError::Environment(format!("{e:#}")))?;

        let mut session = ChromiumSession {
            browser: Some(browser),
            handler: Some(handler),
            page: None,
            profile: Some(profile),
            navigation_timeout: config.navigation_timeout(),
        };

        match session.new_page().await {
            Ok(page) => {
                session.page = Some(page);
                info!("Browser session opened");
                Ok(session)
            }
            Err(e) => {
                let _ = session.close().await;
                Err(ScrapeError::Environment(format!(
                    "browser started but no page could be opened: {e}"
                )))
            }
        }
    }
}

/// Element handle remembering the selector it was located by
pub struct ChromiumElement {
    inner: Element,
    selector: String,
}

#[derive(Debug, Deserialize)]
struct ReadOutcome {
    connected: bool,
    value: Option<String>,
}

/// One Chrome process with a single tab
pub struct ChromiumSession {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    page: Option<Page>,
    profile: Option<BrowserProfile>,
    navigation_timeout: Duration,
}

impl ChromiumSession {
    async fn new_page(&self) -> ScrapeResult<Page> {
        let browser = self.browser.as_ref().ok_or_else(closed_error)?;
        browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::FatalExtraction(e.to_string()))
    }

    fn page(&self) -> ScrapeResult<&Page> {
        self.page.as_ref().ok_or_else(closed_error)
    }

    /// Map a CDP error for an element operation
    fn element_error(selector: &str, message: String) -> ScrapeError {
        match classify_backend_error(&message) {
            BackendFailure::Fatal => ScrapeError::FatalExtraction(message),
            BackendFailure::Stale | BackendFailure::Transient => ScrapeError::StaleElement {
                selector: selector.to_string(),
            },
        }
    }
}

fn closed_error() -> ScrapeError {
    ScrapeError::FatalExtraction("session already closed".to_string())
}

#[async_trait]
impl PageSession for ChromiumSession {
    type Element = ChromiumElement;

    async fn navigate(&mut self, url: &str) -> ScrapeResult<()> {
        let page = self.page()?;
        debug!("Navigating to {url}");

        let load = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(self.navigation_timeout, load).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                let message = e.to_string();
                if classify_backend_error(&message) == BackendFailure::Fatal {
                    Err(ScrapeError::FatalExtraction(message))
                } else {
                    Err(ScrapeError::Navigation {
                        url: url.to_string(),
                        message,
                    })
                }
            }
            Err(_) => Err(ScrapeError::Navigation {
                url: url.to_string(),
                message: format!("timed out after {:?}", self.navigation_timeout),
            }),
        }
    }

    async fn find_all(&mut self, selector: &str) -> ScrapeResult<Vec<ChromiumElement>> {
        let page = self.page()?;
        match page.find_elements(selector).await {
            Ok(elements) => Ok(elements
                .into_iter()
                .map(|inner| ChromiumElement {
                    inner,
                    selector: selector.to_string(),
                })
                .collect()),
            Err(e) => {
                let message = e.to_string();
                if classify_backend_error(&message) == BackendFailure::Fatal {
                    return Err(ScrapeError::FatalExtraction(message));
                }
                // Nothing matched yet, or the document was mid-replacement
                debug!("find_elements('{selector}') failed: {message}");
                Ok(Vec::new())
            }
        }
    }

    async fn is_interactable(&mut self, element: &ChromiumElement) -> ScrapeResult<bool> {
        let returns = element
            .inner
            .call_js_fn(INTERACTABLE_JS, false)
            .await
            .map_err(|e| Self::element_error(&element.selector, e.to_string()))?;

        Ok(returns
            .result
            .value
            .as_ref()
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false))
    }

    async fn read(
        &mut self,
        element: &ChromiumElement,
        source: &FieldSource,
    ) -> ScrapeResult<Option<String>> {
        let accessor = match source {
            FieldSource::Text => "this.innerText".to_string(),
            FieldSource::Attribute(name) => {
                let name = serde_json::to_string(name)
                    .map_err(|e| ScrapeError::Config(format!("attribute name: {e}")))?;
                format!("this.getAttribute({name})")
            }
        };
        let function = format!(
            "function() {{ \
                if (!this.isConnected) {{ return JSON.stringify({{ connected: false, value: null }}); }} \
                return JSON.stringify({{ connected: true, value: {accessor} }}); \
            }}"
        );

        let returns = element
            .inner
            .call_js_fn(function, false)
            .await
            .map_err(|e| Self::element_error(&element.selector, e.to_string()))?;

        let json = returns
            .result
            .value
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ScrapeError::StaleElement {
                selector: element.selector.clone(),
            })?;
        let outcome: ReadOutcome =
            serde_json::from_str(json).map_err(|_| ScrapeError::StaleElement {
                selector: element.selector.clone(),
            })?;

        if !outcome.connected {
            return Err(ScrapeError::StaleElement {
                selector: element.selector.clone(),
            });
        }
        Ok(outcome.value)
    }

    async fn close(&mut self) -> ScrapeResult<()> {
        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            debug!("Failed to close page: {e}");
        }

        if let Some(mut browser) = self.browser.take() {
            debug!("Closing browser");
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {e}");
            }
            // Wait for the process to exit before removing its profile
            if let Err(e) = browser.wait().await {
                warn!("Failed to wait for browser exit: {e}");
            }
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }

        // Dropping the profile removes the directory
        self.profile.take();
        info!("Browser session closed");
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            warn!("ChromiumSession dropped without close - aborting handler task");
            handler.abort();
        }
        // Browser::drop kills the Chrome process; the profile is removed after it
        self.page.take();
        self.browser.take();
        self.profile.take();
    }
}
