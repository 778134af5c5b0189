//! Browser session capability
//!
//! Navigation and extraction code is written against [`PageSession`] and
//! [`SessionLauncher`]. The production implementation drives Chrome through
//! chromiumoxide; the replay implementation serves canned pages for tests.
//!
//! A session is not thread-safe: every call takes `&mut self`, so one
//! session is driven by exactly one logical thread of control.

pub mod chromium;
pub mod replay;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::warn;

use crate::config::ScrapeConfig;
use crate::error::ScrapeResult;
use crate::locator::FieldSource;

pub use chromium::{ChromiumLauncher, ChromiumSession};
pub use replay::{CannedPage, PageScript, ReplayLauncher, ReplayProbe, ReplaySession, ReplaySite};

/// One open browser tab
#[async_trait]
pub trait PageSession: Send {
    /// Handle to a located element; only valid until the next DOM mutation
    type Element: Send + Sync;

    /// Load `url` and wait for the navigation to complete
    async fn navigate(&mut self, url: &str) -> ScrapeResult<()>;

    /// Elements currently matching `selector`, in document order
    async fn find_all(&mut self, selector: &str) -> ScrapeResult<Vec<Self::Element>>;

    /// Whether the element is attached and rendered, not merely present
    async fn is_interactable(&mut self, element: &Self::Element) -> ScrapeResult<bool>;

    /// Raw text or attribute value
    ///
    /// `Ok(None)` when the attribute does not exist. Fails with
    /// `StaleElement` when the DOM changed since the element was located.
    async fn read(
        &mut self,
        element: &Self::Element,
        source: &FieldSource,
    ) -> ScrapeResult<Option<String>>;

    /// Release the browser; calling it again is a no-op
    async fn close(&mut self) -> ScrapeResult<()>;
}

/// Opens isolated sessions
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: PageSession + 'static;

    /// Fails with `Environment` when no compatible browser runtime exists
    async fn open(&self, config: &ScrapeConfig) -> ScrapeResult<Self::Session>;
}

/// Run `f` against a freshly opened session and close it afterwards
///
/// The session is closed whether `f` succeeds or fails. If the returned
/// future is dropped before completion, the session's `Drop` releases it.
pub async fn with_session<L, T, F>(launcher: &L, config: &ScrapeConfig, f: F) -> ScrapeResult<T>
where
    L: SessionLauncher,
    F: for<'s> FnOnce(&'s mut L::Session) -> BoxFuture<'s, ScrapeResult<T>>,
{
    let mut session = launcher.open(config).await?;
    let result = f(&mut session).await;
    if let Err(e) = session.close().await {
        warn!("Failed to close session cleanly: {e}");
    }
    result
}
