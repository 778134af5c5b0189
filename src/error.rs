//! Error types for title extraction
//!
//! Locator-level failures (`NotFound`, `StaleElement`) are transient and are
//! turned into retry decisions by the pipeline. Session and environment
//! failures are surfaced to the caller.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for extraction operations
pub type ScrapeResult<T> = Result<T, ScrapeError>;

/// Error types for extraction operations
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    /// No compatible browser runtime could be started
    #[error("No compatible browser runtime available: {0}")]
    Environment(String),

    /// Element never became present and interactable before the timeout
    #[error("Element '{selector}' not found within {timeout:?}")]
    NotFound { selector: String, timeout: Duration },

    /// Element was invalidated by a DOM mutation between locate and read
    #[error("Element '{selector}' went stale after a DOM mutation")]
    StaleElement { selector: String },

    /// Page load did not complete
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// Required field rendered but empty (partial render)
    #[error("Required field '{0}' is missing or empty")]
    MissingField(String),

    /// Session-level failure, the browser is gone
    #[error("Browser session failed: {0}")]
    FatalExtraction(String),

    /// Invalid configuration or site profile
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Kind of the last transient failure seen for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    NotFound,
    StaleElement,
    Navigation,
    MissingField,
}

impl ScrapeError {
    /// Check if error is transient and the target should be retried
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.failure_kind().is_some()
    }

    /// Check if error ends the whole run
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScrapeError::Environment(_) | ScrapeError::FatalExtraction(_)
        )
    }

    /// Project a transient error onto its retry-relevant kind
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ScrapeError::NotFound { .. } => Some(FailureKind::NotFound),
            ScrapeError::StaleElement { .. } => Some(FailureKind::StaleElement),
            ScrapeError::Navigation { .. } => Some(FailureKind::Navigation),
            ScrapeError::MissingField(_) => Some(FailureKind::MissingField),
            _ => None,
        }
    }
}
