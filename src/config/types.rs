//! Core configuration types for title extraction
//!
//! This module contains the main `ScrapeConfig` struct that defines the
//! browser, locator and retry parameters for one extraction run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::site::SiteProfile;
use crate::utils::{
    CHROME_USER_AGENT, DEFAULT_BACKOFF_BASE_MS, DEFAULT_LOCATE_TIMEOUT_MS, DEFAULT_MAX_RETRIES,
    DEFAULT_NAVIGATION_TIMEOUT_SECS, DEFAULT_PAGE_SIZE, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_RENDER_TIMEOUT_SECS, DEFAULT_WINDOW_SIZE,
};

/// Main configuration struct for extraction runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Selectors and URL templates of the target site
    pub(crate) site: SiteProfile,
    pub(crate) headless: bool,
    pub(crate) window_size: (u32, u32),
    pub(crate) user_agent: String,

    /// Timeout in seconds for a single CDP request
    ///
    /// Default: 30 seconds
    pub(crate) render_timeout_secs: u64,

    /// Timeout in seconds for `page.goto()` plus `wait_for_navigation()`
    ///
    /// A page that does not finish loading in time fails with a navigation
    /// error, which the pipeline retries.
    ///
    /// Default: 30 seconds
    pub(crate) navigation_timeout_secs: u64,

    /// Upper bound for one locate call, in milliseconds
    pub(crate) locate_timeout_ms: u64,

    /// Interval between locate polls, in milliseconds
    pub(crate) poll_interval_ms: u64,

    /// Maximum number of result links read from one search page
    pub(crate) page_size: usize,

    /// Retries after the first failed attempt for one target
    ///
    /// Default: 3 (four attempts in total)
    pub(crate) max_retries: u32,

    /// Delay before the first retry; doubled for each further retry
    pub(crate) backoff_base_ms: u64,

    /// Upper bound of the uniform random jitter added to each backoff delay
    pub(crate) backoff_jitter_ms: u64,

    /// Parent directory for per-session Chrome profiles
    /// When unset, the system temp directory is used.
    #[serde(skip)]
    pub(crate) chrome_data_dir: Option<PathBuf>,

    /// Explicit Chrome/Chromium executable
    pub(crate) chromium_path: Option<PathBuf>,

    /// Download a managed Chromium when no local install is found
    pub(crate) allow_browser_download: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            site: SiteProfile::default(),
            headless: true,
            window_size: DEFAULT_WINDOW_SIZE,
            user_agent: CHROME_USER_AGENT.to_string(),
            render_timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
            locate_timeout_ms: DEFAULT_LOCATE_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            page_size: DEFAULT_PAGE_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_jitter_ms: 0,
            chrome_data_dir: None,
            chromium_path: None,
            allow_browser_download: true,
        }
    }
}
