//! Getter methods for `ScrapeConfig`

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::site::SiteProfile;
use super::types::ScrapeConfig;
use crate::locator::LocateOptions;
use crate::pipeline::RetryPolicy;

impl ScrapeConfig {
    #[must_use]
    pub fn site(&self) -> &SiteProfile {
        &self.site
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Timeout for a single CDP request
    #[must_use]
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    /// Timeout for a full page load
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    #[must_use]
    pub fn locate_timeout(&self) -> Duration {
        Duration::from_millis(self.locate_timeout_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    #[must_use]
    pub fn backoff_jitter(&self) -> Duration {
        Duration::from_millis(self.backoff_jitter_ms)
    }

    /// Directory under which per-session Chrome profiles are created
    #[must_use]
    pub fn chrome_data_dir(&self) -> PathBuf {
        self.chrome_data_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    #[must_use]
    pub fn chromium_path(&self) -> Option<&Path> {
        self.chromium_path.as_deref()
    }

    #[must_use]
    pub fn allow_browser_download(&self) -> bool {
        self.allow_browser_download
    }

    /// Locator wait policy derived from the configured timeouts
    #[must_use]
    pub fn locate_options(&self) -> LocateOptions {
        LocateOptions {
            timeout: self.locate_timeout(),
            poll_interval: self.poll_interval(),
        }
    }

    /// Per-target retry policy
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.backoff_base(),
            jitter: self.backoff_jitter(),
        }
    }
}
