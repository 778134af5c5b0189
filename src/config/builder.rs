//! Fluent builder for `ScrapeConfig`
//!
//! Every setter is available in any order; `build()` validates the whole
//! configuration at once so an invalid selector or timeout is reported before
//! a browser is ever launched.

use scraper::Selector;
use std::path::PathBuf;

use super::site::SiteProfile;
use super::types::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::utils::is_valid_url;

/// Builder for [`ScrapeConfig`]
#[derive(Debug, Clone, Default)]
pub struct ScrapeConfigBuilder {
    config: ScrapeConfig,
}

impl ScrapeConfig {
    /// Create a builder for configuring a `ScrapeConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ScrapeConfigBuilder {
        ScrapeConfigBuilder::default()
    }

    /// Load a configuration from JSON; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns `ScrapeError::Config` if the JSON is malformed or the resulting
    /// configuration fails validation.
    pub fn from_json_str(json: &str) -> ScrapeResult<Self> {
        let config: ScrapeConfig = serde_json::from_str(json)
            .map_err(|e| ScrapeError::Config(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value the pipeline relies on
    pub fn validate(&self) -> ScrapeResult<()> {
        if self.page_size == 0 {
            return Err(config_error("page_size must be at least 1"));
        }
        if self.locate_timeout_ms == 0 {
            return Err(config_error("locate_timeout_ms must be greater than 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(config_error("poll_interval_ms must be greater than 0"));
        }
        if self.poll_interval_ms > self.locate_timeout_ms {
            return Err(config_error(format!(
                "poll_interval_ms ({}) exceeds locate_timeout_ms ({})",
                self.poll_interval_ms, self.locate_timeout_ms
            )));
        }
        if self.navigation_timeout_secs == 0 || self.render_timeout_secs == 0 {
            return Err(config_error(
                "navigation_timeout_secs and render_timeout_secs must be greater than 0",
            ));
        }
        validate_site(&self.site)
    }
}

fn validate_site(site: &SiteProfile) -> ScrapeResult<()> {
    site.base()?;
    if !is_valid_url(&site.base_url) {
        return Err(config_error(format!(
            "base_url '{}' must be an http(s) URL",
            site.base_url
        )));
    }

    if !site.search_url_template.contains("{query}") {
        return Err(config_error(format!(
            "search_url_template '{}' has no {{query}} placeholder",
            site.search_url_template
        )));
    }

    for (field, selector) in site.selectors() {
        Selector::parse(selector).map_err(|e| {
            config_error(format!("selector for '{field}' is not valid CSS ('{selector}'): {e}"))
        })?;
    }
    Ok(())
}

fn config_error(message: impl Into<String>) -> ScrapeError {
    ScrapeError::Config(message.into())
}

impl ScrapeConfigBuilder {
    #[must_use]
    pub fn site(mut self, site: SiteProfile) -> Self {
        self.config.site = site;
        self
    }

    /// Set browser headless mode
    ///
    /// Headed mode needs a display server and is meant for debugging
    /// selectors against the live site.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    #[must_use]
    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.config.window_size = (width, height);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.config.navigation_timeout_secs = secs;
        self
    }

    /// Set the per-call locate timeout
    ///
    /// This bounds each wait for an element; it is not a run deadline.
    #[must_use]
    pub fn locate_timeout_ms(mut self, ms: u64) -> Self {
        self.config.locate_timeout_ms = ms;
        self
    }

    #[must_use]
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size;
        self
    }

    /// Set maximum retry attempts for transient failures
    ///
    /// A target is tried once plus this many retries, with exponential
    /// backoff between attempts. Set to 0 to skip a target on its first
    /// failure.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    #[must_use]
    pub fn backoff_base_ms(mut self, ms: u64) -> Self {
        self.config.backoff_base_ms = ms;
        self
    }

    #[must_use]
    pub fn backoff_jitter_ms(mut self, ms: u64) -> Self {
        self.config.backoff_jitter_ms = ms;
        self
    }

    /// Parent directory for the per-session Chrome profile directories
    #[must_use]
    pub fn chrome_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.chrome_data_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chromium_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn allow_browser_download(mut self, allow: bool) -> Self {
        self.config.allow_browser_download = allow;
        self
    }

    /// Validate and produce the configuration
    ///
    /// # Errors
    ///
    /// Returns `ScrapeError::Config` describing the first invalid value.
    pub fn build(self) -> ScrapeResult<ScrapeConfig> {
        // Enforce headless mode in release builds
        #[cfg(not(debug_assertions))]
        let config = {
            let mut config = self.config;
            if !config.headless {
                tracing::warn!(
                    "Forcing headless mode in release build. \
                    Headed mode is only available in debug builds for development."
                );
                config.headless = true;
            }
            config
        };

        #[cfg(debug_assertions)]
        let config = self.config;

        config.validate()?;
        Ok(config)
    }
}
