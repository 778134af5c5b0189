//! Shared configuration constants for cinescrape
//!
//! Default values used by the config builder and the pipeline so that
//! timeouts and limits are defined in one place.

/// Chrome user agent string presented by the production session
///
/// A current desktop Chrome string; pages that sniff the agent render the
/// same markup a regular visitor gets.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// CDP request timeout for the browser connection (seconds)
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;

/// Maximum time for `goto` + `wait_for_navigation` (seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;

/// Per-locate-call timeout (milliseconds)
///
/// Bounds the polling loop that waits for an element to be present and
/// interactable. Applied per call, never as a run deadline.
pub const DEFAULT_LOCATE_TIMEOUT_MS: u64 = 10_000;

/// Interval between locate polls (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Result links read per search page
///
/// Matches the listing length of the default site profile.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Retries after the first failed attempt (4 attempts in total)
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// First backoff delay; doubles per retry (1s, 2s, 4s)
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Maximum accepted query length in characters
pub const MAX_QUERY_LENGTH: usize = 500;

/// Default browser window size
pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (1920, 1080);
