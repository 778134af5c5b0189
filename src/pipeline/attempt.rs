//! Per-target retry state
//!
//! Retry bookkeeping is an explicit value (attempt counter plus the instant
//! the next attempt is due) rather than loop-local state, so the schedule is
//! testable without a browser.

use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{FailureKind, ScrapeError};
use crate::utils::{DEFAULT_BACKOFF_BASE_MS, DEFAULT_MAX_RETRIES};

/// Exponential backoff policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound of uniform random jitter added to every delay
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            jitter: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Total attempts allowed for one target
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry `retry` (0-based): `base * 2^retry + jitter`
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        let delay = self.base_delay.saturating_mul(factor);
        if self.jitter.is_zero() {
            return delay;
        }
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        delay.saturating_add(Duration::from_millis(rand::rng().random_range(0..=jitter_ms)))
    }
}

/// Outcome of recording a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again once this instant is reached
    RetryAt(Instant),
    /// No attempts left; the target is skipped
    Exhausted,
}

/// Retry state for one target, discarded on success or exhaustion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionAttempt {
    target: String,
    attempts: u32,
    last_failure: Option<FailureKind>,
    retry_at: Option<Instant>,
}

impl ExtractionAttempt {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            attempts: 0,
            last_failure: None,
            retry_at: None,
        }
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Failed attempts so far
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn last_failure(&self) -> Option<FailureKind> {
        self.last_failure
    }

    #[must_use]
    pub fn retry_at(&self) -> Option<Instant> {
        self.retry_at
    }

    /// Record a failed attempt made at `now` and decide what happens next
    pub fn record_failure(
        &mut self,
        error: &ScrapeError,
        policy: &RetryPolicy,
        now: Instant,
    ) -> RetryDecision {
        self.attempts += 1;
        self.last_failure = error.failure_kind();

        if self.attempts >= policy.max_attempts() {
            self.retry_at = None;
            return RetryDecision::Exhausted;
        }

        let at = now + policy.delay_for(self.attempts - 1);
        self.retry_at = Some(at);
        RetryDecision::RetryAt(at)
    }
}
