//! Extraction pipeline
//!
//! Orchestrates the navigation controller and the locator over one session,
//! applies the retry policy per target and yields normalized titles lazily.

mod attempt;
mod cancel;
mod events;
mod extract;
mod shard;
mod stream;

use std::sync::Arc;
use tokio::time::Instant;

use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::session::SessionLauncher;
use crate::utils::MAX_QUERY_LENGTH;

pub use attempt::{ExtractionAttempt, RetryDecision, RetryPolicy};
pub use cancel::CancellationHandle;
pub use events::{DiagnosticEvent, DiagnosticSink, diagnostic_channel};
pub use shard::run_sharded;
pub use stream::{RunReport, TitleStream};

use stream::RunContext;

/// Entry point for extraction runs
pub struct ExtractionPipeline<L: SessionLauncher> {
    launcher: Arc<L>,
    config: Arc<ScrapeConfig>,
    sink: DiagnosticSink,
    cancel: CancellationHandle,
    deadline: Option<Instant>,
}

impl<L: SessionLauncher> ExtractionPipeline<L> {
    pub fn new(launcher: L, config: ScrapeConfig) -> Self {
        Self::from_shared(Arc::new(launcher), config)
    }

    /// Build a pipeline over a launcher shared with other pipelines
    pub fn from_shared(launcher: Arc<L>, config: ScrapeConfig) -> Self {
        Self {
            launcher,
            config: Arc::new(config),
            sink: DiagnosticSink::log_only(),
            cancel: CancellationHandle::new(),
            deadline: None,
        }
    }

    /// Forward diagnostic events to `sink`
    #[must_use]
    pub fn with_diagnostics(mut self, sink: DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    /// Share an existing cancellation handle
    #[must_use]
    pub fn with_cancellation(mut self, handle: CancellationHandle) -> Self {
        self.cancel = handle;
        self
    }

    /// Stop runs once `deadline` passes
    ///
    /// Checked at the same points as cancellation; a locate call already in
    /// progress finishes under its own timeout.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Handle that cancels every run started by this pipeline
    #[must_use]
    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancel.clone()
    }

    #[must_use]
    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Start a run for `query`, yielding at most `max_records` titles
    ///
    /// Nothing touches the browser until the returned stream is pulled.
    ///
    /// # Errors
    ///
    /// Returns `ScrapeError::Config` for an empty or over-long query.
    pub fn run(&self, query: &str, max_records: usize) -> ScrapeResult<TitleStream<L>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScrapeError::Config("query must not be empty".to_string()));
        }
        if query.chars().count() > MAX_QUERY_LENGTH {
            return Err(ScrapeError::Config(format!(
                "query exceeds {MAX_QUERY_LENGTH} characters"
            )));
        }

        Ok(TitleStream::new(RunContext {
            launcher: Arc::clone(&self.launcher),
            config: Arc::clone(&self.config),
            query: query.to_string(),
            max_records,
            policy: self.config.retry_policy(),
            cancel: self.cancel.clone(),
            deadline: self.deadline,
            sink: self.sink.clone(),
        }))
    }
}
