//! Lazy, single-pass title sequence
//!
//! Pulling from a [`TitleStream`] drives the browser. The session is opened
//! on the first pull and released when the sequence ends, however it ends.
//! Once consumed the stream stays consumed; a new run needs a new stream.

use futures::Stream;
use std::sync::Arc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use super::attempt::{ExtractionAttempt, RetryDecision, RetryPolicy};
use super::cancel::CancellationHandle;
use super::events::{DiagnosticEvent, DiagnosticSink};
use super::extract::extract_detail;
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::model::Title;
use crate::navigation::{DetailLink, NavStep, NavigationController, PageCursor, StopReason};
use crate::normalize::normalize;
use crate::session::{PageSession, SessionLauncher};

/// Everything a run needs besides its session
pub(crate) struct RunContext<L> {
    pub(crate) launcher: Arc<L>,
    pub(crate) config: Arc<ScrapeConfig>,
    pub(crate) query: String,
    pub(crate) max_records: usize,
    pub(crate) policy: RetryPolicy,
    pub(crate) cancel: CancellationHandle,
    pub(crate) deadline: Option<Instant>,
    pub(crate) sink: DiagnosticSink,
}

struct Running<S> {
    session: S,
    nav: NavigationController,
}

enum Phase<S> {
    /// Nothing opened yet
    Pending,
    Running(Box<Running<S>>),
    Consumed,
}

#[derive(Debug, Default)]
struct Progress {
    emitted: usize,
    skipped: Vec<String>,
    stop_reason: Option<StopReason>,
}

enum StepOutcome {
    Continue,
    Emit(Title),
    Stop(StopReason),
    Fail(ScrapeError),
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Titles in emission order
    pub titles: Vec<Title>,
    /// Fatal error that ended the run early, if any
    pub error: Option<ScrapeError>,
    pub stop_reason: Option<StopReason>,
    /// Ids of targets skipped after exhausting their retries
    pub skipped: Vec<String>,
}

/// Finite, non-restartable sequence of titles
pub struct TitleStream<L: SessionLauncher> {
    ctx: RunContext<L>,
    phase: Phase<L::Session>,
    progress: Progress,
}

impl<L: SessionLauncher> TitleStream<L> {
    pub(crate) fn new(ctx: RunContext<L>) -> Self {
        Self {
            ctx,
            phase: Phase::Pending,
            progress: Progress::default(),
        }
    }

    /// Whether the sequence has ended
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        matches!(self.phase, Phase::Consumed)
    }

    /// Why the sequence ended; `None` while it is still live
    #[must_use]
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.progress.stop_reason
    }

    #[must_use]
    pub fn emitted(&self) -> usize {
        self.progress.emitted
    }

    /// Ids skipped so far
    #[must_use]
    pub fn skipped(&self) -> &[String] {
        &self.progress.skipped
    }

    /// Pull the next title
    ///
    /// Yields `Err` at most once, for a fatal condition; the sequence then
    /// ends and every title yielded before it stays valid.
    pub async fn next(&mut self) -> Option<ScrapeResult<Title>> {
        if matches!(self.phase, Phase::Pending)
            && let Err(e) = self.start().await
        {
            return Some(Err(e));
        }

        loop {
            let outcome = {
                let Phase::Running(run) = &mut self.phase else {
                    return None;
                };
                match self.ctx.interruption() {
                    Some(reason) => StepOutcome::Stop(reason),
                    None => match run.nav.next_step() {
                        NavStep::Stop(reason) => StepOutcome::Stop(reason),
                        NavStep::LoadResults(cursor) => self.ctx.load_results(run, cursor).await,
                        NavStep::Visit(link) => {
                            self.ctx.visit(run, link, &mut self.progress).await
                        }
                    },
                }
            };

            match outcome {
                StepOutcome::Continue => {}
                StepOutcome::Emit(title) => {
                    self.progress.emitted += 1;
                    return Some(Ok(title));
                }
                StepOutcome::Stop(reason) => {
                    self.shutdown(reason).await;
                    return None;
                }
                StepOutcome::Fail(e) => {
                    self.shutdown(StopReason::SessionFailed).await;
                    return Some(Err(e));
                }
            }
        }
    }

    /// Open the session, unless the run is over before it starts
    async fn start(&mut self) -> ScrapeResult<()> {
        if self.ctx.max_records == 0 {
            self.shutdown(StopReason::RecordCapReached).await;
            return Ok(());
        }
        if let Some(reason) = self.ctx.interruption() {
            self.shutdown(reason).await;
            return Ok(());
        }

        self.ctx
            .sink
            .emit(DiagnosticEvent::run_started(&self.ctx.query, self.ctx.max_records));

        let mut session = match self.ctx.launcher.open(&self.ctx.config).await {
            Ok(session) => session,
            Err(e) => {
                self.shutdown(StopReason::SessionFailed).await;
                return Err(e);
            }
        };

        let nav = match NavigationController::new(
            self.ctx.config.site().clone(),
            self.ctx.query.clone(),
            self.ctx.config.page_size(),
            self.ctx.max_records,
            self.ctx.config.locate_options(),
        ) {
            Ok(nav) => nav,
            Err(e) => {
                let _ = session.close().await;
                self.shutdown(StopReason::SessionFailed).await;
                return Err(e);
            }
        };

        self.phase = Phase::Running(Box::new(Running { session, nav }));
        Ok(())
    }

    /// End the sequence early and release the session
    pub async fn close(&mut self) {
        if !self.is_consumed() {
            self.shutdown(StopReason::Cancelled).await;
        }
    }

    async fn shutdown(&mut self, reason: StopReason) {
        let previous = std::mem::replace(&mut self.phase, Phase::Consumed);
        let reason = match previous {
            Phase::Running(mut run) => {
                let reason = run.nav.finish(reason);
                if let Err(e) = run.session.close().await {
                    debug!("Session close reported: {e}");
                }
                reason
            }
            Phase::Pending => reason,
            Phase::Consumed => return,
        };

        self.progress.stop_reason = Some(reason);
        self.ctx.sink.emit(DiagnosticEvent::run_finished(
            self.progress.emitted,
            self.progress.skipped.len(),
            reason,
        ));
    }

    /// Drain the sequence into a report
    pub async fn collect_report(mut self) -> RunReport {
        let mut titles = Vec::new();
        let mut error = None;
        while let Some(item) = self.next().await {
            match item {
                Ok(title) => titles.push(title),
                Err(e) => error = Some(e),
            }
        }
        RunReport {
            titles,
            error,
            stop_reason: self.progress.stop_reason,
            skipped: std::mem::take(&mut self.progress.skipped),
        }
    }
}

impl<L: SessionLauncher + 'static> TitleStream<L> {
    /// Adapt into a `futures::Stream`
    pub fn into_stream(self) -> impl Stream<Item = ScrapeResult<Title>> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            stream.next().await.map(|item| (item, stream))
        })
    }
}

impl<L: SessionLauncher> RunContext<L> {
    /// Cancellation or deadline, whichever applies first
    fn interruption(&self) -> Option<StopReason> {
        if self.cancel.is_cancelled() {
            return Some(StopReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(StopReason::DeadlineReached),
            _ => None,
        }
    }

    /// Sleep until `at`; checks for interruption before and after
    async fn wait_for_retry(&self, at: Instant) -> Option<StopReason> {
        if let Some(reason) = self.interruption() {
            return Some(reason);
        }
        let wake = match self.deadline {
            Some(deadline) if deadline < at => deadline,
            _ => at,
        };
        sleep_until(wake).await;
        self.interruption()
    }

    async fn load_results(
        &self,
        run: &mut Running<L::Session>,
        cursor: PageCursor,
    ) -> StepOutcome {
        let mut attempt = ExtractionAttempt::new(format!("search page {}", cursor.page_number()));
        loop {
            let error = match run.nav.load_results(&mut run.session, cursor).await {
                Ok(_) => return StepOutcome::Continue,
                Err(e) => e,
            };
            if !error.is_transient() {
                return StepOutcome::Fail(error);
            }

            match attempt.record_failure(&error, &self.policy, Instant::now()) {
                RetryDecision::Exhausted => {
                    self.sink.emit(DiagnosticEvent::search_page_abandoned(
                        cursor.page_number(),
                        attempt.attempts(),
                        attempt.last_failure(),
                    ));
                    run.nav.finish(StopReason::SearchUnavailable);
                    return StepOutcome::Continue;
                }
                RetryDecision::RetryAt(at) => {
                    self.sink.emit(DiagnosticEvent::retrying(
                        attempt.target(),
                        attempt.attempts(),
                        attempt.last_failure(),
                        at.saturating_duration_since(Instant::now()),
                    ));
                    if let Some(reason) = self.wait_for_retry(at).await {
                        return StepOutcome::Stop(reason);
                    }
                }
            }
        }
    }

    /// One detail page: navigate, read, normalize; retried as a unit
    async fn visit(
        &self,
        run: &mut Running<L::Session>,
        link: DetailLink,
        progress: &mut Progress,
    ) -> StepOutcome {
        let options = self.config.locate_options();
        let mut attempt = ExtractionAttempt::new(link.id.clone());

        loop {
            let raw = match run.nav.enter_detail(&mut run.session, &link).await {
                Ok(()) => extract_detail(&mut run.session, self.config.site(), &link, &options).await,
                Err(e) => Err(e),
            };

            let error = match raw.and_then(normalize) {
                Ok(normalized) => {
                    for anomaly in normalized.anomalies {
                        self.sink.emit(DiagnosticEvent::anomaly(&link.id, anomaly));
                    }
                    run.nav.record_emitted();
                    run.nav.leave_detail();
                    info!("Extracted {} ({})", normalized.title.id(), normalized.title.name());
                    return StepOutcome::Emit(normalized.title);
                }
                Err(e) => e,
            };

            if !error.is_transient() {
                return StepOutcome::Fail(error);
            }

            match attempt.record_failure(&error, &self.policy, Instant::now()) {
                RetryDecision::Exhausted => {
                    self.sink.emit(DiagnosticEvent::skipped(
                        &link.id,
                        &link.url,
                        attempt.attempts(),
                        attempt.last_failure(),
                    ));
                    progress.skipped.push(link.id);
                    run.nav.leave_detail();
                    return StepOutcome::Continue;
                }
                RetryDecision::RetryAt(at) => {
                    debug!("Attempt {} for {} failed: {error}", attempt.attempts(), link.id);
                    self.sink.emit(DiagnosticEvent::retrying(
                        &link.id,
                        attempt.attempts(),
                        attempt.last_failure(),
                        at.saturating_duration_since(Instant::now()),
                    ));
                    if let Some(reason) = self.wait_for_retry(at).await {
                        return StepOutcome::Stop(reason);
                    }
                }
            }
        }
    }
}
