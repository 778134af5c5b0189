//! Diagnostic event stream
//!
//! Skipped targets, retries and anomalies never fail a run. They are logged
//! through `tracing` and forwarded to an optional channel for observability
//! consumers.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::FailureKind;
use crate::navigation::StopReason;
use crate::normalize::Anomaly;

/// Events emitted while a run progresses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DiagnosticEvent {
    RunStarted {
        query: String,
        max_records: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// A transient failure will be retried after `delay`
    Retrying {
        target: String,
        attempt: u32,
        failure: Option<FailureKind>,
        delay: Duration,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// A detail page failed every attempt; no title is emitted for it
    Skipped {
        id: String,
        url: String,
        attempts: u32,
        last_failure: Option<FailureKind>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// A field value was dropped during normalization
    Anomaly {
        id: String,
        anomaly: Anomaly,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// A search page failed every attempt; traversal ends
    SearchPageAbandoned {
        page: usize,
        attempts: u32,
        last_failure: Option<FailureKind>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    RunFinished {
        emitted: usize,
        skipped: usize,
        stop_reason: StopReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DiagnosticEvent {
    #[must_use]
    pub fn run_started(query: &str, max_records: usize) -> Self {
        Self::RunStarted {
            query: query.to_string(),
            max_records,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn retrying(
        target: &str,
        attempt: u32,
        failure: Option<FailureKind>,
        delay: Duration,
    ) -> Self {
        Self::Retrying {
            target: target.to_string(),
            attempt,
            failure,
            delay,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn skipped(id: &str, url: &str, attempts: u32, last_failure: Option<FailureKind>) -> Self {
        Self::Skipped {
            id: id.to_string(),
            url: url.to_string(),
            attempts,
            last_failure,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn anomaly(id: &str, anomaly: Anomaly) -> Self {
        Self::Anomaly {
            id: id.to_string(),
            anomaly,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn search_page_abandoned(
        page: usize,
        attempts: u32,
        last_failure: Option<FailureKind>,
    ) -> Self {
        Self::SearchPageAbandoned {
            page,
            attempts,
            last_failure,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn run_finished(emitted: usize, skipped: usize, stop_reason: StopReason) -> Self {
        Self::RunFinished {
            emitted,
            skipped,
            stop_reason,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Logs every event and forwards it to the subscriber, if any
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    sender: Option<mpsc::UnboundedSender<DiagnosticEvent>>,
}

/// Create a connected sink and receiver
#[must_use]
pub fn diagnostic_channel() -> (DiagnosticSink, mpsc::UnboundedReceiver<DiagnosticEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DiagnosticSink::new(tx), rx)
}

impl DiagnosticSink {
    #[must_use]
    pub fn new(sender: mpsc::UnboundedSender<DiagnosticEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// A sink that only logs
    #[must_use]
    pub fn log_only() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: DiagnosticEvent) {
        match &event {
            DiagnosticEvent::RunStarted {
                query, max_records, ..
            } => info!("Run started: '{query}' (max {max_records} titles)"),
            DiagnosticEvent::Retrying {
                target,
                attempt,
                failure,
                delay,
                ..
            } => debug!("Retrying {target} after attempt {attempt} ({failure:?}) in {delay:?}"),
            DiagnosticEvent::Skipped {
                id,
                attempts,
                last_failure,
                ..
            } => warn!("Skipped {id} after {attempts} attempts, last failure {last_failure:?}"),
            DiagnosticEvent::Anomaly { id, anomaly, .. } => warn!(
                "Anomaly in {id}: {} = {:?} ({:?})",
                anomaly.field, anomaly.raw, anomaly.reason
            ),
            DiagnosticEvent::SearchPageAbandoned {
                page, attempts, ..
            } => warn!("Search page {page} abandoned after {attempts} attempts"),
            DiagnosticEvent::RunFinished {
                emitted,
                skipped,
                stop_reason,
                ..
            } => info!("Run finished: {emitted} emitted, {skipped} skipped ({stop_reason:?})"),
        }

        if let Some(sender) = &self.sender {
            // Receiver gone means nobody is listening; logging already happened
            let _ = sender.send(event);
        }
    }
}
