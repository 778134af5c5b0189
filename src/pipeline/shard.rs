use futures::future::join_all;
use tracing::info;

use super::ExtractionPipeline;
use super::stream::RunReport;
use crate::error::ScrapeResult;
use crate::session::SessionLauncher;

/// Run one isolated session per query, concurrently on the current task
///
/// Each query gets its own session, navigation state and cursor. Reports
/// are returned in query order.
pub async fn run_sharded<L: SessionLauncher>(
    pipeline: &ExtractionPipeline<L>,
    queries: &[&str],
    max_records: usize,
) -> Vec<(String, ScrapeResult<RunReport>)> {
    info!("Running {} sharded queries", queries.len());

    let runs = queries.iter().map(|query| async move {
        let report = match pipeline.run(query, max_records) {
            Ok(stream) => Ok(stream.collect_report().await),
            Err(e) => Err(e),
        };
        (query.to_string(), report)
    });

    join_all(runs).await
}
