//! Scrape titles for a query and print them as JSON Lines
//!
//! ```text
//! cargo run --example scrape_titles -- "Drama 2024" 10
//! ```

use anyhow::{Context, Result};
use cinescrape::{
    ChromiumLauncher, DiagnosticEvent, ExtractionPipeline, ScrapeConfig, diagnostic_channel,
};
use futures::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
                .add_directive("chromiumoxide::handler=off".parse()?)
                .add_directive("chromiumoxide::conn=off".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let query = args
        .next()
        .context("usage: scrape_titles <query> [max_records]")?;
    let max_records: usize = match args.next() {
        Some(raw) => raw.parse().context("max_records must be a number")?,
        None => 10,
    };

    let config = ScrapeConfig::builder().build()?;
    let (sink, mut events) = diagnostic_channel();
    let pipeline = ExtractionPipeline::new(ChromiumLauncher::new(), config).with_diagnostics(sink);

    let cancel = pipeline.cancellation_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received, stopping after the current step");
            cancel.cancel();
        }
    });

    let mut titles = Box::pin(pipeline.run(&query, max_records)?.into_stream());
    let mut emitted = 0usize;
    let mut failure = None;
    while let Some(item) = titles.next().await {
        match item {
            Ok(title) => {
                println!("{}", serde_json::to_string(&title)?);
                emitted += 1;
            }
            Err(e) => failure = Some(e),
        }
    }
    drop(titles);
    drop(pipeline);

    let mut skipped = 0usize;
    let mut anomalies = 0usize;
    while let Ok(event) = events.try_recv() {
        match event {
            DiagnosticEvent::Skipped { .. } => skipped += 1,
            DiagnosticEvent::Anomaly { .. } => anomalies += 1,
            _ => {}
        }
    }
    eprintln!("{emitted} title(s), {skipped} skipped, {anomalies} anomalies");

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
