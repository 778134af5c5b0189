//! End-to-end pipeline runs against replayed sites

mod common;

use cinescrape::session::{CannedPage, PageScript, ReplaySite};
use cinescrape::{
    AnomalyReason, DiagnosticEvent, ExtractionPipeline, FailureKind, PageSession, ReplayLauncher,
    ScrapeError, StopReason, diagnostic_channel, run_sharded, with_session,
};
use common::{
    MovieFixture, catalog_site, catalog_site_with_search_script, detail_url, fast_config,
    movie_ids, results_html, scripted, search_page_url, single_page_site,
};
use futures::{FutureExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

fn drain(rx: &mut UnboundedReceiver<DiagnosticEvent>) -> Vec<DiagnosticEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn movies(ids: &[&str]) -> Vec<MovieFixture> {
    ids.iter().map(|id| MovieFixture::new(id)).collect()
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_pages_yield_unique_ids() {
    let mut site = ReplaySite::new()
        .page(
            search_page_url("noir", 1, 3),
            CannedPage::new(results_html(&["tt001", "tt002", "tt003"], true)),
        )
        .page(
            search_page_url("noir", 2, 3),
            CannedPage::new(results_html(&["tt003", "tt004", "tt005"], false)),
        );
    for id in ["tt001", "tt002", "tt003", "tt004", "tt005"] {
        site.insert(detail_url(id), MovieFixture::new(id).page());
    }
    let launcher = ReplayLauncher::new(site);
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3));

    let report = pipeline.run("noir", 10).unwrap().collect_report().await;

    let ids: Vec<&str> = report.titles.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec!["tt001", "tt002", "tt003", "tt004", "tt005"]);
    assert_eq!(probe.visits(&detail_url("tt003")), 1);
    assert_eq!(report.stop_reason, Some(StopReason::NoMoreResults));
    assert!(report.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_three_failures_then_success_emits_title() {
    let fixtures = movies(&["tt001", "tt002", "tt003"]);
    let mut site = single_page_site("western", 3, &fixtures);
    site.insert(
        detail_url("tt002"),
        scripted(&fixtures[1], PageScript::default().blank_visits(3)),
    );
    let (sink, mut events) = diagnostic_channel();
    let pipeline =
        ExtractionPipeline::new(ReplayLauncher::new(site), fast_config(3)).with_diagnostics(sink);

    let started = Instant::now();
    let report = pipeline.run("western", 10).unwrap().collect_report().await;
    let elapsed = started.elapsed();

    assert_eq!(report.titles.len(), 3);
    assert_eq!(report.titles[1].id(), "tt002");
    assert!(report.skipped.is_empty());

    let delays: Vec<Duration> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            DiagnosticEvent::Retrying {
                target,
                delay,
                failure,
                ..
            } => {
                assert_eq!(target, "tt002");
                assert_eq!(failure, Some(FailureKind::NotFound));
                Some(delay)
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        delays,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
    assert!(elapsed >= Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn test_four_failures_skip_with_one_event() {
    let fixtures = movies(&["tt001", "tt002", "tt003"]);
    let mut site = single_page_site("western", 3, &fixtures);
    site.insert(
        detail_url("tt002"),
        scripted(&fixtures[1], PageScript::default().blank_visits(4)),
    );
    let launcher = ReplayLauncher::new(site);
    let probe = launcher.probe();
    let (sink, mut events) = diagnostic_channel();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3)).with_diagnostics(sink);

    let report = pipeline.run("western", 10).unwrap().collect_report().await;

    let ids: Vec<&str> = report.titles.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec!["tt001", "tt003"]);
    assert_eq!(report.skipped, vec!["tt002".to_string()]);
    assert!(report.error.is_none());
    assert_eq!(probe.visits(&detail_url("tt002")), 4);

    let skipped: Vec<DiagnosticEvent> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, DiagnosticEvent::Skipped { .. }))
        .collect();
    assert_eq!(skipped.len(), 1);
    match &skipped[0] {
        DiagnosticEvent::Skipped {
            id,
            url,
            attempts,
            last_failure,
            ..
        } => {
            assert_eq!(id, "tt002");
            assert_eq!(url, &detail_url("tt002"));
            assert_eq!(*attempts, 4);
            assert_eq!(*last_failure, Some(FailureKind::NotFound));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_record_cap_stops_before_next_page() {
    let launcher = ReplayLauncher::new(catalog_site("thriller", 12, 3));
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3));

    let report = pipeline.run("thriller", 5).unwrap().collect_report().await;

    assert_eq!(report.titles.len(), 5);
    assert_eq!(report.stop_reason, Some(StopReason::RecordCapReached));
    assert_eq!(probe.visits(&search_page_url("thriller", 1, 3)), 1);
    assert_eq!(probe.visits(&search_page_url("thriller", 2, 3)), 1);
    assert_eq!(probe.visits(&search_page_url("thriller", 3, 3)), 0);
    assert_eq!(probe.visits(&detail_url("tt0000006")), 0);
}

#[tokio::test(start_paused = true)]
async fn test_traversal_follows_every_page() {
    let launcher = ReplayLauncher::new(catalog_site("comedy", 7, 3));
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3));

    let report = pipeline.run("comedy", 100).unwrap().collect_report().await;

    assert_eq!(report.titles.len(), 7);
    assert_eq!(report.stop_reason, Some(StopReason::NoMoreResults));
    assert_eq!(probe.visits(&search_page_url("comedy", 3, 3)), 1);
    assert_eq!(probe.visits(&search_page_url("comedy", 4, 3)), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_releases_session() {
    let launcher = ReplayLauncher::new(catalog_site("horror", 9, 3));
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3));
    let handle = pipeline.cancellation_handle();

    let mut stream = pipeline.run("horror", 9).unwrap();
    let first = stream.next().await.unwrap().unwrap();
    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(probe.live_sessions(), 1);

    handle.cancel();
    assert!(stream.next().await.is_none());

    assert!(stream.is_consumed());
    assert_eq!(stream.stop_reason(), Some(StopReason::Cancelled));
    assert_eq!(probe.live_sessions(), 0);
    assert_eq!(probe.closed(), 1);
    assert_eq!(first.id(), "tt0000001");
    assert_eq!(second.id(), "tt0000002");
}

#[tokio::test(start_paused = true)]
async fn test_close_ends_stream_early() {
    let launcher = ReplayLauncher::new(catalog_site("horror", 9, 3));
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3));

    let mut stream = pipeline.run("horror", 9).unwrap();
    assert!(stream.next().await.unwrap().is_ok());
    stream.close().await;

    assert!(stream.next().await.is_none());
    assert_eq!(stream.emitted(), 1);
    assert_eq!(stream.stop_reason(), Some(StopReason::Cancelled));
    assert_eq!(probe.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_stream_releases_session() {
    let launcher = ReplayLauncher::new(catalog_site("horror", 9, 3));
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3));

    let mut stream = pipeline.run("horror", 9).unwrap();
    assert!(stream.next().await.unwrap().is_ok());
    drop(stream);

    assert_eq!(probe.live_sessions(), 0);
    assert_eq!(probe.released_on_drop(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_rating_stays_absent() {
    let fixtures = vec![
        MovieFixture::new("tt101").genres(&["Drama"]),
        MovieFixture::new("tt102")
            .genres(&["Drama", "Romance"])
            .without_rating(),
        MovieFixture::new("tt103").genres(&["Drama"]).runtime(None),
        MovieFixture::new("tt104"),
    ];
    let launcher = ReplayLauncher::new(single_page_site("Drama 2024", 10, &fixtures));
    let pipeline = ExtractionPipeline::new(launcher, fast_config(10));

    let report = pipeline.run("Drama 2024", 3).unwrap().collect_report().await;

    assert_eq!(report.titles.len(), 3);
    for title in &report.titles {
        assert!(!title.id().is_empty());
        assert!(!title.name().is_empty());
        assert!(title.has_genre("drama"));
    }
    assert_eq!(report.titles[0].rating(), Some(7.1));
    assert_eq!(report.titles[1].rating(), None);
    assert_eq!(report.titles[1].vote_count(), Some(12_345));
    assert_eq!(report.titles[2].duration_minutes(), None);
    assert_eq!(report.stop_reason, Some(StopReason::RecordCapReached));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_values_become_anomalies() {
    let fixtures = vec![
        MovieFixture::new("tt201").ratings(&["11.5"]),
        MovieFixture::new("tt202").ratings(&["8.4", "6.0/10"]),
    ];
    let (sink, mut events) = diagnostic_channel();
    let pipeline = ExtractionPipeline::new(
        ReplayLauncher::new(single_page_site("sci-fi", 5, &fixtures)),
        fast_config(5),
    )
    .with_diagnostics(sink);

    let report = pipeline.run("sci-fi", 10).unwrap().collect_report().await;

    assert_eq!(report.titles[0].rating(), None);
    assert_eq!(report.titles[1].rating(), Some(8.4));

    let anomalies: Vec<(String, AnomalyReason)> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            DiagnosticEvent::Anomaly { id, anomaly, .. } => Some((id, anomaly.reason)),
            _ => None,
        })
        .collect();
    assert_eq!(
        anomalies,
        vec![
            ("tt201".to_string(), AnomalyReason::OutOfRange),
            ("tt202".to_string(), AnomalyReason::ExtraRatingSource),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_crash_preserves_partial_results() {
    let fixtures = movies(&["tt001", "tt002", "tt003", "tt004"]);
    let mut site = single_page_site("war", 5, &fixtures);
    site.insert(
        detail_url("tt003"),
        scripted(&fixtures[2], PageScript::default().crash_on_visit(1)),
    );
    let launcher = ReplayLauncher::new(site);
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(5));

    let mut stream = pipeline.run("war", 10).unwrap();
    let mut titles = Vec::new();
    let mut errors = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(title) => titles.push(title),
            Err(e) => errors.push(e),
        }
    }

    let ids: Vec<&str> = titles.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec!["tt001", "tt002"]);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ScrapeError::FatalExtraction(_)));
    assert_eq!(stream.stop_reason(), Some(StopReason::SessionFailed));
    assert_eq!(probe.live_sessions(), 0);
    assert_eq!(probe.visits(&detail_url("tt004")), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_browser_is_environment_error() {
    let launcher = ReplayLauncher::unavailable();
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(5));

    let mut stream = pipeline.run("anything", 5).unwrap();
    let first = stream.next().await;
    assert!(matches!(first, Some(Err(ScrapeError::Environment(_)))));
    assert!(stream.next().await.is_none());
    assert!(stream.is_consumed());
    assert_eq!(probe.opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stream_is_not_restartable() {
    let launcher = ReplayLauncher::new(catalog_site("musical", 2, 5));
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(5));

    let mut stream = pipeline.run("musical", 10).unwrap();
    let mut count = 0;
    while let Some(item) = stream.next().await {
        item.unwrap();
        count += 1;
    }
    assert_eq!(count, 2);

    assert!(stream.next().await.is_none());
    assert!(stream.next().await.is_none());
    assert_eq!(probe.opened(), 1);
    assert_eq!(probe.navigations().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_nothing_happens_until_pulled() {
    let launcher = ReplayLauncher::new(catalog_site("musical", 2, 5));
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(5));

    let stream = pipeline.run("musical", 10).unwrap();
    assert_eq!(probe.opened(), 0);
    assert!(!stream.is_consumed());
    drop(stream);
    assert_eq!(probe.opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_zero_max_records_opens_no_browser() {
    let launcher = ReplayLauncher::new(catalog_site("musical", 2, 5));
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(5));

    let mut stream = pipeline.run("musical", 0).unwrap();
    assert!(stream.next().await.is_none());
    assert_eq!(stream.stop_reason(), Some(StopReason::RecordCapReached));
    assert_eq!(probe.opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_query_is_rejected() {
    let pipeline = ExtractionPipeline::new(ReplayLauncher::new(ReplaySite::new()), fast_config(5));

    assert!(matches!(pipeline.run("   ", 5), Err(ScrapeError::Config(_))));
    let long = "x".repeat(501);
    assert!(matches!(pipeline.run(&long, 5), Err(ScrapeError::Config(_))));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_stops_during_backoff() {
    let fixtures = movies(&["tt001", "tt002", "tt003"]);
    let mut site = single_page_site("epic", 3, &fixtures);
    site.insert(
        detail_url("tt002"),
        scripted(&fixtures[1], PageScript::default().blank_visits(10)),
    );
    let launcher = ReplayLauncher::new(site);
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3))
        .with_deadline(Instant::now() + Duration::from_secs(1));

    let report = pipeline.run("epic", 10).unwrap().collect_report().await;

    let ids: Vec<&str> = report.titles.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec!["tt001"]);
    assert_eq!(report.stop_reason, Some(StopReason::DeadlineReached));
    assert!(report.error.is_none());
    assert_eq!(probe.visits(&detail_url("tt002")), 1);
    assert_eq!(probe.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_search_page_is_abandoned() {
    let site = ReplaySite::new().page(
        search_page_url("silent", 1, 3),
        CannedPage::new(results_html(&["tt001"], false))
            .with_script(PageScript::default().failed_loads(10)),
    );
    let launcher = ReplayLauncher::new(site);
    let probe = launcher.probe();
    let (sink, mut events) = diagnostic_channel();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3)).with_diagnostics(sink);

    let report = pipeline.run("silent", 10).unwrap().collect_report().await;

    assert!(report.titles.is_empty());
    assert!(report.error.is_none());
    assert_eq!(report.stop_reason, Some(StopReason::SearchUnavailable));
    assert_eq!(probe.visits(&search_page_url("silent", 1, 3)), 4);

    let abandoned: Vec<DiagnosticEvent> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, DiagnosticEvent::SearchPageAbandoned { .. }))
        .collect();
    assert_eq!(abandoned.len(), 1);
    assert!(matches!(
        abandoned[0],
        DiagnosticEvent::SearchPageAbandoned {
            page: 1,
            attempts: 4,
            last_failure: Some(FailureKind::Navigation),
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_no_results_page_ends_run() {
    let site = ReplaySite::new().page(
        search_page_url("zzzz", 1, 3),
        CannedPage::new(common::no_results_html()),
    );
    let pipeline = ExtractionPipeline::new(ReplayLauncher::new(site), fast_config(3));

    let started = Instant::now();
    let report = pipeline.run("zzzz", 10).unwrap().collect_report().await;

    assert!(report.titles.is_empty());
    assert!(report.error.is_none());
    assert_eq!(report.stop_reason, Some(StopReason::NoMoreResults));
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_single_stale_read_is_relocated() {
    let fixtures = movies(&["tt001"]);
    let mut site = single_page_site("mystery", 3, &fixtures);
    site.insert(
        detail_url("tt001"),
        scripted(&fixtures[0], PageScript::default().stale_reads(1)),
    );
    let (sink, mut events) = diagnostic_channel();
    let launcher = ReplayLauncher::new(site);
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3)).with_diagnostics(sink);

    let report = pipeline.run("mystery", 10).unwrap().collect_report().await;

    assert_eq!(report.titles.len(), 1);
    assert_eq!(report.titles[0].name(), "Movie tt001");
    assert_eq!(probe.visits(&detail_url("tt001")), 1);
    assert!(
        !drain(&mut events)
            .iter()
            .any(|e| matches!(e, DiagnosticEvent::Retrying { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_repeated_stale_reads_retry_the_page() {
    let fixtures = movies(&["tt001"]);
    let mut site = single_page_site("mystery", 3, &fixtures);
    site.insert(
        detail_url("tt001"),
        scripted(&fixtures[0], PageScript::default().stale_reads(2)),
    );
    let (sink, mut events) = diagnostic_channel();
    let launcher = ReplayLauncher::new(site);
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3)).with_diagnostics(sink);

    let report = pipeline.run("mystery", 10).unwrap().collect_report().await;

    assert_eq!(report.titles.len(), 1);
    assert_eq!(probe.visits(&detail_url("tt001")), 2);
    let retries: Vec<Option<FailureKind>> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            DiagnosticEvent::Retrying { failure, .. } => Some(failure),
            _ => None,
        })
        .collect();
    assert_eq!(retries, vec![Some(FailureKind::StaleElement)]);
}

#[tokio::test(start_paused = true)]
async fn test_late_render_is_waited_for() {
    let fixtures = movies(&["tt001"]);
    let mut site = single_page_site("slow", 3, &fixtures);
    site.insert(
        detail_url("tt001"),
        scripted(&fixtures[0], PageScript::default().render_after_polls(4)),
    );
    let launcher = ReplayLauncher::new(site);
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3));

    let report = pipeline.run("slow", 10).unwrap().collect_report().await;

    assert_eq!(report.titles.len(), 1);
    assert_eq!(probe.visits(&detail_url("tt001")), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_finished_event_closes_the_run() {
    let (sink, mut events) = diagnostic_channel();
    let pipeline = ExtractionPipeline::new(
        ReplayLauncher::new(catalog_site("family", 4, 5)),
        fast_config(5),
    )
    .with_diagnostics(sink);

    let report = pipeline.run("family", 10).unwrap().collect_report().await;
    assert_eq!(report.titles.len(), 4);

    let events = drain(&mut events);
    assert!(matches!(
        events.first(),
        Some(DiagnosticEvent::RunStarted { max_records: 10, .. })
    ));
    assert!(matches!(
        events.last(),
        Some(DiagnosticEvent::RunFinished {
            emitted: 4,
            skipped: 0,
            stop_reason: StopReason::NoMoreResults,
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_into_stream_adapts_to_futures() {
    let pipeline = ExtractionPipeline::new(
        ReplayLauncher::new(catalog_site("animation", 6, 3)),
        fast_config(3),
    );

    let titles: Vec<_> = pipeline
        .run("animation", 4)
        .unwrap()
        .into_stream()
        .collect()
        .await;

    assert_eq!(titles.len(), 4);
    assert!(titles.iter().all(Result::is_ok));
}

#[tokio::test(start_paused = true)]
async fn test_sharded_queries_use_isolated_sessions() {
    let mut site = catalog_site("action", 4, 3);
    site.insert(
        search_page_url("heist", 1, 3),
        CannedPage::new(results_html(&["tt0000009", "tt0000001"], false)),
    );
    site.insert(detail_url("tt0000009"), MovieFixture::new("tt0000009").page());
    let launcher = ReplayLauncher::new(site);
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3));

    let results = run_sharded(&pipeline, &["action", "heist"], 10).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "action");
    assert_eq!(results[1].0, "heist");
    let action = results[0].1.as_ref().unwrap();
    let heist = results[1].1.as_ref().unwrap();
    assert_eq!(action.titles.len(), 4);
    let heist_ids: Vec<&str> = heist.titles.iter().map(|t| t.id()).collect();
    assert_eq!(heist_ids, vec!["tt0000009", "tt0000001"]);
    assert_eq!(probe.opened(), 2);
    assert_eq!(probe.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_with_session_closes_after_error() {
    let launcher = ReplayLauncher::new(ReplaySite::new());
    let probe = launcher.probe();
    let config = fast_config(3);

    let result: Result<(), ScrapeError> = with_session(&launcher, &config, |session| {
        async move {
            session.navigate("http://movies.test/missing").await
        }
        .boxed()
    })
    .await;

    assert!(matches!(result, Err(ScrapeError::Navigation { .. })));
    assert_eq!(probe.opened(), 1);
    assert_eq!(probe.closed(), 1);
    assert_eq!(probe.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_late_next_page_control_still_pages() {
    let script = PageScript::default().late_element("a.next-page", 1);
    let launcher = ReplayLauncher::new(catalog_site_with_search_script("drama", 9, 3, script));
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3));

    let report = pipeline.run("drama", 20).unwrap().collect_report().await;

    let ids: Vec<&str> = report.titles.iter().map(|t| t.id()).collect();
    assert_eq!(ids, movie_ids(9));
    assert_eq!(report.stop_reason, Some(StopReason::NoMoreResults));
    for page in 1..=3 {
        assert_eq!(probe.visits(&search_page_url("drama", page, 3)), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_half_rendered_list_is_read_in_full() {
    let script = PageScript::default().partial_polls(2);
    let launcher = ReplayLauncher::new(catalog_site_with_search_script("crime", 8, 4, script));
    let pipeline = ExtractionPipeline::new(launcher, fast_config(4));

    let report = pipeline.run("crime", 20).unwrap().collect_report().await;

    assert_eq!(report.titles.len(), 8);
    assert!(report.skipped.is_empty());
    assert_eq!(report.stop_reason, Some(StopReason::NoMoreResults));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_stops_before_retry() {
    let fixtures = movies(&["tt001", "tt002", "tt003"]);
    let mut site = single_page_site("saga", 3, &fixtures);
    site.insert(
        detail_url("tt002"),
        scripted(&fixtures[1], PageScript::default().blank_visits(10)),
    );
    let launcher = ReplayLauncher::new(site);
    let probe = launcher.probe();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3));
    let handle = pipeline.cancellation_handle();

    // First attempt on tt002 times out near 0.6s; its 1s backoff is still running at 1.2s
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1200)).await;
        handle.cancel();
    });

    let report = pipeline.run("saga", 10).unwrap().collect_report().await;
    canceller.await.unwrap();

    let ids: Vec<&str> = report.titles.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec!["tt001"]);
    assert_eq!(report.stop_reason, Some(StopReason::Cancelled));
    assert!(report.error.is_none());
    assert!(report.skipped.is_empty());
    assert_eq!(probe.visits(&detail_url("tt002")), 1);
    assert_eq!(probe.visits(&detail_url("tt003")), 0);
    assert_eq!(probe.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_detail_loads_are_retried() {
    let fixtures = movies(&["tt001", "tt002", "tt003"]);
    let mut site = single_page_site("heist", 3, &fixtures);
    site.insert(
        detail_url("tt002"),
        scripted(&fixtures[1], PageScript::default().failed_loads(2)),
    );
    let launcher = ReplayLauncher::new(site);
    let probe = launcher.probe();
    let (sink, mut events) = diagnostic_channel();
    let pipeline = ExtractionPipeline::new(launcher, fast_config(3)).with_diagnostics(sink);

    let report = pipeline.run("heist", 10).unwrap().collect_report().await;

    let ids: Vec<&str> = report.titles.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec!["tt001", "tt002", "tt003"]);
    assert!(report.skipped.is_empty());
    assert_eq!(probe.visits(&detail_url("tt002")), 3);

    let failures: Vec<Option<FailureKind>> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            DiagnosticEvent::Retrying { failure, .. } => Some(failure),
            _ => None,
        })
        .collect();
    assert_eq!(
        failures,
        vec![Some(FailureKind::Navigation), Some(FailureKind::Navigation)]
    );
}
