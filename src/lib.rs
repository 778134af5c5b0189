pub mod browser_profile;
pub mod browser_setup;
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod locator;
pub mod model;
pub mod navigation;
pub mod normalize;
pub mod pipeline;
pub mod session;
pub mod utils;

pub use browser_setup::{download_managed_browser, find_browser_executable, launch_browser};
pub use catalog::{DurationCategory, GenreSummary, TitleFilter};
pub use config::{ScrapeConfig, ScrapeConfigBuilder, SiteProfile};
pub use error::{FailureKind, ScrapeError, ScrapeResult};
pub use locator::{FieldSource, FieldSpec, LocateOptions};
pub use model::Title;
pub use navigation::{NavState, PageCursor, StopReason};
pub use normalize::{Anomaly, AnomalyReason, Normalized, RawTitle, normalize};
pub use pipeline::{
    CancellationHandle, DiagnosticEvent, DiagnosticSink, ExtractionPipeline, RunReport,
    TitleStream, diagnostic_channel, run_sharded,
};
pub use session::{
    ChromiumLauncher, ChromiumSession, PageSession, ReplayLauncher, SessionLauncher, with_session,
};
