//! Locating, fetching and launching the Chrome binary that backs a session.

use anyhow::{Context, Result, anyhow};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::config::ScrapeConfig;

/// Environment variable that overrides install-location discovery
const CHROMIUM_ENV: &str = "CHROMIUM_PATH";

/// Binary names probed on `PATH` as the last resort
const PATH_COMMANDS: [&str; 4] = ["chromium", "chromium-browser", "google-chrome", "chrome"];

/// Flags applied to every scraping session
const SESSION_FLAGS: [&str; 8] = [
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-notifications",
    "--disable-popup-blocking",
    "--disable-background-networking",
    "--disable-extensions",
    "--hide-scrollbars",
    "--mute-audio",
];

#[cfg(target_os = "windows")]
const INSTALL_LOCATIONS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"%LOCALAPPDATA%\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Chromium\Application\chrome.exe",
];

#[cfg(target_os = "macos")]
const INSTALL_LOCATIONS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "~/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/homebrew/bin/chromium",
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const INSTALL_LOCATIONS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/usr/local/bin/chromium",
    "/opt/google/chrome/chrome",
];

/// Where a candidate binary came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BrowserSource {
    Configured,
    Environment,
    InstallLocation,
    SearchPath,
}

impl fmt::Display for BrowserSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configured => "configured chromium_path",
            Self::Environment => CHROMIUM_ENV,
            Self::InstallLocation => "install location",
            Self::SearchPath => "PATH lookup",
        })
    }
}

/// Turn an install-location entry into a concrete path
///
/// `~/` needs a home directory; `%VAR%` tokens are expanded on Windows only.
fn resolve_location(entry: &str) -> Option<PathBuf> {
    if let Some(rest) = entry.strip_prefix("~/") {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    if cfg!(target_os = "windows") && entry.contains('%') {
        return Some(PathBuf::from(expand_windows_env_vars(entry, |name| {
            std::env::var(name).ok()
        })));
    }
    Some(PathBuf::from(entry))
}

/// Ask `which` for a binary on `PATH`
fn which(command: &str) -> Option<PathBuf> {
    let output = Command::new("which").arg(command).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!found.is_empty()).then(|| PathBuf::from(found))
}

/// Ordered candidates, each tagged with its source
///
/// Lazy so that `which` only runs once every file-based source is exhausted.
fn candidates(explicit: Option<&Path>) -> impl Iterator<Item = (BrowserSource, PathBuf)> + '_ {
    let configured = explicit
        .map(Path::to_path_buf)
        .map(|p| (BrowserSource::Configured, p));
    let from_env = std::env::var_os(CHROMIUM_ENV)
        .map(PathBuf::from)
        .map(|p| (BrowserSource::Environment, p));
    let installed = INSTALL_LOCATIONS
        .iter()
        .filter_map(|entry| resolve_location(entry))
        .map(|p| (BrowserSource::InstallLocation, p));
    let on_path = PATH_COMMANDS
        .iter()
        .filter(|_| !cfg!(target_os = "windows"))
        .filter_map(|cmd| which(cmd))
        .map(|p| (BrowserSource::SearchPath, p));

    configured
        .into_iter()
        .chain(from_env)
        .chain(installed)
        .chain(on_path)
}

/// Locate a Chrome or Chromium binary
///
/// Order: the configured path, `CHROMIUM_PATH`, known install locations for
/// the host platform, then `which`. Missing configured or env paths are
/// logged and skipped.
pub fn find_browser_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    for (source, path) in candidates(explicit) {
        // `which` only reports binaries that exist
        if source == BrowserSource::SearchPath || path.exists() {
            info!(source = %source, path = %path.display(), "browser located");
            return Ok(path);
        }
        match source {
            BrowserSource::Configured | BrowserSource::Environment => {
                warn!(source = %source, path = %path.display(), "browser path missing, skipping");
            }
            _ => trace!(path = %path.display(), "no browser here"),
        }
    }

    Err(anyhow!("no Chrome or Chromium binary found on this host"))
}

/// Expand `%VAR%` tokens through `lookup`; unknown variables are left as written
fn expand_windows_env_vars(path: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;

    while let Some(open) = rest.find('%') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('%') else {
            // Unterminated token stays as written
            out.push_str(&rest[open..]);
            return out;
        };

        let name = &after[..close];
        if name.is_empty() {
            out.push('%');
        } else if let Some(value) = lookup(name) {
            out.push_str(&value);
        } else {
            out.push('%');
            out.push_str(name);
            out.push('%');
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

/// Directory that holds the managed Chromium download
fn managed_browser_dir() -> PathBuf {
    let root = dirs::cache_dir().unwrap_or_else(|| {
        let tmp = std::env::temp_dir();
        warn!(fallback = %tmp.display(), "no user cache directory, using temp dir");
        tmp
    });
    root.join("cinescrape").join("chromium")
}

/// Download a managed Chromium into the user cache directory
pub async fn download_managed_browser() -> Result<PathBuf> {
    let target = managed_browser_dir();
    info!(dir = %target.display(), "fetching managed Chromium");

    tokio::fs::create_dir_all(&target)
        .await
        .with_context(|| format!("creating {}", target.display()))?;

    let options = BrowserFetcherOptions::builder()
        .with_path(&target)
        .build()
        .context("invalid browser fetcher options")?;
    let installed = BrowserFetcher::new(options)
        .fetch()
        .await
        .context("Chromium download failed")?;

    info!(
        folder = %installed.folder_path.display(),
        "managed Chromium ready"
    );
    Ok(installed.executable_path)
}

/// Host binary first, managed download second when the config allows it
async fn resolve_executable(config: &ScrapeConfig) -> Result<PathBuf> {
    let missing = match find_browser_executable(config.chromium_path()) {
        Ok(path) => return Ok(path),
        Err(e) => e,
    };
    if !config.allow_browser_download() {
        return Err(missing.context("browser download disabled by configuration"));
    }
    warn!(reason = %missing, "falling back to a managed Chromium download");
    download_managed_browser().await
}

/// Chrome emits CDP events chromiumoxide cannot deserialize; those are noise
fn is_benign_cdp_error(message: &str) -> bool {
    message.contains("data did not match any variant of untagged enum Message")
        || message.contains("Failed to deserialize WS response")
}

/// Start one Chrome process for a scraping session
///
/// The returned handler task drives the CDP connection; abort it after the
/// browser closes. `user_data_dir` belongs to the caller and must outlive
/// the process.
pub async fn launch_browser(
    config: &ScrapeConfig,
    user_data_dir: &Path,
) -> Result<(Browser, JoinHandle<()>)> {
    let executable = resolve_executable(config).await?;
    let (width, height) = config.window_size();

    let builder = BrowserConfigBuilder::default()
        .chrome_executable(&executable)
        .user_data_dir(user_data_dir)
        .window_size(width, height)
        .request_timeout(config.render_timeout())
        .arg(format!("--user-agent={}", config.user_agent()));
    let builder = SESSION_FLAGS.iter().fold(builder, |b, flag| b.arg(*flag));
    let builder = if config.headless() {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    let browser_config = builder
        .build()
        .map_err(|e| anyhow!("browser config rejected: {e}"))?;

    debug!(
        executable = %executable.display(),
        profile = %user_data_dir.display(),
        headless = config.headless(),
        "launching Chrome"
    );
    let (browser, mut events) = Browser::launch(browser_config)
        .await
        .with_context(|| format!("launching {}", executable.display()))?;

    let handler = task::spawn(async move {
        while let Some(event) = events.next().await {
            let Err(e) = event else { continue };
            let message = e.to_string();
            if is_benign_cdp_error(&message) {
                trace!(%message, "ignored CDP decode error");
            } else {
                error!(error = ?e, "CDP handler error");
            }
        }
        debug!("CDP handler loop ended");
    });

    Ok((browser, handler))
}
