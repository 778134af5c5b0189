//! Per-session Chrome profile directories
//!
//! Each session launches Chrome against a fresh UUID-named profile, so
//! concurrent sessions never fight over the same SingletonLock.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix of every profile directory created by this crate
pub const PROFILE_PREFIX: &str = "cinescrape_chrome_";

/// Profile directory owned by one session, deleted on drop
///
/// Drop it only after the Chrome process has exited; Chrome holds files in
/// the profile open until then.
#[derive(Debug)]
pub struct BrowserProfile {
    dir: PathBuf,
}

impl BrowserProfile {
    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if !self.dir.exists() {
            return;
        }
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!(profile = %self.dir.display(), "profile removed"),
            Err(e) => warn!(
                profile = %self.dir.display(),
                error = %e,
                "profile left behind, remove it by hand"
            ),
        }
    }
}

/// Make a fresh profile directory under `parent`
pub fn create_unique_profile(parent: &Path) -> Result<BrowserProfile> {
    std::fs::create_dir_all(parent)
        .with_context(|| format!("creating profile root {}", parent.display()))?;

    let dir = parent.join(format!("{PROFILE_PREFIX}{}", Uuid::new_v4()));
    // Not create_dir_all: an existing directory must be an error
    std::fs::create_dir(&dir).with_context(|| format!("creating profile {}", dir.display()))?;

    debug!(profile = %dir.display(), "profile created");
    Ok(BrowserProfile { dir })
}
