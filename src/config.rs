//! Run configuration.
//!
//! Built once by the binary from CLI flags and passed by reference into the
//! pipeline. Nothing reads configuration from global state.

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_CACHE_FILE;

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_API_URL: &str = "https://lrclib.net/api";
pub const DEFAULT_USER_AGENT: &str = concat!("lrc-fetch/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub music_folder: PathBuf,
    /// Replace existing `.lrc` sidecars. Embedded lyrics are never overridden.
    pub overwrite: bool,
    /// Accept plain lyrics when no synced lyrics exist.
    pub allow_unsynced: bool,
    pub workers: usize,
    pub request_timeout: Duration,
    pub cache_path: PathBuf,
    /// Skip live/remix/edit/karaoke/instrumental titles without a lookup.
    pub skip_variant_titles: bool,
    pub api_url: String,
    pub user_agent: String,
    /// Hide progress bars and print periodic log lines instead.
    pub log_only: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            music_folder: PathBuf::from("."),
            overwrite: false,
            allow_unsynced: false,
            workers: DEFAULT_WORKERS,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            skip_variant_titles: true,
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            log_only: false,
        }
    }
}

impl FetchConfig {
    /// Startup checks. Any error here is fatal for the run.
    pub fn validate(&self) -> Result<()> {
        if !self.music_folder.exists() {
            bail!("Path does not exist: {}", self.music_folder.display());
        }
        if !self.music_folder.is_dir() {
            bail!("Path is not a directory: {}", self.music_folder.display());
        }
        if self.workers == 0 {
            bail!("--workers must be at least 1");
        }
        if self.request_timeout.is_zero() {
            bail!("--timeout must be at least 1 second");
        }
        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                bail!(
                    "Failure cache directory does not exist: {}",
                    parent.display()
                );
            }
        }
        Ok(())
    }
}
