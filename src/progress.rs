//! Progress bar and logging utilities.
//!
//! Provides helpers for creating progress bars and spinners, with support
//! for log-only mode where progress bars are hidden for tail-friendly output.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::models::{AlbumSummary, TrackIdentity};

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}

/// Create a progress bar with consistent styling.
/// In log-only mode, the progress bar is hidden.
pub fn create_progress_bar(len: u64, msg: &str, log_only: bool) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if log_only {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
                .unwrap()
                .progress_chars("=> "),
        );
    }
    pb.set_message(msg.to_string());
    pb
}

/// Create a spinner for indeterminate progress.
/// In log-only mode, the spinner is hidden.
pub fn create_spinner(msg: &str, log_only: bool) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if log_only {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{msg} {spinner} [{elapsed_precise}]")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Human-readable sink for per-track and per-album lines.
/// Shared by reference across workers; `ProgressBar` is internally synchronized,
/// so lines never tear the bar or each other.
pub struct RunProgress {
    pb: ProgressBar,
    done: AtomicU64,
    total: u64,
    interval: u64,
    log_only: bool,
}

impl RunProgress {
    pub fn new(total: u64, log_only: bool) -> Self {
        Self {
            pb: create_progress_bar(total, "Fetching lyrics", log_only),
            done: AtomicU64::new(0),
            total,
            interval: (total / 20).max(1),
            log_only,
        }
    }

    fn line(&self, msg: String) {
        if self.log_only {
            eprintln!("{}", msg);
        } else {
            self.pb.println(msg);
        }
    }

    /// Advance by one finished track. Returns the number of finished tracks.
    pub fn track_done(&self) -> u64 {
        // Each caller gets its own count, so every milestone is logged once
        let current = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        self.pb.inc(1);
        // Log progress periodically for tail-friendly output
        if self.log_only && self.is_milestone(current) {
            let pct = 100.0 * current as f64 / self.total.max(1) as f64;
            eprintln!("[FETCH] {}/{} ({:.1}%)", current, self.total, pct);
        }
        current
    }

    fn is_milestone(&self, current: u64) -> bool {
        current % self.interval == 0 || current == self.total
    }

    pub fn success(&self, identity: &TrackIdentity, synced: bool) {
        let kind = if synced { "" } else { " (unsynced)" };
        self.line(format!("✔ SUCCESS | {}{}", identity, kind));
    }

    pub fn failed(&self, what: &str, reason: &str) {
        self.line(format!("✖ FAILED  | {} ({})", what, reason));
    }

    pub fn album_done(&self, summary: &AlbumSummary) {
        self.line(format!(
            "▸ ALBUM   | {} · {} ok · {} failed · {} skipped",
            summary.label, summary.success, summary.failed, summary.skipped
        ));
    }

    pub fn finish(&self) {
        self.pb.finish_with_message("Fetching lyrics done");
    }
}
