//! Library-wide totals built from album summaries.

use std::path::PathBuf;
use std::time::Instant;

use crate::models::{AlbumSummary, RunSummary};

pub struct RunReporter {
    started: Instant,
    albums: usize,
    total: usize,
    downloaded: usize,
    failed: usize,
    skipped: usize,
    cached: usize,
}

impl RunReporter {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            albums: 0,
            total: 0,
            downloaded: 0,
            failed: 0,
            skipped: 0,
            cached: 0,
        }
    }

    pub fn add(&mut self, summary: AlbumSummary) {
        self.albums += 1;
        self.total += summary.total();
        self.downloaded += summary.success;
        self.failed += summary.failed;
        self.skipped += summary.skipped;
        self.cached += summary.cached;
    }

    pub fn albums(&self) -> usize {
        self.albums
    }

    pub fn finalize(self, cache_file: PathBuf, cache_warning: Option<String>) -> RunSummary {
        RunSummary {
            albums: self.albums,
            total: self.total,
            downloaded: self.downloaded,
            failed: self.failed,
            skipped: self.skipped,
            cached: self.cached,
            cache_file,
            cache_warning,
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        }
    }
}

impl Default for RunReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album(success: usize, failed: usize, skipped: usize, cached: usize) -> AlbumSummary {
        AlbumSummary {
            id: "id".to_string(),
            label: "label".to_string(),
            success,
            failed,
            skipped,
            cached,
        }
    }

    #[test]
    fn test_accumulates_albums() {
        let mut reporter = RunReporter::new();
        reporter.add(album(1, 0, 2, 0));
        reporter.add(album(0, 1, 3, 2));
        assert_eq!(reporter.albums(), 2);

        let summary = reporter.finalize(PathBuf::from("cache.json"), Some("disk full".into()));
        assert_eq!(summary.total, 7);
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 5);
        assert_eq!(summary.cached, 2);
        assert_eq!(summary.cache_warning.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_summary_serializes() {
        let summary = RunReporter::new().finalize(PathBuf::from("cache.json"), None);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total"], 0);
        assert_eq!(json["cache_file"], "cache.json");
        assert!(json["cache_warning"].is_null());
    }
}
