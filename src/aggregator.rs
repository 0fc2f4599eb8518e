//! Album-scoped outcome aggregation.
//!
//! Workers report outcomes tagged with their album. Tallies are atomics; the
//! completed-track counter is bumped last with one `fetch_add`, and only the
//! worker whose increment reaches the expected count builds and emits the
//! summary. That gives exactly-once emission without a lock on the hot path.

use crossbeam_channel::Sender;
use log::warn;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::models::{AlbumSummary, FetchOutcome, SkipReason};

struct AlbumCounters {
    label: String,
    expected: usize,
    success: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    cached: AtomicUsize,
    completed: AtomicUsize,
}

impl AlbumCounters {
    fn new(label: &str, expected: usize) -> Self {
        Self {
            label: label.to_string(),
            expected,
            success: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            cached: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    fn summary(&self, id: &str) -> AlbumSummary {
        AlbumSummary {
            id: id.to_string(),
            label: self.label.clone(),
            success: self.success.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            skipped: self.skipped.load(Ordering::Acquire),
            cached: self.cached.load(Ordering::Acquire),
        }
    }
}

pub struct AlbumAggregator {
    albums: RwLock<FxHashMap<String, Arc<AlbumCounters>>>,
    sink: Sender<AlbumSummary>,
}

impl AlbumAggregator {
    /// Finalized summaries are sent to `sink`.
    pub fn new(sink: Sender<AlbumSummary>) -> Self {
        Self {
            albums: RwLock::new(FxHashMap::default()),
            sink,
        }
    }

    /// Register an album before any of its tracks are dispatched.
    /// An album with no tracks is emitted immediately.
    ///
    /// Returns false, leaving the existing counters untouched, when `album_id`
    /// is already registered.
    pub fn begin_album(&self, album_id: &str, label: &str, expected_tracks: usize) -> bool {
        let mut albums = self
            .albums
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if albums.contains_key(album_id) {
            warn!("Album {} registered twice, ignoring", album_id);
            return false;
        }
        let counters = Arc::new(AlbumCounters::new(label, expected_tracks));
        if expected_tracks == 0 {
            // Kept in the map so a repeated id is still rejected
            let summary = counters.summary(album_id);
            albums.insert(album_id.to_string(), counters);
            drop(albums);
            self.emit(summary);
            return true;
        }
        albums.insert(album_id.to_string(), counters);
        true
    }

    /// Record one outcome. Returns true if this call finalized the album.
    pub fn record(&self, album_id: &str, outcome: FetchOutcome) -> bool {
        // Clone the Arc so the map lock is released before touching counters
        let counters = {
            let albums = self
                .albums
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match albums.get(album_id) {
                Some(counters) => Arc::clone(counters),
                None => {
                    warn!("Outcome for unregistered album {} dropped", album_id);
                    return false;
                }
            }
        };

        match outcome {
            FetchOutcome::Success => counters.success.fetch_add(1, Ordering::Relaxed),
            FetchOutcome::Failed => counters.failed.fetch_add(1, Ordering::Relaxed),
            FetchOutcome::Skipped(reason) => {
                if reason == SkipReason::CachedFailure {
                    counters.cached.fetch_add(1, Ordering::Relaxed);
                }
                counters.skipped.fetch_add(1, Ordering::Relaxed)
            }
        };

        // AcqRel: the finalizing worker observes every tally made before each
        // earlier increment of `completed`.
        let done = counters.completed.fetch_add(1, Ordering::AcqRel) + 1;
        if done < counters.expected {
            return false;
        }
        if done > counters.expected {
            warn!(
                "Album {} received {} outcomes, expected {}",
                album_id, done, counters.expected
            );
            return false;
        }

        self.emit(counters.summary(album_id));
        true
    }

    fn emit(&self, summary: AlbumSummary) {
        if self.sink.send(summary).is_err() {
            warn!("Album summary receiver dropped");
        }
    }
}
