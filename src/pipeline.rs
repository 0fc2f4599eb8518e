//! Concurrent fetch pipeline.
//!
//! Tracks are queued on a crossbeam channel and drained by `workers` tasks on
//! a dedicated rayon pool. The driver thread feeds the queue and collects
//! album summaries inside `in_place_scope`, so it never occupies a pool thread.
//!
//! Per track:
//! 1. resolve status (sidecar / embedded lyrics skip without network)
//! 2. skip variant titles when enabled
//! 3. skip identities already in the failure cache
//! 4. look up, then write `<stem>.lrc` on a hit or cache the miss
//!
//! Errors and panics stay inside the track that raised them and become
//! `FetchOutcome::Failed`.

use anyhow::{bail, Context, Result};
use crossbeam_channel::unbounded;
use log::{debug, warn};
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use crate::aggregator::AlbumAggregator;
use crate::cache::FailureCache;
use crate::client::{LyricsLookup, LyricsResult};
use crate::config::FetchConfig;
use crate::models::{AlbumBatch, FetchOutcome, RunSummary, SkipReason, TrackStatus};
use crate::normalize::is_variant_title;
use crate::progress::RunProgress;
use crate::reporter::RunReporter;
use crate::resolver::{sidecar_path, MetadataReader, ResolveError, TrackResolver};

/// Errors contained at the per-track boundary.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

struct TrackJob<'a> {
    album_id: &'a str,
    path: &'a Path,
}

pub struct FetchPipeline<M, C> {
    config: FetchConfig,
    resolver: TrackResolver<M>,
    client: C,
    cache: FailureCache,
}

impl<M, C> FetchPipeline<M, C>
where
    M: MetadataReader + Sync,
    C: LyricsLookup + Sync,
{
    pub fn new(config: FetchConfig, reader: M, client: C, cache: FailureCache) -> Self {
        let resolver = TrackResolver::new(reader, config.overwrite);
        Self {
            config,
            resolver,
            client,
            cache,
        }
    }

    pub fn cache(&self) -> &FailureCache {
        &self.cache
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Process every track of every album, then persist the failure cache.
    ///
    /// Returns once each submitted track has produced exactly one outcome and
    /// every album summary has been collected. Album ids must be unique; a
    /// repeated id is rejected before any track is dispatched.
    pub fn run(&self, albums: &[AlbumBatch]) -> Result<RunSummary> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("lrc-worker-{i}"))
            .build()
            .context("Failed to build worker pool")?;

        let (summary_tx, summary_rx) = unbounded();
        let aggregator = AlbumAggregator::new(summary_tx);
        for album in albums {
            if !aggregator.begin_album(&album.id, &album.label, album.tracks.len()) {
                bail!("Duplicate album id {}", album.id);
            }
        }

        let total_tracks: usize = albums.iter().map(|a| a.tracks.len()).sum();
        let progress = RunProgress::new(total_tracks as u64, self.config.log_only);
        let mut reporter = RunReporter::new();

        let (job_tx, job_rx) = unbounded::<TrackJob<'_>>();

        pool.in_place_scope(|scope| {
            let aggregator = &aggregator;
            let progress = &progress;
            for _ in 0..self.config.workers {
                let job_rx = job_rx.clone();
                scope.spawn(move |_| {
                    for job in job_rx.iter() {
                        let outcome = self.process_track_guarded(job.path, progress);
                        aggregator.record(job.album_id, outcome);
                        progress.track_done();
                    }
                });
            }

            for album in albums {
                for path in &album.tracks {
                    let job = TrackJob {
                        album_id: &album.id,
                        path,
                    };
                    if job_tx.send(job).is_err() {
                        warn!("Worker queue closed early");
                        break;
                    }
                }
            }
            // Closing the queue lets workers exit once in-flight tracks finish
            drop(job_tx);

            for summary in summary_rx.iter().take(albums.len()) {
                progress.album_done(&summary);
                reporter.add(summary);
            }
        });
        progress.finish();

        let cache_warning = match self.cache.persist() {
            Ok(()) => None,
            Err(e) => {
                warn!("{}", e);
                Some(e.to_string())
            }
        };

        Ok(reporter.finalize(self.cache.path().to_path_buf(), cache_warning))
    }

    /// Process one track, converting panics into `Failed`.
    fn process_track_guarded(&self, path: &Path, progress: &RunProgress) -> FetchOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.process_track(path, progress))) {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Worker panicked while processing {}", path.display());
                progress.failed(&path.display().to_string(), "internal error");
                FetchOutcome::Failed
            }
        }
    }

    /// Process one track and report the human-readable result.
    pub fn process_track(&self, path: &Path, progress: &RunProgress) -> FetchOutcome {
        match self.try_process_track(path, progress) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("Track failed: {}", e);
                progress.failed(&path.display().to_string(), &e.to_string());
                FetchOutcome::Failed
            }
        }
    }

    fn try_process_track(
        &self,
        path: &Path,
        progress: &RunProgress,
    ) -> Result<FetchOutcome, TrackError> {
        let resolved = self.resolver.resolve(path)?;
        let query = match (resolved.status, resolved.query) {
            (TrackStatus::HasSidecar, _) => return Ok(FetchOutcome::Skipped(SkipReason::Sidecar)),
            (TrackStatus::HasEmbedded, _) => {
                return Ok(FetchOutcome::Skipped(SkipReason::Embedded))
            }
            (TrackStatus::NeedsFetch, Some(query)) => query,
            (TrackStatus::NeedsFetch, None) => {
                return Err(ResolveError::MissingTags(path.to_path_buf()).into())
            }
        };

        if self.config.skip_variant_titles && is_variant_title(query.identity.title()) {
            debug!("Skipping variant title {}", query.identity);
            return Ok(FetchOutcome::Skipped(SkipReason::VariantTitle));
        }

        if self.cache.contains(&query.identity) {
            debug!("Cached failure, skipping {}", query.identity);
            return Ok(FetchOutcome::Skipped(SkipReason::CachedFailure));
        }

        // No lock is held here: the cache check above and the record below
        // each take the mutex only for the in-memory operation.
        let (text, synced) = match self.client.lookup(&query, self.config.allow_unsynced) {
            LyricsResult::SyncedFound(text) => (text, true),
            LyricsResult::UnsyncedFound(text) => (text, false),
            LyricsResult::NotFound => {
                self.cache.record_failure(&query.identity);
                progress.failed(&query.identity.to_string(), "no lyrics found");
                return Ok(FetchOutcome::Failed);
            }
        };

        // A write failure is not a lookup failure: no cache entry, so the
        // next run retries.
        let target = sidecar_path(path);
        fs::write(&target, text).map_err(|source| TrackError::Write {
            path: target.clone(),
            source,
        })?;

        progress.success(&query.identity, synced);
        Ok(FetchOutcome::Success)
    }
}
