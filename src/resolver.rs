//! Track resolution: identity and current lyric status for one audio file.
//!
//! Tag reading sits behind `MetadataReader` so the pipeline can be driven
//! by `LoftyReader` in production and by in-memory fixtures in tests.

use lofty::config::{ParseOptions, ParsingMode};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use log::debug;
use std::path::{Path, PathBuf};

use crate::models::{TrackIdentity, TrackQuery, TrackStatus};

/// Extension of the sidecar written next to each track.
pub const SIDECAR_EXT: &str = "lrc";

/// Raw tag values for one file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub duration_secs: Option<u64>,
    pub has_embedded_lyrics: bool,
}

/// Source of tag metadata. Returns None when the file cannot be parsed.
pub trait MetadataReader {
    fn read(&self, path: &Path) -> Option<TrackMetadata>;
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("could not read tags from {0}")]
    Unreadable(PathBuf),
    #[error("missing artist or title tag in {0}")]
    MissingTags(PathBuf),
}

/// Status plus the lookup query (absent for `HasSidecar` and `HasEmbedded`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTrack {
    pub status: TrackStatus,
    pub query: Option<TrackQuery>,
}

/// `.../Track.flac` -> `.../Track.lrc`
pub fn sidecar_path(track: &Path) -> PathBuf {
    track.with_extension(SIDECAR_EXT)
}

pub struct TrackResolver<M> {
    reader: M,
    overwrite: bool,
}

impl<M: MetadataReader> TrackResolver<M> {
    pub fn new(reader: M, overwrite: bool) -> Self {
        Self { reader, overwrite }
    }

    pub fn resolve(&self, path: &Path) -> Result<ResolvedTrack, ResolveError> {
        if !self.overwrite && sidecar_path(path).exists() {
            return Ok(ResolvedTrack {
                status: TrackStatus::HasSidecar,
                query: None,
            });
        }

        let meta = self
            .reader
            .read(path)
            .ok_or_else(|| ResolveError::Unreadable(path.to_path_buf()))?;

        // Embedded lyrics win over `overwrite` and over missing tags: the
        // file already has lyrics.
        if meta.has_embedded_lyrics {
            return Ok(ResolvedTrack {
                status: TrackStatus::HasEmbedded,
                query: None,
            });
        }

        let identity = TrackIdentity::new(
            meta.artist.as_deref().unwrap_or_default(),
            meta.title.as_deref().unwrap_or_default(),
            meta.album.as_deref(),
        )
        .ok_or_else(|| ResolveError::MissingTags(path.to_path_buf()))?;

        Ok(ResolvedTrack {
            status: TrackStatus::NeedsFetch,
            query: Some(TrackQuery {
                identity,
                duration_secs: meta.duration_secs,
            }),
        })
    }
}

// ============================================================================
// lofty-backed reader
// ============================================================================

/// Reads tags and duration with `lofty`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoftyReader;

fn first_non_empty<F>(primary: Option<&Tag>, tags: &[Tag], mut extractor: F) -> Option<String>
where
    F: FnMut(&Tag) -> Option<String>,
{
    primary
        .into_iter()
        .chain(tags.iter())
        .filter_map(|tag| extractor(tag))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

impl MetadataReader for LoftyReader {
    fn read(&self, path: &Path) -> Option<TrackMetadata> {
        let options = ParseOptions::new()
            .read_properties(true)
            .read_cover_art(false)
            .parsing_mode(ParsingMode::BestAttempt);

        let tagged_file = match Probe::open(path).and_then(|probe| probe.options(options).read()) {
            Ok(tagged_file) => tagged_file,
            Err(e) => {
                debug!("Metadata read failed for {}: {}", path.display(), e);
                return None;
            }
        };

        let primary = tagged_file.primary_tag();
        let tags = tagged_file.tags();

        let artist = first_non_empty(primary, tags, |tag| tag.artist().map(|v| v.into_owned()));
        let title = first_non_empty(primary, tags, |tag| tag.title().map(|v| v.into_owned()));
        let album = first_non_empty(primary, tags, |tag| tag.album().map(|v| v.into_owned()));
        let has_embedded_lyrics = first_non_empty(primary, tags, |tag| {
            tag.get_string(ItemKey::Lyrics).map(str::to_string)
        })
        .is_some();

        let duration = tagged_file.properties().duration().as_secs();

        Some(TrackMetadata {
            artist,
            title,
            album,
            duration_secs: (duration > 0).then_some(duration),
            has_embedded_lyrics,
        })
    }
}
