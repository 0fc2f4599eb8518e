//! Core data models for the lyrics fetch pipeline.
//!
//! This module contains the identity, status, and outcome types that flow
//! between the resolver, the worker pool, and the reporting layer.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::normalize::normalize_field;

/// Album name used when a track carries no album tag.
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

// ============================================================================
// Track Identity
// ============================================================================

/// Normalized (artist, title, album) triple.
/// Used both as the failure cache key and as the lookup query, so the
/// fields are normalized once here and never touched again.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrackIdentity {
    artist: String,
    title: String,
    album: String,
}

impl TrackIdentity {
    /// Build an identity from raw tag values.
    /// Returns None when artist or title is blank after normalization.
    pub fn new(artist: &str, title: &str, album: Option<&str>) -> Option<Self> {
        let artist = normalize_field(artist);
        let title = normalize_field(title);
        if artist.is_empty() || title.is_empty() {
            return None;
        }
        let album = album
            .map(normalize_field)
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());
        Some(Self {
            artist,
            title,
            album,
        })
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn album(&self) -> &str {
        &self.album
    }

    /// Stable failure cache key: "artist|title|album".
    /// `\` and `|` inside a field are backslash-escaped, so distinct
    /// identities never share a key.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}",
            escape_key_field(&self.artist),
            escape_key_field(&self.title),
            escape_key_field(&self.album)
        )
    }
}

fn escape_key_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        if c == '\\' || c == '|' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for TrackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} · {} · {}", self.artist, self.album, self.title)
    }
}

/// What the lyrics client sends to the remote service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackQuery {
    pub identity: TrackIdentity,
    pub duration_secs: Option<u64>,
}

// ============================================================================
// Per-track Status and Outcome
// ============================================================================

/// Lyric status of a track on disk. Computed per track, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    HasSidecar,
    HasEmbedded,
    NeedsFetch,
}

/// Why a track was skipped without a successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A `.lrc` file already sits next to the track.
    Sidecar,
    /// The audio file carries its own lyrics tag.
    Embedded,
    /// Title marks a live/remix/karaoke variant.
    VariantTitle,
    /// An earlier run already failed to find lyrics for this identity.
    CachedFailure,
}

/// Result of processing one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    Failed,
    Skipped(SkipReason),
}

// ============================================================================
// Library Layout
// ============================================================================

/// All tracks under one directory, processed and reported as a unit.
#[derive(Clone, Debug)]
pub struct AlbumBatch {
    /// Directory path, unique per album.
    pub id: String,
    /// Short human-readable name (usually "Artist/Album").
    pub label: String,
    pub tracks: Vec<PathBuf>,
}

// ============================================================================
// Summaries
// ============================================================================

/// Final tallies for one album. Read-only once emitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AlbumSummary {
    pub id: String,
    pub label: String,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Skips caused by the failure cache (subset of `skipped`)
    pub cached: usize,
}

impl AlbumSummary {
    pub fn total(&self) -> usize {
        self.success + self.failed + self.skipped
    }
}

/// Library-wide totals for one run.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub albums: usize,
    pub total: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cached: usize,
    pub cache_file: PathBuf,
    pub cache_warning: Option<String>,
    pub elapsed_secs: f64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===== LRC FETCH SUMMARY =====")?;
        writeln!(f, "Albums           : {}", self.albums)?;
        writeln!(f, "Total tracks     : {}", self.total)?;
        writeln!(f, "Downloaded LRCs  : {}", self.downloaded)?;
        writeln!(f, "Failed lookups   : {}", self.failed)?;
        writeln!(f, "Skipped tracks   : {} ({} via failure cache)", self.skipped, self.cached)?;
        writeln!(f, "Failure cache    : {}", self.cache_file.display())?;
        if let Some(warning) = &self.cache_warning {
            writeln!(f, "Cache warning    : {}", warning)?;
        }
        write!(f, "=============================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_requires_artist_and_title() {
        assert!(TrackIdentity::new("", "Song", Some("Album")).is_none());
        assert!(TrackIdentity::new("Artist", "   ", Some("Album")).is_none());
        assert!(TrackIdentity::new("Artist", "Song", None).is_some());
    }

    #[test]
    fn test_identity_defaults_album() {
        let id = TrackIdentity::new("Artist", "Song", Some("  ")).unwrap();
        assert_eq!(id.album(), UNKNOWN_ALBUM);
    }

    #[test]
    fn test_cache_key_uses_normalized_fields() {
        let a = TrackIdentity::new("  The  Band ", "Song\u{2019}s", Some("Album")).unwrap();
        let b = TrackIdentity::new("The Band", "Song's", Some("Album ")).unwrap();
        assert_eq!(a.cache_key(), "The Band|Song's|Album");
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_escapes_separator() {
        let a = TrackIdentity::new("A|B", "C", Some("D")).unwrap();
        let b = TrackIdentity::new("A", "B|C", Some("D")).unwrap();
        assert_ne!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "A\\|B|C|D");

        let slash = TrackIdentity::new("A\\", "|B", Some("D")).unwrap();
        let pipe = TrackIdentity::new("A\\|", "B", Some("D")).unwrap();
        assert_ne!(slash.cache_key(), pipe.cache_key());
    }

    #[test]
    fn test_run_summary_display() {
        let summary = RunSummary {
            albums: 2,
            total: 4,
            downloaded: 1,
            failed: 1,
            skipped: 2,
            cached: 0,
            cache_file: PathBuf::from(".failed_lyrics_cache.json"),
            cache_warning: None,
            elapsed_secs: 0.5,
        };
        let text = summary.to_string();
        assert!(text.contains("Total tracks     : 4"));
        assert!(text.contains("Downloaded LRCs  : 1"));
        assert!(!text.contains("Cache warning"));
    }
}
