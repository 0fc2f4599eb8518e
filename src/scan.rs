//! Library discovery.
//!
//! Walks the music folder and groups audio files by their parent directory.
//! Each directory is one album for progress reporting.

use anyhow::{Context, Result};
use log::warn;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::models::AlbumBatch;

/// Extensions treated as audio tracks (compared lowercase).
pub const AUDIO_EXTS: &[&str] = &["mp3", "flac", "m4a", "ogg", "opus", "wav"];

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recursively collect audio files under `root`, grouped by directory.
/// Albums and tracks come back sorted by path.
///
/// The root itself must be readable; anything unreadable below it is logged
/// and skipped. Symlinks are not followed, which rules out cycles.
pub fn scan_library(root: &Path) -> Result<Vec<AlbumBatch>> {
    fs::read_dir(root)
        .with_context(|| format!("Failed to read music folder {}", root.display()))?;

    let mut grouped: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();

    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_audio_file(entry.path()) {
            continue;
        }
        let Some(dir) = entry.path().parent() else {
            continue;
        };
        grouped
            .entry(dir.to_path_buf())
            .or_default()
            .push(entry.into_path());
    }

    Ok(grouped
        .into_iter()
        .map(|(dir, mut tracks)| {
            tracks.sort();
            AlbumBatch {
                id: dir.display().to_string(),
                label: album_label(root, &dir),
                tracks,
            }
        })
        .collect())
}

/// "Artist/Album" relative to the library root, or the root's own name.
fn album_label(root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
        _ => root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string()),
    }
}
