//! Durable failure cache.
//!
//! Remembers identities whose lookup came back empty so later runs skip
//! the network call. The file is a JSON array of "artist|title|album" keys.
//! Deleting the file resets all failure memory.

use log::{debug, warn};
use rustc_hash::FxHashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::models::TrackIdentity;

/// Default cache location, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = ".failed_lyrics_cache.json";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to serialize failure cache: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write failure cache {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Mutex-guarded set of failed identities.
/// All reads and writes go through one lock; the set is never handed out.
pub struct FailureCache {
    path: PathBuf,
    keys: Mutex<FxHashSet<String>>,
}

impl FailureCache {
    /// Empty cache that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            keys: Mutex::new(FxHashSet::default()),
        }
    }

    /// Load prior failures from `path`.
    /// A missing, unreadable, or corrupt file yields an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let keys = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Vec<String>>(&text) {
                Ok(entries) => entries.into_iter().collect(),
                Err(e) => {
                    warn!("Ignoring corrupt failure cache {}: {}", path.display(), e);
                    FxHashSet::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No failure cache at {}, starting empty", path.display());
                FxHashSet::default()
            }
            Err(e) => {
                warn!("Could not read failure cache {}: {}", path.display(), e);
                FxHashSet::default()
            }
        };
        debug!("Loaded {} failure cache entries", keys.len());
        Self {
            path,
            keys: Mutex::new(keys),
        }
    }

    // A worker that panicked while holding the lock cannot leave the set
    // half-written (insert/remove are single operations), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, FxHashSet<String>> {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, identity: &TrackIdentity) -> bool {
        self.lock().contains(&identity.cache_key())
    }

    /// Record a failed lookup. Returns true if the identity was not cached yet.
    pub fn record_failure(&self, identity: &TrackIdentity) -> bool {
        let key = identity.cache_key();
        self.lock().insert(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sorted snapshot of all keys.
    pub fn entries(&self) -> Vec<String> {
        let mut entries: Vec<String> = self.lock().iter().cloned().collect();
        entries.sort();
        entries
    }

    /// Remove every key containing `pattern` (case-insensitive).
    /// Returns the number of keys removed.
    pub fn forget(&self, pattern: &str) -> usize {
        let needle = pattern.to_lowercase();
        let mut keys = self.lock();
        let before = keys.len();
        keys.retain(|k| !k.to_lowercase().contains(&needle));
        before - keys.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Write the full key set back to disk, replacing prior content.
    /// The snapshot is taken under the lock; the file write happens outside it.
    pub fn persist(&self) -> Result<(), CacheError> {
        let entries = self.entries();
        let json = serde_json::to_string_pretty(&entries)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| CacheError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| CacheError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            "Persisted {} failure cache entries to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_path(name: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be valid")
            .as_nanos();
        std::env::temp_dir().join(format!("lrc_fetch_{name}_{nonce}.json"))
    }

    fn identity(artist: &str, title: &str) -> TrackIdentity {
        TrackIdentity::new(artist, title, Some("Album")).unwrap()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let cache = FailureCache::load(unique_temp_path("missing"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let path = unique_temp_path("corrupt");
        fs::write(&path, "{ not json").unwrap();
        let cache = FailureCache::load(&path);
        assert!(cache.is_empty());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_record_failure_is_idempotent() {
        let cache = FailureCache::empty(unique_temp_path("idempotent"));
        let id = identity("Artist", "Song");
        assert!(cache.record_failure(&id));
        assert!(!cache.record_failure(&id));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&id));
        assert!(!cache.contains(&identity("Artist", "Other")));
    }

    #[test]
    fn test_separator_in_field_does_not_collide() {
        let cache = FailureCache::empty(unique_temp_path("separator"));
        cache.record_failure(&identity("A|B", "C"));
        assert!(cache.contains(&identity("A|B", "C")));
        assert!(!cache.contains(&identity("A", "B|C")));
    }

    #[test]
    fn test_persist_and_reload() {
        let path = unique_temp_path("roundtrip");
        let cache = FailureCache::empty(&path);
        cache.record_failure(&identity("B Artist", "Song"));
        cache.record_failure(&identity("A Artist", "Song"));
        cache.persist().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let on_disk: Vec<String> = serde_json::from_str(&text).unwrap();
        assert_eq!(on_disk, vec!["A Artist|Song|Album", "B Artist|Song|Album"]);

        let reloaded = FailureCache::load(&path);
        assert!(reloaded.contains(&identity("A Artist", "Song")));
        assert_eq!(reloaded.len(), 2);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_persist_without_changes() {
        let path = unique_temp_path("unchanged");
        let cache = FailureCache::empty(&path);
        cache.persist().unwrap();
        cache.persist().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_persist_to_missing_directory_fails() {
        let path = unique_temp_path("nodir").join("cache.json");
        let cache = FailureCache::empty(&path);
        assert!(matches!(cache.persist(), Err(CacheError::Write { .. })));
    }

    #[test]
    fn test_forget_and_clear() {
        let cache = FailureCache::empty(unique_temp_path("forget"));
        cache.record_failure(&identity("Radiohead", "Creep"));
        cache.record_failure(&identity("Radiohead", "Airbag"));
        cache.record_failure(&identity("Portishead", "Roads"));
        assert_eq!(cache.forget("radiohead"), 2);
        assert_eq!(cache.entries(), vec!["Portishead|Roads|Album"]);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_record_failure() {
        let cache = Arc::new(FailureCache::empty(unique_temp_path("concurrent")));
        let identities: Arc<Vec<TrackIdentity>> = Arc::new(
            (0..50)
                .map(|i| identity("Artist", &format!("Song {i}")))
                .collect(),
        );

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                let identities = Arc::clone(&identities);
                thread::spawn(move || {
                    // Each worker walks the list from a different offset
                    for i in 0..identities.len() {
                        let id = &identities[(i + worker * 7) % identities.len()];
                        if !cache.contains(id) {
                            cache.record_failure(id);
                        }
                        cache.record_failure(id);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = cache.entries();
        assert_eq!(entries.len(), 50);
        for id in identities.iter() {
            assert!(cache.contains(id));
        }
    }
}
