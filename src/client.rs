//! LRCLIB lookup client.
//!
//! One HTTP request per lookup, no retries. Every technical failure is kept
//! apart from "no lyrics" as a `LookupError`, then folded into
//! `LyricsResult::NotFound` by `LyricsLookup::lookup`. That folding is the
//! policy: a failed lookup is cached and not retried until the cache is cleared.

use log::{debug, warn};
use serde::Deserialize;
use std::io;

use crate::config::FetchConfig;
use crate::models::TrackQuery;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LyricsResult {
    SyncedFound(String),
    UnsyncedFound(String),
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("service returned HTTP {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl LookupError {
    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::Timeout(_) => "timeout",
            LookupError::Status(_) => "status",
            LookupError::Transport(_) => "transport",
            LookupError::Malformed(_) => "malformed",
        }
    }

    fn from_ureq(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Status(code, _) => LookupError::Status(code),
            ureq::Error::Transport(transport) => {
                let message = transport.to_string();
                let lowered = message.to_ascii_lowercase();
                if lowered.contains("timed out") || lowered.contains("timeout") {
                    LookupError::Timeout(message)
                } else {
                    LookupError::Transport(message)
                }
            }
        }
    }

    fn from_body_read(error: io::Error) -> Self {
        if matches!(error.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
            LookupError::Timeout(error.to_string())
        } else {
            LookupError::Malformed(error.to_string())
        }
    }
}

/// A lyrics source the worker pool can query.
pub trait LyricsLookup {
    /// Single lookup with technical failures kept distinct.
    fn try_lookup(
        &self,
        query: &TrackQuery,
        allow_unsynced: bool,
    ) -> Result<LyricsResult, LookupError>;

    /// Single lookup with every error normalized to `NotFound`.
    fn lookup(&self, query: &TrackQuery, allow_unsynced: bool) -> LyricsResult {
        match self.try_lookup(query, allow_unsynced) {
            Ok(result) => result,
            Err(e) => {
                warn!("Lookup {} for {}: {}", e.kind(), query.identity, e);
                LyricsResult::NotFound
            }
        }
    }
}

// ============================================================================
// LRCLIB wire format
// ============================================================================

/// One record from `GET /api/search`. Only the fields we use.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LrclibRecord {
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub synced_lyrics: Option<String>,
    #[serde(default)]
    pub plain_lyrics: Option<String>,
}

fn non_blank(text: &Option<String>) -> Option<&String> {
    text.as_ref().filter(|t| !t.trim().is_empty())
}

/// Pick lyrics from search results.
///
/// Synced lyrics from any record beat plain lyrics from every record. When the
/// track duration is known, records closer in duration are tried first;
/// otherwise the service's order is kept.
pub fn select_lyrics(
    records: &[LrclibRecord],
    duration_secs: Option<u64>,
    allow_unsynced: bool,
) -> LyricsResult {
    let mut ordered: Vec<&LrclibRecord> = records.iter().collect();
    if let Some(target) = duration_secs {
        let target = target as f64;
        // Stable sort keeps service order among equal distances; unknown durations go last
        ordered.sort_by(|a, b| {
            let da = a.duration.map(|d| (d - target).abs()).unwrap_or(f64::INFINITY);
            let db = b.duration.map(|d| (d - target).abs()).unwrap_or(f64::INFINITY);
            da.total_cmp(&db)
        });
    }

    if let Some(text) = ordered.iter().find_map(|r| non_blank(&r.synced_lyrics)) {
        return LyricsResult::SyncedFound(text.clone());
    }
    if allow_unsynced {
        if let Some(text) = ordered.iter().find_map(|r| non_blank(&r.plain_lyrics)) {
            return LyricsResult::UnsyncedFound(text.clone());
        }
    }
    LyricsResult::NotFound
}

// ============================================================================
// HTTP client
// ============================================================================

/// Blocking LRCLIB client backed by a shared `ureq` agent.
pub struct LrclibClient {
    agent: ureq::Agent,
    search_url: String,
}

impl LrclibClient {
    pub fn new(config: &FetchConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build();
        Self {
            agent,
            search_url: format!("{}/search", config.api_url.trim_end_matches('/')),
        }
    }

    pub fn search(&self, query: &TrackQuery) -> Result<Vec<LrclibRecord>, LookupError> {
        let mut request = self
            .agent
            .get(&self.search_url)
            .query("artist_name", query.identity.artist())
            .query("track_name", query.identity.title());
        if let Some(duration) = query.duration_secs {
            request = request.query("duration", &duration.to_string());
        }

        let response = request.call().map_err(LookupError::from_ureq)?;
        response
            .into_json::<Vec<LrclibRecord>>()
            .map_err(LookupError::from_body_read)
    }
}

impl LyricsLookup for LrclibClient {
    fn try_lookup(
        &self,
        query: &TrackQuery,
        allow_unsynced: bool,
    ) -> Result<LyricsResult, LookupError> {
        let records = self.search(query)?;
        debug!("{} search results for {}", records.len(), query.identity);
        Ok(select_lyrics(&records, query.duration_secs, allow_unsynced))
    }
}
