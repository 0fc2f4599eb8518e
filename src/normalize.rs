//! Normalization shared by the failure cache and the lyrics client.
//!
//! CRITICAL: cache keys and query parameters both go through `normalize_field`.
//! Changing it invalidates every key already written to existing cache files.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Words that mark a title as a variant recording LRCLIB rarely has
/// trustworthy lyrics for: "Song (Live)", "Song - Radio Edit", "Song [Karaoke]".
static VARIANT_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:live|remix|edit|karaoke|instrumental)\b").unwrap());

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Normalize punctuation by converting curly quotes to straight quotes.
pub fn normalize_punctuation(s: &str) -> String {
    s.replace(['\u{2018}', '\u{2019}'], "'") // Left/right single curly quotes
        .replace(['\u{201C}', '\u{201D}'], "\"") // Left/right double curly quotes
        .replace('\u{00B4}', "'") // Acute accent used as apostrophe
}

/// Normalize one identity field (artist, title, or album).
///
/// Applies NFC composition (macOS filesystems and some taggers hand out NFD),
/// folds curly quotes, collapses whitespace runs and trims. Case is preserved
/// since LRCLIB matches case-insensitively on its side.
pub fn normalize_field(s: &str) -> String {
    let composed: String = s.nfc().collect();
    let result = normalize_punctuation(&composed);
    MULTI_SPACE.replace_all(&result, " ").trim().to_string()
}

/// Check whether a title names a live/remix/edit/karaoke/instrumental variant.
pub fn is_variant_title(title: &str) -> bool {
    VARIANT_TITLE.is_match(title)
}

// ============================================================================
// TESTS
// ============================================================================
