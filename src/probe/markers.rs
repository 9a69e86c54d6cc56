//! Refusal markers: the heuristic that reads a probe's stderr.
//!
//! A backend that cannot find a validated module panics at startup with a
//! recognisable message. Matching is plain substring search over all markers
//! at once.

use aho_corasick::{AhoCorasick, MatchKind};
use tracing::warn;

/// Compiled set of marker substrings.
#[derive(Debug, Clone)]
pub struct MarkerSet {
    markers: Vec<String>,
    // None when no usable marker was given; nothing then matches.
    matcher: Option<AhoCorasick>,
}

impl MarkerSet {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let markers: Vec<String> = markers
            .into_iter()
            .map(Into::into)
            .filter(|m| !m.is_empty())
            .collect();
        let matcher = if markers.is_empty() {
            None
        } else {
            match AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostFirst)
                .build(&markers)
            {
                Ok(matcher) => Some(matcher),
                Err(e) => {
                    warn!(error = %e, "Could not compile refusal markers");
                    None
                }
            }
        };
        Self { markers, matcher }
    }

    /// The leftmost marker found in `text`, if any.
    pub fn find<'a>(&'a self, text: &str) -> Option<&'a str> {
        self.find_bytes(text.as_bytes())
    }

    /// Byte-level search, for output that is not valid UTF-8.
    pub fn find_bytes<'a>(&'a self, haystack: &[u8]) -> Option<&'a str> {
        let found = self.matcher.as_ref()?.find(haystack)?;
        Some(self.markers[found.pattern().as_usize()].as_str())
    }

    /// Length in bytes of the longest marker.
    pub fn max_len(&self) -> usize {
        self.markers.iter().map(String::len).max().unwrap_or(0)
    }
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_REFUSAL_MARKERS)
    }
}
