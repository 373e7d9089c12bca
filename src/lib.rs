pub mod chat;
pub mod config;
pub mod error;
pub mod metadata;
pub mod provider;
pub mod server;
pub mod summary;
pub mod transcript;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub use error::{Error, Result};

/// YouTube video IDs are always this long
pub const VIDEO_ID_LEN: usize = 11;

static VIDEO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*((youtu\.be/)|(v/)|(/u/\w+/)|(embed/)|(watch\?))\??v?=?([^#&?]*).*$")
        .expect("video URL pattern is valid")
});

/// Identifier of a single video, validated on construction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch page for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract video ID from the supported YouTube URL formats
///
/// Recognizes `watch?v=ID`, `youtu.be/ID`, `/v/ID`, `/embed/ID` and
/// `/u/<user>/ID`. The captured segment runs until the first `#`, `&` or `?`
/// and must be exactly [`VIDEO_ID_LEN`] characters long.
pub fn extract_video_id(input: &str) -> Option<VideoId> {
    let caps = VIDEO_URL_RE.captures(input.trim())?;
    let candidate = caps.get(7)?.as_str();
    (candidate.chars().count() == VIDEO_ID_LEN).then(|| VideoId(candidate.to_string()))
}

impl std::str::FromStr for VideoId {
    type Err = Error;

    /// Accepts a bare video ID
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let valid = s.len() == VIDEO_ID_LEN
            && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if valid {
            Ok(VideoId(s.to_string()))
        } else {
            Err(Error::InvalidInput(format!("invalid video ID: {s}")))
        }
    }
}
