use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, VideoId};

/// Public oEmbed endpoint used for title/author lookups
pub const DEFAULT_OEMBED_URL: &str = "https://www.youtube.com/oembed";

/// Basic details about a video, as reported by oEmbed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename(deserialize = "author_name", serialize = "authorName"))]
    pub author_name: String,
    #[serde(default, rename(deserialize = "thumbnail_url", serialize = "thumbnailUrl"))]
    pub thumbnail_url: String,
}

/// Resolves video IDs to metadata with a single uncached lookup per call
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    client: reqwest::Client,
    oembed_url: String,
}

impl MetadataFetcher {
    pub fn new(client: reqwest::Client, oembed_url: impl Into<String>) -> Self {
        Self {
            client,
            oembed_url: oembed_url.into(),
        }
    }

    /// Build the lookup request for a video without sending it
    pub fn request(&self, video_id: &VideoId) -> Result<reqwest::Request> {
        self.client
            .get(&self.oembed_url)
            .query(&[("url", video_id.watch_url().as_str()), ("format", "json")])
            .build()
            .map_err(|e| unavailable(video_id, e))
    }

    pub async fn fetch(&self, video_id: &VideoId) -> Result<VideoMetadata> {
        let request = self.request(video_id)?;
        debug!("Fetching video details: {}", request.url());

        let resp = self.client.execute(request).await.map_err(|e| unavailable(video_id, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(unavailable(video_id, format!("oEmbed returned {status}")));
        }

        let body = resp.text().await.map_err(|e| unavailable(video_id, e))?;
        let metadata: VideoMetadata =
            serde_json::from_str(&body).map_err(|e| unavailable(video_id, format!("malformed oEmbed response: {e}")))?;

        debug!("Video {video_id}: \"{}\" by {}", metadata.title, metadata.author_name);
        Ok(metadata)
    }
}

fn unavailable(video_id: &VideoId, details: impl std::fmt::Display) -> Error {
    Error::MetadataUnavailable {
        video_id: video_id.to_string(),
        details: details.to_string(),
    }
}
