use eyre::{Result, bail};
use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;

use crate::VideoId;

pub const DEFAULT_YOUTUBE_URL: &str = "https://www.youtube.com";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Where the summary's source text comes from
#[derive(Debug, Clone)]
pub enum TranscriptSource {
    /// Text synthesized from the title alone
    Placeholder,
    /// YouTube captions, degrading to the placeholder on any failure
    Captions {
        client: reqwest::Client,
        /// Host serving the watch page and player API, normally [`DEFAULT_YOUTUBE_URL`]
        base_url: String,
        lang: String,
    },
}

impl TranscriptSource {
    /// Text to summarize for a video; never fails
    pub async fn text_for(&self, video_id: &VideoId, title: &str) -> String {
        match self {
            TranscriptSource::Placeholder => placeholder(video_id, title),
            TranscriptSource::Captions { client, base_url, lang } => {
                match fetch_captions(client, base_url, video_id, lang).await {
                    Ok(text) if !text.trim().is_empty() => text,
                    Ok(_) => {
                        warn!("Captions for {video_id} were empty, using placeholder transcript");
                        placeholder(video_id, title)
                    }
                    Err(e) => {
                        warn!("Caption fetch for {video_id} failed: {e}, using placeholder transcript");
                        placeholder(video_id, title)
                    }
                }
            }
        }
    }
}

/// Stand-in transcript used when no captions are available
pub fn placeholder(video_id: &VideoId, title: &str) -> String {
    format!(
        "This is a generated transcript for video {title} (ID: {video_id}). \
No caption track was read for this video, so the summary is based on the video title. \
A real transcript source would supply the spoken content here."
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
}

/// Caption text for a video via the InnerTube player API, joined into one block
async fn fetch_captions(client: &reqwest::Client, base_url: &str, video_id: &VideoId, lang: &str) -> Result<String> {
    let page_html = client
        .get(format!("{base_url}/watch?v={video_id}"))
        .header("User-Agent", USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let api_key = innertube_key(&page_html)?;
    debug!("InnerTube key for {video_id}: {api_key}");

    let body = serde_json::json!({
        "context": {
            "client": {
                "hl": lang,
                "gl": "US",
                "clientName": "WEB",
                "clientVersion": "2.20241126.01.00"
            }
        },
        "videoId": video_id.as_str()
    });

    let player: PlayerResponse = client
        .post(format!("{base_url}/youtubei/v1/player?key={api_key}&prettyPrint=false"))
        .header("User-Agent", USER_AGENT)
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let tracks = player
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .map(|r| r.caption_tracks)
        .unwrap_or_default();

    let Some(track) = tracks.iter().find(|t| t.language_code == lang).or(tracks.first()) else {
        bail!("no captions available for video {video_id}");
    };
    debug!("Using caption track {} for {video_id}", track.language_code);

    let xml = client
        .get(&track.base_url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    Ok(caption_lines(&xml)?.join(" "))
}

fn innertube_key(html: &str) -> Result<String> {
    let patterns = [r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#, r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#];
    for pattern in patterns {
        if let Some(caps) = Regex::new(pattern)?.captures(html) {
            return Ok(caps[1].to_string());
        }
    }
    bail!("could not find InnerTube API key on watch page");
}

/// Text of each `<text>` element in a timedtext document
fn caption_lines(xml: &str) -> Result<Vec<String>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut lines = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => in_text = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => in_text = false,
            Ok(Event::Text(ref e)) if in_text => {
                let raw = e.unescape().unwrap_or_default();
                let line = html_escape::decode_html_entities(&raw).trim().to_string();
                if !line.is_empty() {
                    lines.push(line);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("error parsing caption XML: {e}"),
            _ => {}
        }
    }

    Ok(lines)
}
