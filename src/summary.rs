use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::metadata::{MetadataFetcher, VideoMetadata};
use crate::provider::TextProvider;
use crate::transcript::TranscriptSource;
use crate::{Error, Result, VideoId};

/// Fewest key points a provider reply may carry
pub const MIN_KEY_POINTS: usize = 5;

/// Upper bound on key points kept from a provider reply
pub const MAX_KEY_POINTS: usize = 7;

const UNKNOWN_AUTHOR: &str = "an unknown creator";

/// Summary text plus its ordered key points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub summary: String,
    pub key_points: Vec<String>,
}

/// Everything a strategy may draw on for one video
#[derive(Debug, Clone, Copy)]
pub struct SummaryInput<'a> {
    pub video_id: &'a VideoId,
    pub title: &'a str,
    pub author: &'a str,
    pub transcript: &'a str,
}

/// One way of turning a video's text into a [`SummaryResult`]
#[async_trait]
pub trait SummaryStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, input: &SummaryInput<'_>) -> Result<SummaryResult>;
}

/// Fixed-template summary built from the title and author only
#[derive(Debug, Default)]
pub struct TemplateSummary;

#[async_trait]
impl SummaryStrategy for TemplateSummary {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate(&self, input: &SummaryInput<'_>) -> Result<SummaryResult> {
        Ok(template_summary(input.title, input.author))
    }
}

/// Title words long enough to carry meaning
fn significant_words(title: &str) -> Vec<&str> {
    title.split_whitespace().filter(|w| w.chars().count() > 3).collect()
}

fn template_summary(title: &str, author: &str) -> SummaryResult {
    let words = significant_words(title);
    let first = words.first().copied().unwrap_or("the topic");
    let last = words.last().copied().unwrap_or("this subject");

    let summary = format!(
        "This is a summary for the video titled \"{title}\" by {author}. \
The video likely covers key aspects related to the topic mentioned in the title. \
Since the actual transcript is not available, this summary is generated based on the title alone."
    );

    let key_points = vec![
        format!("The video discusses topics related to {title}"),
        format!("Created by {author}, this video likely provides insights on the subject"),
        "The content appears to be educational or informative based on the title".to_string(),
        format!("Viewers might benefit from the creator's perspective on {first}"),
        format!("Further research on {last} may provide additional context"),
    ];

    SummaryResult { summary, key_points }
}

/// Summary written by a generative provider and returned as JSON
pub struct ProviderSummary {
    provider: Arc<dyn TextProvider>,
}

impl ProviderSummary {
    pub fn new(provider: Arc<dyn TextProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl SummaryStrategy for ProviderSummary {
    fn name(&self) -> &str {
        "provider"
    }

    async fn generate(&self, input: &SummaryInput<'_>) -> Result<SummaryResult> {
        let prompt = summary_prompt(input.title, input.transcript);
        debug!("Requesting summary for {} from {}", input.video_id, self.provider.name());

        let reply = self
            .provider
            .generate(&prompt)
            .await
            .map_err(|e| Error::summary_failed(format!("{e:#}")))?;

        parse_summary_reply(&reply)
    }
}

fn summary_prompt(title: &str, transcript: &str) -> String {
    format!(
        r#"You are a professional content summarizer. Create a concise summary of the following YouTube video transcript.

Video Title: "{title}"

Transcript:
{transcript}

Please provide:
1. A concise summary (3-5 paragraphs) that captures the main ideas and purpose of the video
2. A list of 5-7 key points or takeaways from the video

Format your response as JSON with the following structure:
{{
  "summary": "Your summary here...",
  "keyPoints": ["Point 1", "Point 2", "Point 3", "Point 4", "Point 5"]
}}"#
    )
}

/// First well-formed JSON object embedded anywhere in `text`
pub fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<serde_json::Value>();
        match stream.next() {
            Some(Ok(value)) if value.is_object() => Some(value),
            _ => None,
        }
    })
}

fn parse_summary_reply(reply: &str) -> Result<SummaryResult> {
    let value = extract_json_object(reply)
        .ok_or_else(|| Error::summary_failed("Failed to parse AI response: no JSON object found"))?;

    let mut result: SummaryResult = serde_json::from_value(value)
        .map_err(|e| Error::summary_failed(format!("Failed to parse AI response: {e}")))?;

    result.summary = result.summary.trim().to_string();
    result.key_points.retain(|p| !p.trim().is_empty());
    result.key_points.truncate(MAX_KEY_POINTS);

    if result.summary.is_empty() {
        return Err(Error::summary_failed("AI response contained an empty summary"));
    }
    if result.key_points.len() < MIN_KEY_POINTS {
        return Err(Error::summary_failed(format!(
            "AI response had {} key points, expected at least {MIN_KEY_POINTS}",
            result.key_points.len()
        )));
    }
    Ok(result)
}

/// Tries `primary` and falls back to `fallback` if it fails
pub struct FallbackSummary {
    name: String,
    primary: Arc<dyn SummaryStrategy>,
    fallback: Arc<dyn SummaryStrategy>,
}

impl FallbackSummary {
    pub fn new(primary: Arc<dyn SummaryStrategy>, fallback: Arc<dyn SummaryStrategy>) -> Self {
        Self {
            name: format!("{}+{}", primary.name(), fallback.name()),
            primary,
            fallback,
        }
    }
}

#[async_trait]
impl SummaryStrategy for FallbackSummary {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, input: &SummaryInput<'_>) -> Result<SummaryResult> {
        match self.primary.generate(input).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(
                    "{} summary failed for {}: {e} ({}), using {}",
                    self.primary.name(),
                    input.video_id,
                    e.details().unwrap_or_default(),
                    self.fallback.name()
                );
                self.fallback.generate(input).await
            }
        }
    }
}

/// A summary together with the metadata it was generated from
#[derive(Debug, Clone)]
pub struct GeneratedSummary {
    pub metadata: VideoMetadata,
    pub title: String,
    pub result: SummaryResult,
}

/// Metadata lookup, transcript and strategy, run in sequence
pub struct SummaryGenerator {
    metadata: MetadataFetcher,
    transcripts: TranscriptSource,
    strategy: Arc<dyn SummaryStrategy>,
}

impl SummaryGenerator {
    pub fn new(metadata: MetadataFetcher, transcripts: TranscriptSource, strategy: Arc<dyn SummaryStrategy>) -> Self {
        Self {
            metadata,
            transcripts,
            strategy,
        }
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Summarize a video, using `fallback_title` if the lookup reports none
    pub async fn generate_summary(&self, video_id: &VideoId, fallback_title: &str) -> Result<GeneratedSummary> {
        let metadata = self.metadata.fetch(video_id).await.map_err(|e| {
            Error::summary_failed(match e.details() {
                Some(details) => format!("{e}: {details}"),
                None => e.to_string(),
            })
        })?;

        let title = non_empty_or(&metadata.title, fallback_title);
        let author = non_empty_or(&metadata.author_name, UNKNOWN_AUTHOR);
        let transcript = self.transcripts.text_for(video_id, &title).await;

        let input = SummaryInput {
            video_id,
            title: &title,
            author: &author,
            transcript: &transcript,
        };
        let result = self.strategy.generate(&input).await?;
        info!(
            "Summarized {video_id} with {} strategy ({} key points)",
            self.strategy.name(),
            result.key_points.len()
        );

        Ok(GeneratedSummary {
            metadata,
            title,
            result,
        })
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let value = value.trim();
    let chosen = if value.is_empty() { fallback } else { value };
    chosen.to_string()
}
