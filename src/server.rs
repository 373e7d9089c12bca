use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use eyre::WrapErr;
use log::{Level, error, info, log};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatContext, ChatResponder, ChatStrategy, ChatTurn, FallbackChat, ProviderChat, TemplateChat};
use crate::config::{Settings, Strategy};
use crate::metadata::MetadataFetcher;
use crate::provider::{self, Vendor};
use crate::summary::{FallbackSummary, ProviderSummary, SummaryGenerator, SummaryStrategy, TemplateSummary};
use crate::transcript::TranscriptSource;
use crate::{Error, VideoId, extract_video_id};

/// Title used when the metadata lookup has none
pub const FALLBACK_TITLE: &str = "YouTube Video";

/// Video used by the connectivity check
const TEST_VIDEO_ID: &str = "dQw4w9WgXcQ";

#[derive(Clone)]
pub struct AppState {
    pub summaries: Arc<SummaryGenerator>,
    pub chat: Arc<ChatResponder>,
    pub metadata: MetadataFetcher,
}

impl AppState {
    /// Wire up the HTTP client, provider and strategies described by `settings`
    pub fn from_settings(settings: &Settings) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .wrap_err("failed to build HTTP client")?;

        let use_provider = match settings.strategy {
            Strategy::Template => false,
            Strategy::Provider => true,
            Strategy::Auto => {
                let vendor = Vendor::for_model(&settings.model);
                let has_key = vendor.has_api_key();
                if !has_key {
                    info!("{} not set, using template strategy", vendor.env_var());
                }
                has_key
            }
        };

        let (summary_strategy, chat_strategy) = if use_provider {
            provider_strategies(client.clone(), settings)?
        } else {
            template_strategies()
        };

        let transcripts = if settings.captions {
            TranscriptSource::Captions {
                client: client.clone(),
                base_url: settings.youtube_url.clone(),
                lang: settings.caption_lang.clone(),
            }
        } else {
            TranscriptSource::Placeholder
        };

        let metadata = MetadataFetcher::new(client, settings.oembed_url.clone());
        Ok(Self::new(
            SummaryGenerator::new(metadata.clone(), transcripts, summary_strategy),
            ChatResponder::new(chat_strategy),
            metadata,
        ))
    }

    pub fn new(summaries: SummaryGenerator, chat: ChatResponder, metadata: MetadataFetcher) -> Self {
        Self {
            summaries: Arc::new(summaries),
            chat: Arc::new(chat),
            metadata,
        }
    }
}

type Strategies = (Arc<dyn SummaryStrategy>, Arc<dyn ChatStrategy>);

fn template_strategies() -> Strategies {
    let summary: Arc<dyn SummaryStrategy> = Arc::new(TemplateSummary);
    let chat: Arc<dyn ChatStrategy> = Arc::new(TemplateChat::default());
    (summary, chat)
}

fn provider_strategies(client: reqwest::Client, settings: &Settings) -> eyre::Result<Strategies> {
    let text_provider = provider::from_model(client, &settings.model)?;
    info!("Using {} for summaries and chat", text_provider.name());

    let summary: Arc<dyn SummaryStrategy> = Arc::new(ProviderSummary::new(text_provider.clone()));
    let chat: Arc<dyn ChatStrategy> = Arc::new(ProviderChat::new(text_provider));
    if !settings.fallback_on_error {
        return Ok((summary, chat));
    }

    let (template_summary, template_chat) = template_strategies();
    let summary: Arc<dyn SummaryStrategy> = Arc::new(FallbackSummary::new(summary, template_summary));
    let chat: Arc<dyn ChatStrategy> = Arc::new(FallbackChat::new(chat, template_chat));
    Ok((summary, chat))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/summarize", post(summarize))
        .route("/api/chat", post(chat))
        .route("/api/test-api", get(test_api))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
        };
        let level = if status.is_client_error() { Level::Warn } else { Level::Error };
        match &body.details {
            Some(details) => log!(level, "Request failed ({status}): {}: {details}", body.error),
            None => log!(level, "Request failed ({status}): {}", body.error),
        }
        (status, Json(body)).into_response()
    }
}

fn bad_json(rejection: JsonRejection) -> Error {
    Error::InvalidInput(format!("Invalid request body: {}", rejection.body_text()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    pub video_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeResponse {
    pub video_id: VideoId,
    pub video_title: String,
    pub summary: String,
    pub key_points: Vec<String>,
}

pub async fn summarize(
    State(state): State<AppState>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>, Error> {
    info!("POST /api/summarize");
    let Json(req) = payload.map_err(bad_json)?;

    let video_url = req
        .video_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput("Video URL is required".to_string()))?;
    info!("Summarize requested for {video_url}");

    let video_id = extract_video_id(&video_url).ok_or(Error::InvalidUrl { url: video_url })?;

    let generated = state.summaries.generate_summary(&video_id, FALLBACK_TITLE).await?;
    Ok(Json(SummarizeResponse {
        video_id,
        video_title: generated.title,
        summary: generated.result.summary,
        key_points: generated.result.key_points,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoContextPayload {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub key_points: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    pub video_context: Option<VideoContextPayload>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, Error> {
    info!("POST /api/chat");
    let Json(req) = payload.map_err(bad_json)?;

    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput("Message is required".to_string()))?;

    let ctx = req.video_context.ok_or_else(|| Error::InvalidContext {
        details: "videoContext is missing".to_string(),
    })?;
    let context = ChatContext::new(
        ctx.title.unwrap_or_default(),
        ctx.summary.unwrap_or_default(),
        ctx.key_points.unwrap_or_default(),
    )?;
    info!("Chat requested about \"{}\" ({} prior turns)", context.title(), req.history.len());

    let response = state.chat.respond(&message, &context, &req.history).await?;
    Ok(Json(ChatResponse { response }))
}

async fn test_api(State(state): State<AppState>) -> Response {
    info!("GET /api/test-api");
    let video_id = match TEST_VIDEO_ID.parse::<VideoId>() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.metadata.fetch(&video_id).await {
        Ok(details) => Json(serde_json::json!({
            "success": true,
            "message": "API connection successful",
            "videoTitle": details.title,
            "author": details.author_name,
            "thumbnail": details.thumbnail_url,
        }))
        .into_response(),
        Err(e) => {
            error!("Test API error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "API connection failed",
                    "error": e.details().unwrap_or_else(|| e.to_string()),
                })),
            )
                .into_response()
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    info!("GET /health");
    Json(serde_json::json!({
        "ok": true,
        "service": "ytbrief",
        "summaryStrategy": state.summaries.strategy_name(),
        "chatStrategy": state.chat.strategy_name(),
    }))
}
