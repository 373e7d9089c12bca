use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Result, bail};
use log::debug;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that explains YouTube videos. \
Answer accurately from the material you are given and say so when it does not contain the answer.";

const MAX_TOKENS: u32 = 4096;

/// A generative text service: prompt in, text out
#[async_trait]
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Vendor family, chosen from the model name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Anthropic,
    Gemini,
    OpenAi,
}

impl Vendor {
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("claude") {
            Vendor::Anthropic
        } else if model.starts_with("gemini") {
            Vendor::Gemini
        } else {
            Vendor::OpenAi
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            Vendor::Anthropic => "ANTHROPIC_API_KEY",
            Vendor::Gemini => "GEMINI_API_KEY",
            Vendor::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// API key from the environment; an empty value counts as unset
    pub fn api_key(&self) -> Option<String> {
        std::env::var(self.env_var()).ok().filter(|k| !k.is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }
}

/// Build the provider for `model`, reading its API key from the environment
pub fn from_model(client: reqwest::Client, model: &str) -> Result<Arc<dyn TextProvider>> {
    with_api_key(client, model, Vendor::for_model(model).api_key())
}

fn with_api_key(client: reqwest::Client, model: &str, api_key: Option<String>) -> Result<Arc<dyn TextProvider>> {
    let vendor = Vendor::for_model(model);
    let api_key = api_key.filter(|k| !k.is_empty()).ok_or_else(|| {
        eyre::eyre!("{} environment variable not set (required for model {model})", vendor.env_var())
    })?;

    let provider: Arc<dyn TextProvider> = match vendor {
        Vendor::Anthropic => Arc::new(Anthropic {
            client,
            api_key,
            model: model.to_string(),
        }),
        Vendor::Gemini => Arc::new(Gemini {
            client,
            api_key,
            model: model.to_string(),
        }),
        Vendor::OpenAi => Arc::new(OpenAi {
            client,
            api_key,
            model: model.to_string(),
        }),
    };
    Ok(provider)
}

pub struct Anthropic {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[async_trait]
impl TextProvider for Anthropic {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Generating via Anthropic API with model {}", self.model);

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": SYSTEM_PROMPT,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        let json = read_json(resp, "Anthropic").await?;
        extract_anthropic_text(&json)
    }
}

pub struct OpenAi {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[async_trait]
impl TextProvider for OpenAi {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Generating via OpenAI API with model {}", self.model);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": SYSTEM_PROMPT
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let resp = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let json = read_json(resp, "OpenAI").await?;
        extract_openai_text(&json)
    }
}

pub struct Gemini {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[async_trait]
impl TextProvider for Gemini {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Generating via Gemini API with model {}", self.model);

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = serde_json::json!({
            "systemInstruction": {
                "parts": [{ "text": SYSTEM_PROMPT }]
            },
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ]
        });

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let json = read_json(resp, "Gemini").await?;
        extract_gemini_text(&json)
    }
}

async fn read_json(resp: reqwest::Response, vendor: &str) -> Result<serde_json::Value> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("{vendor} API returned {status}: {body}");
    }
    Ok(resp.json().await?)
}

fn extract_anthropic_text(json: &serde_json::Value) -> Result<String> {
    if let Some(content) = json.get("content").and_then(|c| c.as_array()) {
        let text: String = content
            .iter()
            .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|block| block.get("text")?.as_str())
            .collect();
        if !text.is_empty() {
            return Ok(text);
        }
    }
    bail!("unexpected Anthropic API response format");
}

fn extract_openai_text(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| eyre::eyre!("unexpected OpenAI API response format"))
}

fn extract_gemini_text(json: &serde_json::Value) -> Result<String> {
    let text: String = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .map(|parts| parts.iter().filter_map(|p| p.get("text")?.as_str()).collect())
        .unwrap_or_default();
    if text.is_empty() {
        bail!("unexpected Gemini API response format");
    }
    Ok(text)
}
