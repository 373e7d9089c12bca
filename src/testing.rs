use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;

use crate::provider::TextProvider;

/// In-process stand-in for YouTube's HTTP endpoints that counts its requests
pub struct FakeUpstream {
    base: String,
    hits: Arc<AtomicUsize>,
}

type Page = (StatusCode, String);

impl FakeUpstream {
    pub async fn oembed(title: &str, author: &str) -> Self {
        let body = serde_json::json!({
            "title": title,
            "author_name": author,
            "thumbnail_url": "https://i.ytimg.com/vi/test/hqdefault.jpg",
        })
        .to_string();
        Self::serve(HashMap::new(), (StatusCode::OK, body)).await
    }

    /// Answers every path with `body`
    pub async fn raw(body: &str) -> Self {
        Self::serve(HashMap::new(), (StatusCode::OK, body.to_string())).await
    }

    /// Answers every path with a 404
    pub async fn failing() -> Self {
        Self::serve(HashMap::new(), (StatusCode::NOT_FOUND, "Not Found".to_string())).await
    }

    /// Answers each listed path with its body, anything else with a 404;
    /// `{base}` in a body is replaced by the server's own base URL
    pub async fn pages(pages: &[(&str, &str)]) -> Self {
        let pages = pages
            .iter()
            .map(|(path, body)| (path.to_string(), (StatusCode::OK, body.to_string())))
            .collect();
        Self::serve(pages, (StatusCode::NOT_FOUND, "Not Found".to_string())).await
    }

    async fn serve(pages: HashMap<String, Page>, default: Page) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let pages: Arc<HashMap<String, Page>> = Arc::new(
            pages
                .into_iter()
                .map(|(path, (status, body))| (path, (status, body.replace("{base}", &base))))
                .collect(),
        );
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().fallback(move |uri: Uri| {
            let counter = counter.clone();
            let (status, body) = pages.get(uri.path()).cloned().unwrap_or_else(|| default.clone());
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (status, [("content-type", "application/json")], body).into_response()
            }
        });

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base, hits }
    }

    pub fn base_url(&self) -> String {
        self.base.clone()
    }

    pub fn oembed_url(&self) -> String {
        format!("{}/oembed", self.base)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Provider that replays a canned reply and records the prompts it was given
pub struct FakeProvider {
    reply: Option<String>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            prompts: Default::default(),
        })
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            prompts: Default::default(),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, prompt: &str) -> eyre::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => eyre::bail!("provider unavailable"),
        }
    }
}
