use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::provider::TextProvider;
use crate::{Error, Result};

/// Sentence closing every template reply
pub const TRAILER: &str = "This is based on the available information about the video.";

/// Number of reply templates the template strategy chooses between
pub const TEMPLATE_COUNT: usize = 5;

/// What the assistant knows about the video being discussed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatContext {
    title: String,
    summary: String,
    key_points: Vec<String>,
}

impl ChatContext {
    pub fn new(title: impl Into<String>, summary: impl Into<String>, key_points: Vec<String>) -> Result<Self> {
        let title = title.into();
        let summary = summary.into();
        let missing = [
            (title.trim().is_empty(), "title"),
            (summary.trim().is_empty(), "summary"),
            (key_points.is_empty(), "keyPoints"),
        ]
        .into_iter()
        .filter_map(|(is_missing, field)| is_missing.then_some(field))
        .collect::<Vec<_>>();

        if !missing.is_empty() {
            return Err(Error::InvalidContext {
                details: format!("video context is missing: {}", missing.join(", ")),
            });
        }
        Ok(Self {
            title,
            summary,
            key_points,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn key_points(&self) -> &[String] {
        &self.key_points
    }

    /// Summary text up to its first period, with the period
    fn first_sentence(&self) -> String {
        let first = self.summary.split('.').next().unwrap_or_default().trim();
        format!("{first}.")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the visible conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One way of answering a question about a summarized video
#[async_trait]
pub trait ChatStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn respond(&self, message: &str, context: &ChatContext, history: &[ChatTurn]) -> Result<String>;
}

/// Source of the template index used when no key point matches
pub trait TemplatePicker: Send + Sync {
    /// An index in `0..count`
    fn pick(&self, count: usize) -> usize;
}

/// Uniformly random pick from the thread RNG
#[derive(Debug, Default)]
pub struct RandomPicker;

impl TemplatePicker for RandomPicker {
    fn pick(&self, count: usize) -> usize {
        rand::rng().random_range(0..count)
    }
}

/// Templated replies keyed off the context's key points
pub struct TemplateChat {
    picker: Box<dyn TemplatePicker>,
}

impl Default for TemplateChat {
    fn default() -> Self {
        Self::new(Box::new(RandomPicker))
    }
}

impl TemplateChat {
    pub fn new(picker: Box<dyn TemplatePicker>) -> Self {
        Self { picker }
    }

    /// Index of the template to answer `message` with
    pub fn select_template(&self, message: &str, context: &ChatContext) -> usize {
        let message = message.to_lowercase();
        let words: Vec<&str> = message.split_whitespace().filter(|w| w.chars().count() > 3).collect();

        let matched = context.key_points().iter().position(|point| {
            let point = point.to_lowercase();
            words.iter().any(|w| point.contains(w))
        });

        match matched {
            Some(index) => {
                debug!("Message matched key point {index}");
                index % TEMPLATE_COUNT
            }
            None => self.picker.pick(TEMPLATE_COUNT) % TEMPLATE_COUNT,
        }
    }

    fn render(&self, template: usize, context: &ChatContext) -> String {
        let title = context.title();
        let slot = |i: usize| {
            context
                .key_points()
                .get(i)
                .cloned()
                .unwrap_or_else(|| context.first_sentence())
        };

        match template {
            0 => format!(
                "Based on the video \"{title}\", I think the answer relates to the key points mentioned. {}",
                slot(0)
            ),
            1 => format!(
                "That's an interesting question about \"{title}\". From what I understand, {}",
                slot(1)
            ),
            2 => format!("According to the summary of \"{title}\", {}", context.first_sentence()),
            3 => format!(
                "I don't have the full transcript, but based on the title and summary, I would say that {}",
                slot(2)
            ),
            _ => format!("Great question! The video \"{title}\" seems to address this by {}", slot(3)),
        }
    }
}

#[async_trait]
impl ChatStrategy for TemplateChat {
    fn name(&self) -> &str {
        "template"
    }

    async fn respond(&self, message: &str, context: &ChatContext, _history: &[ChatTurn]) -> Result<String> {
        let template = self.select_template(message, context);
        Ok(format!("{} {TRAILER}", self.render(template, context)))
    }
}

/// Answers written by a generative provider from the full context
pub struct ProviderChat {
    provider: Arc<dyn TextProvider>,
}

impl ProviderChat {
    pub fn new(provider: Arc<dyn TextProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ChatStrategy for ProviderChat {
    fn name(&self) -> &str {
        "provider"
    }

    async fn respond(&self, message: &str, context: &ChatContext, history: &[ChatTurn]) -> Result<String> {
        let prompt = chat_prompt(message, context, history);
        debug!("Requesting chat reply from {}", self.provider.name());
        self.provider
            .generate(&prompt)
            .await
            .map_err(|e| Error::chat_failed(format!("{e:#}")))
    }
}

fn chat_prompt(message: &str, context: &ChatContext, history: &[ChatTurn]) -> String {
    let key_points = context
        .key_points()
        .iter()
        .enumerate()
        .map(|(i, point)| format!("{}. {point}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        "You are an AI assistant helping a user understand a YouTube video they just watched.\n\
You have access to the video's summary and key points.\n\n\
Video Title: \"{}\"\n\n\
Summary: {}\n\n\
Key Points:\n{key_points}\n",
        context.title(),
        context.summary(),
    );

    if !history.is_empty() {
        prompt.push_str("\nConversation so far:\n");
        for turn in history {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            prompt.push_str(&format!("{speaker}: {}\n", turn.content));
        }
    }

    prompt.push_str(&format!(
        "\nThe user asks: \"{message}\"\n\n\
Provide a helpful, conversational response that directly answers their question based on the video content. \
If you don't know the answer based on the provided context, be honest about it. \
Keep your response concise and focused on the user's question."
    ));
    prompt
}

/// Tries `primary` and falls back to `fallback` if it fails
pub struct FallbackChat {
    name: String,
    primary: Arc<dyn ChatStrategy>,
    fallback: Arc<dyn ChatStrategy>,
}

impl FallbackChat {
    pub fn new(primary: Arc<dyn ChatStrategy>, fallback: Arc<dyn ChatStrategy>) -> Self {
        Self {
            name: format!("{}+{}", primary.name(), fallback.name()),
            primary,
            fallback,
        }
    }
}

#[async_trait]
impl ChatStrategy for FallbackChat {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(&self, message: &str, context: &ChatContext, history: &[ChatTurn]) -> Result<String> {
        match self.primary.respond(message, context, history).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(
                    "{} chat failed: {e} ({}), using {}",
                    self.primary.name(),
                    e.details().unwrap_or_default(),
                    self.fallback.name()
                );
                self.fallback.respond(message, context, history).await
            }
        }
    }
}

/// Validates chat requests and hands them to the configured strategy
pub struct ChatResponder {
    strategy: Arc<dyn ChatStrategy>,
}

impl ChatResponder {
    pub fn new(strategy: Arc<dyn ChatStrategy>) -> Self {
        Self { strategy }
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub async fn respond(&self, message: &str, context: &ChatContext, history: &[ChatTurn]) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::InvalidInput("Message is required".to_string()));
        }
        self.strategy.respond(message, context, history).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeProvider;

    struct FixedPicker(usize);

    impl TemplatePicker for FixedPicker {
        fn pick(&self, _count: usize) -> usize {
            self.0
        }
    }

    fn context() -> ChatContext {
        ChatContext::new(
            "Learning Rust",
            "Rust is a systems language. It has no garbage collector.",
            vec![
                "Ownership replaces the garbage collector".to_string(),
                "Borrowing lets functions use data without owning it".to_string(),
                "Lifetimes describe how long references stay valid".to_string(),
                "Cargo builds and tests the project".to_string(),
                "Traits define shared behaviour".to_string(),
                "Macros generate code at compile time".to_string(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_context_requires_fields() {
        let err = ChatContext::new("Title", "", vec![]).unwrap_err();
        match err {
            Error::InvalidContext { details } => assert_eq!(details, "video context is missing: summary, keyPoints"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ChatContext::new(" ", "s", vec!["k".to_string()]).is_err());
    }

    #[test]
    fn test_first_sentence() {
        assert_eq!(context().first_sentence(), "Rust is a systems language.");
    }

    #[test]
    fn test_select_matches_key_point() {
        let chat = TemplateChat::new(Box::new(FixedPicker(4)));
        // "lifetimes" only appears in key point 2
        assert_eq!(chat.select_template("What are LIFETIMES for?", &context()), 2);
        assert_eq!(chat.select_template("tell me about cargo", &context()), 3);
    }

    #[test]
    fn test_select_first_matching_key_point_wins() {
        let chat = TemplateChat::new(Box::new(FixedPicker(4)));
        // "garbage" is in key point 0 and the summary, "cargo" in key point 3
        assert_eq!(chat.select_template("garbage and cargo", &context()), 0);
    }

    #[test]
    fn test_select_wraps_modulo_template_count() {
        let chat = TemplateChat::new(Box::new(FixedPicker(2)));
        assert_eq!(chat.select_template("macros please", &context()), 5 % TEMPLATE_COUNT);
    }

    #[test]
    fn test_select_ignores_short_words() {
        let chat = TemplateChat::new(Box::new(FixedPicker(1)));
        // "use", "it" and "the" are too short to count
        assert_eq!(chat.select_template("use it the", &context()), 1);
    }

    #[test]
    fn test_select_falls_back_to_picker() {
        let chat = TemplateChat::new(Box::new(FixedPicker(3)));
        assert_eq!(chat.select_template("completely unrelated question", &context()), 3);
    }

    #[test]
    fn test_random_picker_in_range() {
        for _ in 0..100 {
            assert!(RandomPicker.pick(TEMPLATE_COUNT) < TEMPLATE_COUNT);
        }
    }

    #[tokio::test]
    async fn test_template_reply_uses_slot() {
        let chat = TemplateChat::new(Box::new(FixedPicker(0)));
        let reply = chat.respond("what about lifetimes", &context(), &[]).await.unwrap();
        assert_eq!(
            reply,
            "According to the summary of \"Learning Rust\", Rust is a systems language. \
This is based on the available information about the video."
        );
    }

    #[tokio::test]
    async fn test_template_reply_always_has_trailer() {
        let ctx = context();
        let openings = [
            "Based on the video \"Learning Rust\"",
            "That's an interesting question about \"Learning Rust\"",
            "According to the summary of \"Learning Rust\"",
            "I don't have the full transcript, but based on the title and summary",
            "Great question! The video \"Learning Rust\"",
        ];
        assert_eq!(openings.len(), TEMPLATE_COUNT);
        for (pick, opening) in openings.iter().enumerate() {
            let chat = TemplateChat::new(Box::new(FixedPicker(pick)));
            let reply = chat.respond("xyzzy plugh", &ctx, &[]).await.unwrap();
            assert!(reply.starts_with(opening), "template {pick}: {reply}");
            assert!(reply.ends_with(TRAILER), "template {pick}: {reply}");
        }
    }

    #[tokio::test]
    async fn test_template_reply_with_few_key_points() {
        let ctx = ChatContext::new("Short", "Only one idea here. More text.", vec!["One idea".to_string()]).unwrap();
        let chat = TemplateChat::new(Box::new(FixedPicker(4)));
        let reply = chat.respond("anything", &ctx, &[]).await.unwrap();
        assert_eq!(
            reply,
            format!("Great question! The video \"Short\" seems to address this by Only one idea here. {TRAILER}")
        );
    }

    #[tokio::test]
    async fn test_provider_chat_prompt() {
        let provider = FakeProvider::replying("Ownership is checked at compile time.");
        let chat = ProviderChat::new(provider.clone());
        let history = vec![
            ChatTurn::assistant("I can answer questions about \"Learning Rust\"."),
            ChatTurn::user("hi"),
        ];

        let reply = chat.respond("How is memory freed?", &context(), &history).await.unwrap();
        assert_eq!(reply, "Ownership is checked at compile time.");

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("Video Title: \"Learning Rust\""));
        assert!(prompt.contains("1. Ownership replaces the garbage collector"));
        assert!(prompt.contains("6. Macros generate code at compile time"));
        assert!(prompt.contains("User: hi"));
        assert!(prompt.contains("The user asks: \"How is memory freed?\""));
    }

    #[tokio::test]
    async fn test_provider_chat_error() {
        let chat = ProviderChat::new(FakeProvider::broken());
        let err = chat.respond("question", &context(), &[]).await.unwrap_err();
        assert!(matches!(err, Error::ChatGenerationFailed { .. }));
    }

    #[tokio::test]
    async fn test_fallback_chat() {
        let chat = FallbackChat::new(
            Arc::new(ProviderChat::new(FakeProvider::broken())),
            Arc::new(TemplateChat::new(Box::new(FixedPicker(1)))),
        );
        let reply = chat.respond("zzzz", &context(), &[]).await.unwrap();
        assert!(reply.starts_with("That's an interesting question about \"Learning Rust\"."));
        assert!(reply.ends_with(TRAILER));
    }

    #[tokio::test]
    async fn test_responder_rejects_empty_message() {
        let provider = FakeProvider::replying("unused");
        let responder = ChatResponder::new(Arc::new(ProviderChat::new(provider.clone())));
        let err = responder.respond("   ", &context(), &[]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(provider.prompts().is_empty());
    }

    #[test]
    fn test_chat_turn_serde() {
        let turn: ChatTurn = serde_json::from_str(r#"{"role":"assistant","content":"hello"}"#).unwrap();
        assert_eq!(turn, ChatTurn::assistant("hello"));
        assert_eq!(
            serde_json::to_value(ChatTurn::user("q")).unwrap(),
            serde_json::json!({"role": "user", "content": "q"})
        );
    }
}
