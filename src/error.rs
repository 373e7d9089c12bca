use thiserror::Error;

/// Failure kinds surfaced by the summarize and chat operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid YouTube URL")]
    InvalidUrl { url: String },

    #[error("Failed to fetch video details")]
    MetadataUnavailable { video_id: String, details: String },

    #[error("Failed to generate summary")]
    SummaryGenerationFailed { details: String },

    #[error("Failed to generate response")]
    ChatGenerationFailed { details: String },

    #[error("Video context is required")]
    InvalidContext { details: String },
}

impl Error {
    /// Secondary description of the failure, when there is one
    pub fn details(&self) -> Option<String> {
        match self {
            Error::InvalidInput(_) => None,
            Error::InvalidUrl { url } => Some(format!("could not extract a video ID from: {url}")),
            Error::MetadataUnavailable { video_id, details } => Some(format!("{video_id}: {details}")),
            Error::SummaryGenerationFailed { details }
            | Error::ChatGenerationFailed { details }
            | Error::InvalidContext { details } => Some(details.clone()),
        }
    }

    /// True for failures caused by the caller's request rather than an upstream
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::InvalidUrl { .. } | Error::InvalidContext { .. }
        )
    }

    pub(crate) fn summary_failed(details: impl std::fmt::Display) -> Self {
        Error::SummaryGenerationFailed {
            details: details.to_string(),
        }
    }

    pub(crate) fn chat_failed(details: impl std::fmt::Display) -> Self {
        Error::ChatGenerationFailed {
            details: details.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
