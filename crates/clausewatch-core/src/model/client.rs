use std::time::Duration;

use serde::Serialize;

/// One chat-style completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_message: String,
    pub model: String,
    pub temperature: Option<f32>,
    /// None lets the client pick the model's documented cap
    pub max_output_tokens: Option<u32>,
    /// Ask the provider to constrain output to a JSON object
    pub json_response: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Rate limited by provider")]
    RateLimited,
    #[error("Provider error (HTTP {status}): {message}")]
    Server { status: u16, message: String },
    #[error("Request rejected (HTTP {status}): {message}")]
    Client { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Model client misconfigured: {0}")]
    Configuration(String),
}

pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    /// Failures worth retrying: the same request may succeed later.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Transport(_) | Self::RateLimited | Self::Server { .. }
        )
    }

    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => Self::RateLimited,
            500..=599 => Self::Server { status, message },
            _ => Self::Client { status, message },
        }
    }
}

/// A chat completion provider.
///
/// An `Ok` with an empty string means the provider answered with no content,
/// which is not an error.
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> ModelResult<String>;
}
