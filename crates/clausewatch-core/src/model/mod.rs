mod client;
mod openai;
mod retry;

pub use client::{CompletionRequest, ModelClient, ModelError, ModelResult};
pub use openai::{default_output_cap, OpenAiClient};
pub use retry::RetryPolicy;
