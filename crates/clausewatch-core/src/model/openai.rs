use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

use super::client::{CompletionRequest, ModelClient, ModelError, ModelResult};
use crate::config::ModelConfig;

const FALLBACK_OUTPUT_CAP: u32 = 8192;

const OUTPUT_CAPS: &[(&str, u32)] = &[
    ("gpt-3.5-turbo", 4096),
    ("gpt-3.5-turbo-16k", 16384),
    ("gpt-4", 8192),
    ("gpt-4-32k", 32768),
    ("gpt-4o", 8192),
    ("o3", 8192),
    ("o4-mini", 16384),
    ("o4-mini-high", 16384),
];

/// Documented output-token cap for `model`; the longest matching prefix in
/// the table wins.
pub fn default_output_cap(model: &str) -> u32 {
    OUTPUT_CAPS
        .iter()
        .filter(|(prefix, _)| model.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map_or(FALLBACK_OUTPUT_CAP, |(_, cap)| *cap)
}

/// `o4-` models take `max_completion_tokens` and only run at their default
/// temperature.
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("o4-")
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client for OpenAI and API-compatible providers.
pub struct OpenAiClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_base: &str, api_key: impl Into<String>) -> ModelResult<Self> {
        let base = Url::parse(&format!("{}/", api_base.trim_end_matches('/')))
            .map_err(|e| ModelError::Configuration(format!("invalid API base {api_base}: {e}")))?;
        let endpoint = base
            .join("chat/completions")
            .map_err(|e| ModelError::Configuration(e.to_string()))?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ModelError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &ModelConfig) -> ModelResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ModelError::Configuration("no API key configured".into()))?;
        Self::new(&config.api_base, api_key)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub(crate) fn request_body(request: &CompletionRequest) -> Value {
        let mut body = Map::new();
        body.insert("model".into(), json!(request.model));
        body.insert(
            "messages".into(),
            json!([
                { "role": "system", "content": request.system_message },
                { "role": "user", "content": request.prompt },
            ]),
        );

        let cap = request
            .max_output_tokens
            .unwrap_or_else(|| default_output_cap(&request.model));

        if is_reasoning_model(&request.model) {
            body.insert("max_completion_tokens".into(), json!(cap));
        } else {
            body.insert("max_tokens".into(), json!(cap));
            if let Some(temperature) = request.temperature {
                body.insert("temperature".into(), json!(temperature));
            }
        }

        if request.json_response {
            body.insert("response_format".into(), json!({ "type": "json_object" }));
        }

        Value::Object(body)
    }
}

#[async_trait::async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> ModelResult<String> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::from_status(status.as_u16(), body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
