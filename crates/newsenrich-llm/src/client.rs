//! Enrichment client: one outbound chat-completions call per invocation.

use std::time::Duration;

use newsenrich_core::{block_on_with_timeout, http_client};
use serde::{Deserialize, Serialize};

use crate::error::EnrichmentError;
use crate::payload::Payload;
use crate::prompt;

/// Default OpenAI-compatible API base
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default per-call deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Anything that turns news text into a payload with a single attempt.
///
/// Implementations hold no per-call state; retries belong to the scheduler.
pub trait Enricher: Send + Sync {
    fn enrich(&self, text: &str) -> Result<Payload, EnrichmentError>;
}

/// Connection settings for [`ChatEnricher`]
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client.
///
/// Shares the process-wide connection pool; the only state it keeps is the
/// client handle and its settings.
pub struct ChatEnricher {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for ChatEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatEnricher")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ChatEnricher {
    pub fn new(config: ChatConfig) -> Self {
        if config.api_key.is_none() {
            log::warn!("No API key configured; requests will be sent unauthenticated");
        }
        Self {
            endpoint: chat_endpoint(&config.base_url),
            model: config.model,
            api_key: config.api_key,
            timeout: config.timeout,
            client: http_client().clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Single attempt with an explicit deadline.
    pub fn call(&self, text: &str, timeout: Duration) -> Result<Payload, EnrichmentError> {
        let user = prompt::user_message(text);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: prompt::SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let body = block_on_with_timeout(timeout, async move {
            builder.send().await?.error_for_status()?.text().await
        })
        .ok_or(EnrichmentError::Timeout(timeout))?
        .map_err(|e| EnrichmentError::from_reqwest(e, timeout))?;

        parse_completion(&body)
    }
}

impl Enricher for ChatEnricher {
    fn enrich(&self, text: &str) -> Result<Payload, EnrichmentError> {
        self.call(text, self.timeout)
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Extract and validate the payload from a chat-completions response body.
pub fn parse_completion(body: &str) -> Result<Payload, EnrichmentError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| EnrichmentError::service(format!("invalid response body: {e}")))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| EnrichmentError::service("response has no message content"))?;
    Payload::parse(&content)
        .map_err(|e| EnrichmentError::service(format!("content is not a valid payload: {e}")))
}
