//! Claude-backed [`ChatProvider`].
//!
//! One plain reqwest client against the Messages API. System messages are
//! hoisted into the API's top-level `system` field; everything else goes
//! into the message array in order. Credentials come from secret.json
//! first, then the `ANTHROPIC_API_KEY` environment variable.

use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use async_trait::async_trait;
use strategist_infrastructure::SecretStorage;

use crate::chat::{ChatError, ChatProvider, ChatRequest, ChatRole};

const BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct ClaudeChatProvider {
    client: Client,
    api_key: String,
}

impl ClaudeChatProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Builds a provider from secret.json, falling back to the
    /// `ANTHROPIC_API_KEY` environment variable.
    pub fn try_from_env() -> Result<Self, ChatError> {
        if let Ok(storage) = SecretStorage::new() {
            if let Ok(secrets) = storage.load() {
                if let Some(chat) = secrets.chat {
                    if !chat.api_key.trim().is_empty() {
                        tracing::debug!("using Claude API key from secret.json");
                        return Ok(Self::new(chat.api_key));
                    }
                }
            }
        }

        let api_key = env::var("ANTHROPIC_API_KEY").map_err(|_| {
            ChatError::NotConfigured(
                "ANTHROPIC_API_KEY not found in secret.json or environment variables".into(),
            )
        })?;

        tracing::debug!("using Claude API key from environment");
        Ok(Self::new(api_key))
    }

    async fn send_request(&self, body: &CreateMessageRequest) -> Result<String, ChatError> {
        let response = self
            .client
            .post(BASE_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| ChatError::Transport {
                status: None,
                message: format!("Claude API request failed: {err}"),
                retryable: err.is_connect() || err.is_timeout(),
                retry_after: None,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Claude error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: CreateMessageResponse =
            response.json().await.map_err(|err| ChatError::Transport {
                status: None,
                message: format!("Failed to parse Claude response: {err}"),
                retryable: false,
                retry_after: None,
            })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl ChatProvider for ClaudeChatProvider {
    fn check_configuration(&self) -> Result<(), ChatError> {
        if self.api_key.trim().is_empty() {
            return Err(ChatError::NotConfigured(
                "Claude API key is empty".to_string(),
            ));
        }
        Ok(())
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, ChatError> {
        self.check_configuration()?;

        // The Messages API takes the system prompt out of band.
        let mut system_parts = Vec::new();
        let mut messages = Vec::new();
        for message in &request.messages {
            match message.role {
                ChatRole::System => system_parts.push(message.content.clone()),
                ChatRole::User => messages.push(Message {
                    role: "user",
                    content: message.content.clone(),
                }),
                ChatRole::Assistant => messages.push(Message {
                    role: "assistant",
                    content: message.content.clone(),
                }),
            }
        }

        if messages.is_empty() {
            return Err(ChatError::Transport {
                status: None,
                message: "Claude request must include at least one user message".into(),
                retryable: false,
                retry_after: None,
            });
        }

        let body = CreateMessageRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n\n"))
            },
        };

        self.send_request(&body).await
    }
}

#[derive(Serialize)]
struct CreateMessageRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockResponse {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: CreateMessageResponse) -> Result<String, ChatError> {
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlockResponse::Text { text } => Some(text),
            ContentBlockResponse::Other => None,
        })
        .ok_or(ChatError::EmptyResponse)
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> ChatError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    let retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    ChatError::Transport {
        status: Some(status.as_u16()),
        message,
        retryable,
        retry_after,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    // Retry-After HTTP-date parsing is omitted; seconds form only
    value.parse::<u64>().ok().map(Duration::from_secs)
}
