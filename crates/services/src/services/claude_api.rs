//! HTTP client for the Anthropic Messages API.
//!
//! All AI features in the app go through this client. Calls retry with
//! exponential backoff on transient failures, and JSON answers are pulled
//! out of markdown code fences before parsing.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Clone, Error)]
pub enum ClaudeApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("bad response payload: {0}")]
    Payload(String),
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,
}

impl ClaudeApiError {
    /// Transient errors worth retrying; auth and payload errors are not.
    fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

impl MessagesResponse {
    fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClaudeApiClient {
    http: Client,
    api_key: String,
    model: String,
}

impl ClaudeApiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn from_env() -> Result<Self, ClaudeApiError> {
        let api_key =
            std::env::var("ANTHROPIC_API_KEY").map_err(|_| ClaudeApiError::MissingApiKey)?;
        Self::new(api_key, None)
    }

    pub fn new(api_key: String, model: Option<String>) -> Result<Self, ClaudeApiError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("crewdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClaudeApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    /// Send a single user prompt and return the model's text answer.
    pub async fn ask(&self, prompt: &str, system: Option<String>) -> Result<String, ClaudeApiError> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages: vec![Message::user(prompt)],
            system,
        };

        let response = (|| async { self.send_request(&request).await })
            .retry(
                &ExponentialBuilder::default()
                    .with_min_delay(Duration::from_secs(1))
                    .with_max_delay(Duration::from_secs(20))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(ClaudeApiError::should_retry)
            .notify(|e, dur| {
                warn!(
                    "Claude API call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await?;

        response
            .text()
            .map(str::to_string)
            .ok_or_else(|| ClaudeApiError::Payload("no text content in response".to_string()))
    }

    /// Send a prompt whose answer is expected to be JSON, possibly wrapped
    /// in a markdown code fence, and deserialize it into `T`.
    pub async fn ask_json<T: for<'de> Deserialize<'de>>(
        &self,
        prompt: &str,
        system: Option<String>,
    ) -> Result<T, ClaudeApiError> {
        let answer = self.ask(prompt, system).await?;
        if answer.trim().is_empty() {
            return Err(ClaudeApiError::Payload("empty response".to_string()));
        }

        let json_str = extract_json(&answer);
        serde_json::from_str(json_str).map_err(|e| {
            error!(
                json_error = %e,
                preview = %json_str.chars().take(200).collect::<String>(),
                "could not parse JSON answer"
            );
            ClaudeApiError::Payload(e.to_string())
        })
    }

    async fn send_request(
        &self,
        request: &MessagesRequest,
    ) -> Result<MessagesResponse, ClaudeApiError> {
        let res = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<MessagesResponse>()
                .await
                .map_err(|e| ClaudeApiError::Payload(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(ClaudeApiError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => Err(ClaudeApiError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(ClaudeApiError::Http { status, body })
            }
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ClaudeApiError {
    if e.is_timeout() {
        ClaudeApiError::Timeout
    } else {
        ClaudeApiError::Transport(e.to_string())
    }
}

/// Strip a surrounding ```json / ``` fence if the model added one.
fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let inner = start + "```json".len();
        if let Some(end) = text[inner..].find("```") {
            return text[inner..inner + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let mut inner = start + 3;
        // A language tag may follow the opening fence on the same line.
        if let Some(nl) = text[inner..].find('\n') {
            inner += nl + 1;
        }
        if let Some(end) = text[inner..].find("```") {
            return text[inner..inner + end].trim();
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_passes_bare_json_through() {
        assert_eq!(extract_json(r#"{"title": "Intro"}"#), r#"{"title": "Intro"}"#);
    }

    #[test]
    fn extract_json_unwraps_json_fence() {
        let input = "Sure, here you go:\n```json\n{\"title\": \"Intro\"}\n```\nanything else?";
        assert_eq!(extract_json(input), r#"{"title": "Intro"}"#);
    }

    #[test]
    fn extract_json_unwraps_plain_fence_with_language_tag() {
        let input = "```javascript\n{\"wisdom\": \"ship early\"}\n```";
        assert_eq!(extract_json(input), r#"{"wisdom": "ship early"}"#);
    }

    #[test]
    fn retry_skips_client_errors() {
        assert!(!ClaudeApiError::InvalidApiKey.should_retry());
        assert!(!ClaudeApiError::Http {
            status: 400,
            body: String::new()
        }
        .should_retry());
        assert!(ClaudeApiError::Http {
            status: 503,
            body: String::new()
        }
        .should_retry());
        assert!(ClaudeApiError::RateLimited.should_retry());
    }
}
