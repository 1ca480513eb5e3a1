//! LLM Client — the single point of entry for all completion-service calls.
//!
//! ARCHITECTURAL RULE: No other module may call the completion API directly.
//! All LLM interactions MUST go through this module.
//!
//! Model: gpt-4o-mini (hardcoded — do not make configurable to prevent drift)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// The model used for every evaluation.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "gpt-4o-mini";
/// Low temperature keeps verdicts close to deterministic.
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1500;
const API_KEY_PREFIX: &str = "sk-";
const MIN_API_KEY_LEN: usize = 20;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Completion client could not be initialised: {0}")]
    ClientInit(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// The two role-tagged blocks sent per evaluation: system instruction first,
/// user instruction second. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessages([ChatMessage; 2]);

impl PromptMessages {
    pub fn new(system: String, user: String) -> Self {
        Self([
            ChatMessage {
                role: Role::System,
                content: system,
            },
            ChatMessage {
                role: Role::User,
                content: user,
            },
        ])
    }

    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.0
    }
}

/// Anything that can turn a prompt into raw completion text.
///
/// `LlmClient` is the production implementation; the evaluator only sees this
/// trait so tests can substitute a canned responder.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, messages: &PromptMessages) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatCompletionResponse {
    /// Text of the first completion choice, if any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// Chat-completions client. Constructed once at startup and injected into
/// the evaluator; there is no process-global client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// Validates the credential shape and builds the HTTP client.
    pub fn new(api_key: String, base_url: impl Into<String>) -> Result<Self, LlmError> {
        validate_api_key(&api_key)?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| LlmError::ClientInit(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Confirms the service accepts the credential by listing models.
    /// A 401/403 is reported as `ClientInit` so startup can fail fast.
    pub async fn verify(&self) -> Result<(), LlmError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::ClientInit(format!(
                "credential rejected by completion service (status {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }
        Ok(())
    }

    /// Makes a single chat-completion call. No retries: any transport or
    /// service failure is returned to the caller as-is.
    pub async fn call(
        &self,
        messages: &PromptMessages,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let request_body = ChatCompletionRequest {
            model: MODEL,
            messages: messages.as_slice(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }

        let completion: ChatCompletionResponse = response.json().await?;

        if let Some(usage) = &completion.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(completion)
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, messages: &PromptMessages) -> Result<String, LlmError> {
        let response = self.call(messages).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Rejects credentials that cannot possibly be valid before any network call.
pub fn validate_api_key(api_key: &str) -> Result<(), LlmError> {
    let key = api_key.trim();
    if key.is_empty() {
        return Err(LlmError::ClientInit("API key is empty".to_string()));
    }
    if key != api_key {
        return Err(LlmError::ClientInit(
            "API key contains leading or trailing whitespace".to_string(),
        ));
    }
    if !key.starts_with(API_KEY_PREFIX) {
        return Err(LlmError::ClientInit(format!(
            "API key must start with '{API_KEY_PREFIX}'"
        )));
    }
    if key.len() < MIN_API_KEY_LEN {
        return Err(LlmError::ClientInit(format!(
            "API key is too short (expected at least {MIN_API_KEY_LEN} characters)"
        )));
    }
    Ok(())
}

fn api_error(status: StatusCode, body: String) -> LlmError {
    let message = serde_json::from_str::<OpenAiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}
