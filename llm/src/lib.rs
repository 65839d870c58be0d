//! Minimal OpenAI-compatible chat completions client.
//!
//! This crate provides a focused client for the `/chat/completions` endpoint with:
//! - Environment-driven configuration
//! - Retry with exponential backoff for transient failures
//! - Rate-limit handling that honours `Retry-After`
//! - Early bail-out when the account has no remaining quota

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_MAX_TOKENS: usize = 150;
const DEFAULT_TEMPERATURE: f32 = 0.6;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(60);
const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

/// Errors that can occur when using the client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Quota exceeded: add billing details or credits to the account")]
    QuotaExceeded,

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::NoApiKey | Error::QuotaExceeded | Error::Config(_)
        )
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub max_tokens: usize,
    pub temperature: f32,
    /// Companion suggestions always use the caller's stub when set.
    pub skip_companion: bool,
}

impl LlmConfig {
    /// Create a config with the given API key and defaults for everything else.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            skip_companion: false,
        }
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_BASE_URL`,
    /// `OPENAI_TEMPERATURE` and `OPENAI_SKIP_COMPANION` from the environment.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Error::NoApiKey);
        }

        let mut config = Self::new(api_key);
        if let Some(model) = non_empty_var("OPENAI_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = non_empty_var("OPENAI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(temperature) = non_empty_var("OPENAI_TEMPERATURE")
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|t| t.is_finite())
        {
            config = config.with_temperature(temperature);
        }
        config.skip_companion = non_empty_var("OPENAI_SKIP_COMPANION")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sampling temperature, clamped to the API's `0.0..=2.0`.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_skip_companion(mut self, skip: bool) -> Self {
        self.skip_companion = skip;
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes")
}

/// Chat completions client.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new client from a config.
    pub fn new(config: LlmConfig) -> Result<Self, Error> {
        if config.api_key.trim().is_empty() {
            return Err(Error::NoApiKey);
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::new(LlmConfig::from_env()?)
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Send a single completion request.
    pub async fn complete(&self, request: &Request) -> Result<Response, Error> {
        let api_request = self.build_api_request(request);
        let headers = self.build_headers()?;

        tracing::debug!(model = %api_request.model, "chat completion request");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body, retry_after));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        parse_response(api_response)
    }

    /// Send a request, retrying transient failures.
    ///
    /// Quota exhaustion returns immediately. Rate limits wait for `Retry-After`
    /// (or a minute); other failures back off exponentially from one second.
    pub async fn complete_with_retries(&self, request: &Request) -> Result<Response, Error> {
        let attempts = self.config.max_retries.max(1);
        let mut attempt = 0;
        loop {
            match self.complete(request).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    attempt += 1;
                    if !err.is_retryable() || attempt >= attempts {
                        tracing::warn!(error = %err, attempt, "chat completion failed");
                        return Err(err);
                    }
                    let delay = retry_delay(&err, attempt - 1);
                    tracing::debug!(error = %err, ?delay, attempt, "retrying chat completion");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Convenience wrapper: one system prompt, one user prompt, text back.
    pub async fn chat(&self, system: &str, user: &str) -> Result<String, Error> {
        let request = Request::new(vec![Message::system(system), Message::user(user)]);
        let response = self.complete_with_retries(&request).await?;
        Ok(response.text.trim().to_string())
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }

    fn build_api_request(&self, request: &Request) -> ApiRequest {
        ApiRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: request.temperature.unwrap_or(self.config.temperature),
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
        }
    }
}

/// Map a non-success HTTP status and body to an error.
pub fn classify_failure(status: u16, body: &str, retry_after: Option<Duration>) -> Error {
    let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
    let (message, code) = match parsed {
        Some(ApiErrorBody { error }) => (error.message, error.code.unwrap_or_default()),
        None => (body.to_string(), String::new()),
    };

    if status == 429 {
        if code == "insufficient_quota" || message.contains("insufficient_quota") {
            return Error::QuotaExceeded;
        }
        return Error::RateLimited {
            message,
            retry_after,
        };
    }
    if status == 401 {
        return Error::Config(format!("API key rejected: {message}"));
    }
    Error::Api { status, message }
}

/// Delay before the retry that follows a failed attempt (0-based).
pub fn retry_delay(err: &Error, attempt: u32) -> Duration {
    match err {
        Error::RateLimited { retry_after, .. } => retry_after.unwrap_or(RATE_LIMIT_DELAY),
        _ => RETRY_BASE_DELAY * 2u32.saturating_pow(attempt),
    }
}

/// Seconds from a Retry-After header, capped at [`MAX_RETRY_AFTER`].
fn parse_retry_after(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    if !secs.is_finite() {
        return None;
    }
    Duration::try_from_secs_f64(secs.min(MAX_RETRY_AFTER.as_secs_f64())).ok()
}

fn parse_response(api_response: ApiResponse) -> Result<Response, Error> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Parse("response contained no choices".to_string()))?;

    Ok(Response {
        id: api_response.id,
        model: api_response.model,
        text: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        usage: api_response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default(),
    })
}

// ============================================================================
// Public types
// ============================================================================

/// A completion request.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

impl Request {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: None,
            messages,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A message in the conversation.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A completion response.
#[derive(Debug, Clone)]
pub struct Response {
    pub id: String,
    pub model: String,
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

/// Token usage information.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}
