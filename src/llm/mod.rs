use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

pub mod prompt;

// Fixed sampling parameters, non-streaming. Kept low so the model sticks to
// the JSON schema in the system prompt.
const TEMPERATURE: f32 = 0.1;
const TOP_P: f32 = 0.1;
const REPEAT_PENALTY: f32 = 1.2;

/// Transport-class failures of the inference call. None of these permit
/// fallback parsing, there is no model output to fall back on.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("failed to reach LLM server: {0}")]
    Request(String),
    #[error("LLM request timed out")]
    Timeout,
    #[error("LLM server returned status {0}")]
    Status(u16),
    #[error("invalid response from LLM server: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else if e.is_decode() {
            LlmError::InvalidResponse(e.to_string())
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

/// Seam for the inference server, mocked in the scheduler tests.
#[async_trait]
pub trait LlmBackend: Send + Sync + 'static {
    async fn chat(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
    stream: bool,
}

impl<'a> ChatRequest<'a> {
    fn new(system: &'a str, user: &'a str) -> Self {
        Self {
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: TEMPERATURE,
            top_p: TOP_P,
            repeat_penalty: REPEAT_PENALTY,
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for a llama.cpp style `/v1/chat/completions` endpoint.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
}

impl LlmClient {
    /// Builds the client eagerly so a bad configuration surfaces at startup,
    /// not on the first queued task.
    pub fn new(base_url: &str, response_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(response_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LlmBackend for LlmClient {
    async fn chat(&self, system: &str, user: &str) -> Result<String, LlmError> {
        info!("Requesting chat completion from {}", self.base_url);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&ChatRequest::new(system, user))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("LLM server returned status {}", status);
            return Err(LlmError::Status(status.as_u16()));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("empty completion".to_string()))?;

        debug!("LLM response: {}", content);
        Ok(content)
    }
}
