//! Groq text generation
//!
//! Blocking client for Groq's OpenAI-compatible chat completions endpoint.
//! Each prompt is sent as a single user message.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use super::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};

use super::TextGenerator;
use crate::error::SynthesisError;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Hosted text generator backed by Groq
pub struct GroqClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GroqClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SynthesisError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SynthesisError::MissingApiKey(DEFAULT_API_KEY_ENV.to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SynthesisError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            timeout,
        })
    }

    /// Read the API key from `key_env` and use the default model and endpoint
    pub fn from_env(key_env: &str, timeout: Duration) -> Result<Self, SynthesisError> {
        let api_key = std::env::var(key_env)
            .map_err(|_| SynthesisError::MissingApiKey(key_env.to_string()))?;
        Self::new(api_key, DEFAULT_MODEL, DEFAULT_BASE_URL, timeout)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl TextGenerator for GroqClient {
    fn name(&self) -> &str {
        "groq"
    }

    fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, SynthesisError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens,
        };

        debug!(model = %self.model, max_tokens, "sending chat completion request");
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        parse_completion(&body)
    }
}

impl GroqClient {
    fn transport_error(&self, e: reqwest::Error) -> SynthesisError {
        if e.is_timeout() {
            SynthesisError::Timeout(self.timeout)
        } else {
            SynthesisError::Http(e.to_string())
        }
    }
}

/// Map a non-success status to an error; 429 and 5xx stay transient
fn status_error(status: StatusCode, body: &str) -> SynthesisError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return SynthesisError::RateLimited;
    }
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|r| r.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());
    SynthesisError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Extract the first choice's text from a completion body.
///
/// Blank or null content is returned as an empty string; interpreting it is
/// up to the caller.
fn parse_completion(body: &str) -> Result<String, SynthesisError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| SynthesisError::InvalidResponse(e.to_string()))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| SynthesisError::InvalidResponse("completion has no choices".to_string()))?;
    Ok(choice
        .message
        .content
        .map(|content| content.trim().to_string())
        .unwrap_or_default())
}
