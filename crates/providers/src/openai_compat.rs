//! OpenAI-compatible chat client.
//!
//! Works with Groq (the default), OpenAI, OpenRouter, Ollama, vLLM and any
//! other endpoint that exposes `/chat/completions`. Only non-streaming
//! single-turn completions are needed: a system prompt plus one user prompt.

use async_trait::async_trait;
use autolearn_config::LlmConfig;
use autolearn_core::error::CollaboratorError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A single-turn chat completion seam.
///
/// [`crate::llm::LlmCollaborators`] talks to this instead of HTTP directly so
/// prompts and reply parsing can be tested against scripted replies.
#[async_trait]
pub trait Chat: Send + Sync {
    fn name(&self) -> &str;

    /// Return the assistant's reply text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, CollaboratorError>;
}

/// An OpenAI-compatible HTTP chat client.
pub struct ChatClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl ChatClient {
    /// Create a client from the `[llm]` config section.
    pub fn new(config: &LlmConfig) -> Result<Self, CollaboratorError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            CollaboratorError::AuthenticationFailed(
                "No API key configured (set AUTOLEARN_API_KEY or GROQ_API_KEY)".into(),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CollaboratorError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, system: &str, user: &str) -> ApiRequest {
        ApiRequest {
            model: self.model.clone(),
            messages: vec![
                ApiMessage {
                    role: "system".into(),
                    content: system.to_string(),
                },
                ApiMessage {
                    role: "user".into(),
                    content: user.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        }
    }
}

/// Map a transport failure into the collaborator error taxonomy.
fn transport_error(e: reqwest::Error) -> CollaboratorError {
    if e.is_timeout() {
        CollaboratorError::Timeout(e.to_string())
    } else {
        CollaboratorError::Request {
            port: "chat".into(),
            message: e.to_string(),
        }
    }
}

/// Pull the first choice's content out of a parsed response.
fn first_choice(response: ApiResponse) -> Result<String, CollaboratorError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| CollaboratorError::InvalidResponse("No choices in response".into()))
}

#[async_trait]
impl Chat for ChatClient {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, CollaboratorError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(system, user);

        debug!(model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(CollaboratorError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(CollaboratorError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Chat endpoint returned error");
            return Err(CollaboratorError::Request {
                port: "chat".into(),
                message: format!("HTTP {status}: {error_body}"),
            });
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            CollaboratorError::InvalidResponse(format!("Failed to parse response: {e}"))
        })?;

        first_choice(api_response)
    }
}

// --- OpenAI API types ---

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiReply,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    content: Option<String>,
}
