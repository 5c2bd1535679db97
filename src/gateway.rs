//! Completion gateway: a single request/response call to a chat-completion
//! backend.
//!
//! Supports any server implementing the OpenAI chat completions API. The
//! gateway never touches the message store — the dialogue controller appends
//! the user message before calling and the assistant message after a
//! successful reply.

use crate::config::GatewayConfig;
use crate::error::{DialogueError, Result};
use crate::store::Message;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::info;

/// Outbound completion capability.
///
/// One blocking-equivalent call per request; both failure kinds
/// (`BackendUnavailable`, `Request`) are treated identically by the caller:
/// surfaced as an error narration event, never a crash.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send the ordered message history and return the assistant text.
    async fn complete(&self, messages: &[Message], max_tokens: u32) -> Result<String>;
}

/// HTTP backend using an OpenAI-compatible chat-completions API.
pub struct ApiGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl ApiGateway {
    /// Create a gateway from config. The request timeout is fixed and
    /// generous; a timeout surfaces as a request failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DialogueError::Config(format!("HTTP client build failed: {e}")))?;

        info!(
            "completion gateway configured: {} model={}",
            config.api_url, config.api_model
        );

        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    fn completions_url(&self) -> String {
        let base = match self.config.api_url.strip_suffix("/v1") {
            Some(u) => u,
            None => &self.config.api_url,
        };
        let base = base.trim_end_matches('/');
        format!("{base}/v1/chat/completions")
    }
}

#[async_trait]
impl CompletionBackend for ApiGateway {
    async fn complete(&self, messages: &[Message], max_tokens: u32) -> Result<String> {
        if self.config.api_key.trim().is_empty() {
            return Err(DialogueError::BackendUnavailable);
        }

        let body = serde_json::json!({
            "model": self.config.api_model,
            "messages": messages
                .iter()
                .map(|m| serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.text,
                }))
                .collect::<Vec<_>>(),
            "max_tokens": max_tokens,
        });

        let started = Instant::now();
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DialogueError::Request(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DialogueError::Request(format!(
                "backend returned {status}: {detail}"
            )));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DialogueError::Request(format!("malformed response: {e}")))?;

        let text = parsed["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| DialogueError::Request("empty choice list in response".to_owned()))?
            .to_owned();

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = text.len(),
            "completion received"
        );

        Ok(text)
    }
}
