//! Chat-completion client abstraction.
//!
//! Defines the [`ChatModel`] trait used by the keyword extractor and the
//! answer synthesizer, and [`AzureChatClient`], the implementation that talks
//! to an Azure OpenAI deployment.
//!
//! # Request shape
//!
//! ```text
//! POST {api_base}/openai/deployments/{deployment}/chat/completions?api-version={api_version}
//! api-key: <AZURE_OPENAI_API_KEY>
//!
//! { "messages": [{"role": "system", "content": "..."}, ...], "max_tokens": 20 }
//! ```
//!
//! The reply text is read from `choices[0].message.content`.
//!
//! Errors are returned as-is; there is no retry loop.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::models::ChatMessage;

/// A language model that turns a list of role-tagged messages into one reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the model or deployment identifier, for logging.
    fn model_name(&self) -> &str;

    /// Request a single completion, capped at `max_tokens`.
    async fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String>;
}

/// Azure OpenAI chat-completions client.
///
/// Built once at startup; the underlying `reqwest::Client` keeps its own
/// connection pool and is safe to share across requests.
pub struct AzureChatClient {
    client: reqwest::Client,
    endpoint: String,
    deployment: String,
    api_key: String,
}

impl AzureChatClient {
    /// Create a client from configuration and an explicit credential.
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            bail!("Azure OpenAI API key must not be empty");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: chat_endpoint(config),
            deployment: config.deployment.clone(),
            api_key,
        })
    }

    /// Create a client reading the credential from `AZURE_OPENAI_API_KEY`.
    pub fn from_env(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("AZURE_OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("AZURE_OPENAI_API_KEY environment variable not set"))?;
        Self::new(config, api_key)
    }
}

/// Full chat-completions URL for the configured deployment.
fn chat_endpoint(config: &LlmConfig) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        config.api_base.trim_end_matches('/'),
        config.deployment,
        config.api_version
    )
}

#[async_trait]
impl ChatModel for AzureChatClient {
    fn model_name(&self) -> &str {
        &self.deployment
    }

    async fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String> {
        let body = serde_json::json!({
            "messages": messages,
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Azure OpenAI request to '{}' failed", self.deployment))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Azure OpenAI API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }
}

/// Extract `choices[0].message.content`, trimmed.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid chat response: missing choices[0].message.content"))?;

    Ok(content.trim().to_string())
}
