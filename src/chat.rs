//! Chat completion side-channel.
//!
//! Forwards finished transcript text to a remote chat provider and returns
//! the assistant's reply. This is a thin request/response wrapper over an
//! OpenAI-compatible endpoint; the interesting part is only the small
//! payload differences between providers.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use crate::config::ChatConfig;
use crate::error::{Result, ScribecastError};

/// Remote provider families with payload quirks worth knowing about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiProvider {
    OpenAi,
    DeepSeek,
    /// Anything else speaking the OpenAI-compatible chat shape.
    Generic,
}

impl ApiProvider {
    /// Detects the provider family from the endpoint URL.
    pub fn detect(url: &str) -> Self {
        if url.contains("openai.com") {
            Self::OpenAi
        } else if url.contains("deepseek.com") {
            Self::DeepSeek
        } else {
            Self::Generic
        }
    }
}

/// Seam for the chat collaborator, mockable in tests.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Sends one prompt and returns the assistant's reply text.
    ///
    /// `starred` applies the configured system instructions to the request.
    async fn complete(&self, prompt: &str, starred: bool) -> Result<String>;
}

/// HTTP chat client over an OpenAI-compatible completion endpoint.
pub struct ChatClient {
    http: reqwest::Client,
    config: ChatConfig,
    provider: ApiProvider,
    api_key: Option<String>,
}

impl ChatClient {
    /// Builds a client from configuration; the API key is read from the
    /// configured environment variable, if set.
    pub fn new(config: ChatConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        let provider = ApiProvider::detect(&config.url);
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());

        Ok(Self {
            http,
            config,
            provider,
            api_key,
        })
    }

    /// Provider family this client talks to.
    pub fn provider(&self) -> ApiProvider {
        self.provider
    }

    /// Builds the request payload for one prompt.
    fn build_payload(&self, prompt: &str, starred: bool) -> Value {
        let mut payload = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        match self.provider {
            ApiProvider::OpenAi => {
                payload["top_p"] = json!(1.0);
            }
            ApiProvider::DeepSeek => {
                payload["stream"] = json!(false);
            }
            ApiProvider::Generic => {}
        }

        let messages = if starred && !self.config.system_prompt.is_empty() {
            match self.provider {
                // DeepSeek responds better with instructions merged into
                // the user message than with a system role.
                ApiProvider::DeepSeek => json!([{
                    "role": "user",
                    "content": format!(
                        "[INSTRUCTIONS]: {}\n\n[QUESTION]: {}",
                        self.config.system_prompt, prompt
                    ),
                }]),
                _ => json!([
                    {"role": "system", "content": self.config.system_prompt},
                    {"role": "user", "content": prompt},
                ]),
            }
        } else {
            json!([{"role": "user", "content": prompt}])
        };
        payload["messages"] = messages;

        payload
    }

    /// Extracts the assistant's reply from a completion response body.
    fn parse_reply(body: &Value) -> Result<String> {
        if let Some(error) = body.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown provider error")
                .to_string();
            return Err(ScribecastError::ChatProvider { message });
        }

        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ScribecastError::ChatResponse {
                message: "missing choices[0].message.content".to_string(),
            })
    }
}

#[async_trait]
impl ChatProvider for ChatClient {
    async fn complete(&self, prompt: &str, starred: bool) -> Result<String> {
        let payload = self.build_payload(prompt, starred);
        debug!(url = %self.config.url, starred, "sending chat completion request");

        let mut request = self.http.post(&self.config.url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let body: Value = request.send().await?.json().await?;
        Self::parse_reply(&body)
    }
}
