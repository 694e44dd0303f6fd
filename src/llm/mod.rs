// LLM module
// Blocking client for OpenAI-compatible chat-completions services

#[cfg(test)]
mod tests;

use std::fmt;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::LlmConfig;
use crate::{RagError, Result};

/// A text-in, text-out language model
pub trait LanguageModel: Send + Sync + fmt::Debug {
    fn invoke(&self, prompt: &str) -> Result<String>;
}

/// Sends prompts as single user messages to `{base_url}/chat/completions`
#[derive(Clone)]
pub struct ChatClient {
    endpoint: Url,
    model: String,
    temperature: f32,
    top_p: f32,
    max_tokens: Option<u32>,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
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

impl ChatClient {
    #[inline]
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let base = config.base_url.trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/chat/completions"))
            .map_err(|e| RagError::Config(format!("Invalid LLM base URL {base}: {e}")))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_output_tokens(),
            api_key: config.api_key.clone(),
            agent,
        })
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        debug!(
            "Sending {} char prompt to {} ({})",
            prompt.chars().count(),
            self.endpoint,
            self.model
        );

        let mut builder = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response_text = builder
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|error| {
                warn!("Chat completion request failed: {}", error);
                match error {
                    ureq::Error::StatusCode(status) => {
                        anyhow::anyhow!("Chat completion failed: HTTP {}", status)
                    }
                    other => anyhow::anyhow!("Chat completion request error: {}", other),
                }
            })?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .context("Failed to parse chat completion response")?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("Chat completion response contained no message"))
    }
}

impl LanguageModel for ChatClient {
    fn invoke(&self, prompt: &str) -> Result<String> {
        self.complete(prompt)
            .map_err(|e| RagError::Llm(format!("{e:#}")))
    }
}
