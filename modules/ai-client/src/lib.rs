//! OpenAI-compatible chat-completions client.

mod types;

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use types::{ChatRequest, ChatResponse, WireMessage};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_COMPLETION_TOKENS: u32 = 4096;

/// Handle on an OpenAI-compatible chat-completions endpoint. Cheap to clone;
/// the underlying connection pool is shared between clones.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    endpoint: String,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key, model))
    }

    /// Point at a compatible endpoint (Ollama, vLLM, proxies). Takes the base
    /// URL ("https://llm.internal/v1") and derives the completions path.
    pub fn with_base_url(mut self, url: impl AsRef<str>) -> Self {
        self.endpoint = format!("{}/chat/completions", url.as_ref().trim_end_matches('/'));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One system+user exchange at the given temperature.
    pub async fn chat(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        debug!(model = %self.model, "chat completion request");

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![WireMessage::system(system), WireMessage::user(user)],
            temperature: Some(temperature),
            max_tokens: Some(MAX_COMPLETION_TOKENS),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("chat completion rejected ({status}): {body}"));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("failed to parse chat completion")?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("chat completion returned no content"))
    }

    /// Deterministic exchange (temperature 0) for extraction-style calls.
    pub async fn chat_deterministic(&self, system: &str, user: &str) -> Result<String> {
        self.chat(system, user, 0.0).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_targets_the_default_endpoint() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini");
        assert_eq!(ai.model(), "gpt-4o-mini");
        assert_eq!(ai.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn with_base_url_derives_the_completions_path() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini").with_base_url("https://llm.internal/v1/");
        assert_eq!(ai.endpoint, "https://llm.internal/v1/chat/completions");
    }
}
