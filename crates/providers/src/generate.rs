//! Text generation with local-first routing.
//!
//! Ollama is the primary backend; when it fails and `OPENROUTER_API_KEY` is
//! set, the same prompt is retried against OpenRouter.  Errors propagate as
//! `Err`; the calling pipeline stage owns the deterministic fallback text.

use std::time::Duration;

use anyhow::{Result, anyhow};
use serde_json::json;
use tracing::debug;

pub struct GenerateClient {
    client: reqwest::Client,
    ollama_url: String,
    chat_model: String,
    openrouter_model: String,
}

impl GenerateClient {
    pub fn new(base_url: &str, chat_model: &str, openrouter_model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            client,
            ollama_url: format!("{}/api/generate", base_url.trim_end_matches('/')),
            chat_model: chat_model.to_string(),
            openrouter_model: openrouter_model.to_string(),
        }
    }

    /// Generate text for `prompt`, capped at roughly `max_tokens`.
    pub async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        match self.generate_ollama(prompt, max_tokens).await {
            Ok(text) => Ok(text),
            Err(err) => {
                debug!(?err, "ollama generation failed; trying openrouter");
                self.generate_openrouter(prompt, max_tokens).await
            }
        }
    }

    async fn generate_ollama(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let payload = json!({
            "model": self.chat_model,
            "prompt": prompt,
            "stream": false,
            "options": { "num_predict": max_tokens },
        });

        let resp = self.client.post(&self.ollama_url).json(&payload).send().await?;
        let status = resp.status();
        let body: serde_json::Value = resp.json().await?;
        if !status.is_success() {
            return Err(anyhow!("ollama error ({status}): {body}"));
        }
        body["response"]
            .as_str()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("ollama response missing text"))
    }

    async fn generate_openrouter(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("OPENROUTER_API_KEY not set"))?;

        let payload = json!({
            "model": self.openrouter_model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": max_tokens,
        });

        let resp = self
            .client
            .post("https://openrouter.ai/api/v1/chat/completions")
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;
        let status = resp.status();
        let body: serde_json::Value = resp.json().await?;
        if !status.is_success() {
            return Err(anyhow!("openrouter error ({status}): {body}"));
        }
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("openrouter response missing content"))
    }
}
