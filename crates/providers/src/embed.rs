//! Paragraph embeddings with a deterministic local fallback.

use std::time::Duration;

use serde_json::json;
use tracing::debug;

/// Dimension of the deterministic fallback embedding.
pub const FALLBACK_DIM: usize = 256;

pub struct EmbedClient {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl EmbedClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: format!("{}/api/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
        }
    }

    /// Embed `text`, falling back to [`fallback_embedding`] on any provider
    /// failure so the pipeline never blocks on a missing credential or an
    /// unreachable endpoint.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        match self.remote_embed(text).await {
            Some(vector) => vector,
            None => {
                debug!("embedding provider unavailable; using deterministic fallback");
                fallback_embedding(text)
            }
        }
    }

    async fn remote_embed(&self, text: &str) -> Option<Vec<f32>> {
        let body = json!({ "model": self.model, "prompt": text });
        let resp = self.client.post(&self.url).json(&body).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let body: serde_json::Value = resp.json().await.ok()?;
        let embedding = body["embedding"]
            .as_array()?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Vec<f32>>();
        if embedding.is_empty() { None } else { Some(embedding) }
    }
}

/// Deterministic embedding derived from character codes: identical input
/// yields an identical `FALLBACK_DIM`-length vector.  Semantically crude, but
/// keeps nearest-neighbour ordering stable for repeated text.
pub fn fallback_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0_f32; FALLBACK_DIM];
    for (position, ch) in text.chars().enumerate() {
        let code = ch as u32;
        let slot = (code as usize + position) % FALLBACK_DIM;
        vector[slot] += ((code % 97) + 1) as f32 / 97.0;
    }

    // L2-normalise so cosine distances stay well conditioned.
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_has_fixed_length() {
        assert_eq!(fallback_embedding("hello").len(), FALLBACK_DIM);
        assert_eq!(fallback_embedding("").len(), FALLBACK_DIM);
    }

    #[test]
    fn fallback_is_deterministic_for_identical_input() {
        let text = "Ideas for app X.";
        assert_eq!(fallback_embedding(text), fallback_embedding(text));
    }

    #[test]
    fn fallback_differs_for_different_input() {
        assert_ne!(fallback_embedding("alpha"), fallback_embedding("omega"));
    }

    #[test]
    fn fallback_is_unit_length_for_nonempty_input() {
        let v = fallback_embedding("some paragraph of writing");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
}
