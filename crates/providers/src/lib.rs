//! External providers consumed by the pipeline: embeddings, text generation,
//! web search, and page scraping.
//!
//! Shared policy: a failed provider call never unwinds the pipeline.
//! Embedding has its deterministic fallback built in; generation and search
//! return `Err` and the calling stage substitutes its own fallback value.

pub mod embed;
pub mod generate;
pub mod scrape;
pub mod search;

use marginalia_config::ProviderConfig;

pub use embed::{EmbedClient, FALLBACK_DIM, fallback_embedding};
pub use generate::GenerateClient;
pub use scrape::ScrapeClient;
pub use search::{SearchClient, SearchHit};

/// Bundle of provider clients handed to the pipeline.
pub struct Providers {
    pub embed: EmbedClient,
    pub generate: GenerateClient,
    pub search: SearchClient,
    pub scrape: ScrapeClient,
}

impl Providers {
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            embed: EmbedClient::new(&config.ollama_base_url, &config.embed_model),
            generate: GenerateClient::new(
                &config.ollama_base_url,
                &config.chat_model,
                &config.openrouter_model,
            ),
            search: SearchClient::new(brave_key(config)),
            scrape: ScrapeClient::new(),
        }
    }
}

/// Resolve the Brave API key: config field, then env var, then none.
fn brave_key(config: &ProviderConfig) -> Option<String> {
    let from_config = config.brave_api_key.trim();
    if !from_config.is_empty() {
        return Some(from_config.to_string());
    }
    std::env::var("BRAVE_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
}
