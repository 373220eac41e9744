use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

// ── Watch config ──────────────────────────────────────────────────────────────

/// Settings for the document watcher: which directory is observed and which
/// file extensions count as documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory of append-only text documents to observe.
    pub dir: String,
    /// File extensions (without dot) treated as watchable documents.
    pub extensions: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            dir: "./notes".to_string(),
            extensions: vec!["md".to_string(), "txt".to_string()],
        }
    }
}

// ── Index config ──────────────────────────────────────────────────────────────

/// Vector index backend selection.
///
/// | Backend  | Behaviour                                                    |
/// |----------|--------------------------------------------------------------|
/// | `auto`   | Probe the remote service; fall back to in-memory on failure. |
/// | `chroma` | Remote service only (startup fails if unreachable).          |
/// | `memory` | In-process index only.                                       |
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: String,
    /// Base URL of the Chroma-compatible vector service.  Overridden at
    /// runtime by the `CHROMA_URL` environment variable when set.
    pub chroma_url: String,
    /// Collection holding document and paragraph records.
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: "auto".to_string(),
            chroma_url: "http://localhost:8000".to_string(),
            collection: "marginalia".to_string(),
        }
    }
}

// ── Pipeline config ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum similarity (`1 / (1 + distance)`) a retrieved record needs to
    /// surface as a snippet.  Title records bypass this threshold.
    pub similarity_threshold: f32,
    /// Nearest neighbours requested from the index per trigger.
    pub top_k: usize,
    /// Optional free-form writing goals injected into summarisation prompts.
    pub user_goals: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.75,
            top_k: 10,
            user_goals: String::new(),
        }
    }
}

// ── Provider config ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL for the Ollama API.  Overridden at runtime by the
    /// `OLLAMA_BASE_URL` environment variable when set.
    pub ollama_base_url: String,
    /// Model used for the `/api/embeddings` endpoint.
    pub embed_model: String,
    /// Model used for local text generation.
    pub chat_model: String,
    /// Model used when falling back to OpenRouter (requires
    /// `OPENROUTER_API_KEY`).
    pub openrouter_model: String,
    /// Brave Search API key.  When non-empty, web search uses the Brave REST
    /// API; DuckDuckGo Instant Answers is the keyless secondary.  Can also be
    /// set via the `BRAVE_API_KEY` env var (env takes precedence).
    pub brave_api_key: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            chat_model: "llama3.1:8b".to_string(),
            openrouter_model: "openai/gpt-4o-mini".to_string(),
            brave_api_key: String::new(),
        }
    }
}

// ── Telemetry config ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// ── AppConfig ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub watch: WatchConfig,
    pub index: IndexConfig,
    pub pipeline: PipelineConfig,
    pub providers: ProviderConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file is absent.  Environment variables override file values so that
    /// secrets never need to live on disk.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        if let Ok(url) = env::var("OLLAMA_BASE_URL") {
            if !url.is_empty() {
                config.providers.ollama_base_url = url;
            }
        }

        if let Ok(url) = env::var("CHROMA_URL") {
            if !url.is_empty() {
                config.index.chroma_url = url;
            }
        }

        // Brave API key env override (takes precedence over config file).
        if let Ok(key) = env::var("BRAVE_API_KEY") {
            if !key.is_empty() {
                config.providers.brave_api_key = key;
            }
        }

        if let Ok(dir) = env::var("MARGINALIA_WATCH_DIR") {
            if !dir.is_empty() {
                config.watch.dir = dir;
            }
        }

        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
