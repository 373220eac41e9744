//! Per-request pipeline state.

use serde::{Deserialize, Serialize};

use marginalia_index::QueryMatch;

use crate::messages::{PipelineResult, WorkerRequest};

/// A retrieved, filtered piece of past writing shown alongside its
/// similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snippet {
    pub id: String,
    pub title: String,
    pub content: String,
    /// `1 / (1 + distance)`, in `[0, 1]`.
    pub similarity: f32,
    pub source_path: String,
}

/// One web search hit, enriched in place as later stages scrape and
/// summarise it.  Fields are only ever added, never removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebSearchResult {
    pub query: String,
    pub title: String,
    pub url: String,
    pub description: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_error: Option<String>,
}

/// State for one pipeline run.  Request configuration (paragraph, source
/// path, goals, threshold) is fixed at construction; stage outputs
/// accumulate monotonically; no stage erases a prior stage's output.
#[derive(Debug)]
pub struct PipelineState {
    // ── request configuration (immutable after construction) ──────────────
    pub paragraph: String,
    pub source_path: String,
    pub user_goals: String,
    pub similarity_threshold: f32,
    pub top_k: usize,

    // ── accumulated stage output ───────────────────────────────────────────
    pub embedding: Vec<f32>,
    pub matches: Vec<QueryMatch>,
    pub snippets: Vec<Snippet>,
    pub summary: Option<String>,
    pub web_search_prompt: Option<String>,
    pub web_queries: Vec<String>,
    pub web_results: Vec<WebSearchResult>,
    pub synthesis: Option<String>,
}

impl PipelineState {
    pub fn new(request: WorkerRequest, similarity_threshold: f32, top_k: usize) -> Self {
        Self {
            paragraph: request.paragraph,
            source_path: request.source_path,
            user_goals: request.user_goals,
            similarity_threshold,
            top_k,
            embedding: Vec::new(),
            matches: Vec::new(),
            snippets: Vec::new(),
            summary: None,
            web_search_prompt: None,
            web_queries: Vec::new(),
            web_results: Vec::new(),
            synthesis: None,
        }
    }

    /// Assemble the terminal result from whatever the stages produced.
    pub fn into_result(self) -> PipelineResult {
        PipelineResult {
            snippets: self.snippets,
            summary: self.summary.unwrap_or_default(),
            web_search_prompt: self.web_search_prompt,
            web_search_results: self.web_results,
            synthesis: self.synthesis,
        }
    }
}
