//! Host ↔ worker message envelope.
//!
//! One logical channel carries requests in and streams results back out.
//! Every payload is JSON-serialisable so the worker boundary could move out
//! of process without changing the contract.

use serde::{Deserialize, Serialize};

use crate::state::{Snippet, WebSearchResult};

/// The `run` payload handed to a freshly spawned worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerRequest {
    pub paragraph: String,
    pub source_path: String,
    #[serde(default)]
    pub user_goals: String,
}

/// Terminal payload: everything the pipeline produced for one trigger.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineResult {
    pub snippets: Vec<Snippet>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_search_prompt: Option<String>,
    #[serde(default)]
    pub web_search_results: Vec<WebSearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<String>,
}

/// Any subset of result fields, streamed before the terminal message and
/// merged field-wise by the host into its pending result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippets: Option<Vec<Snippet>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_search_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_search_results: Option<Vec<WebSearchResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<String>,
}

impl ResultPatch {
    /// Merge this patch into `pending`.  Present fields replace; absent
    /// fields leave the pending value untouched, so merging is monotone.
    pub fn apply(self, pending: &mut PipelineResult) {
        if let Some(snippets) = self.snippets {
            pending.snippets = snippets;
        }
        if let Some(summary) = self.summary {
            pending.summary = summary;
        }
        if let Some(prompt) = self.web_search_prompt {
            pending.web_search_prompt = Some(prompt);
        }
        if let Some(results) = self.web_search_results {
            pending.web_search_results = results;
        }
        if let Some(synthesis) = self.synthesis {
            pending.synthesis = Some(synthesis);
        }
    }
}

/// Worker → host stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum WorkerMessage {
    Result(PipelineResult),
    IncrementalUpdate(ResultPatch),
    Error { message: String },
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(id: &str) -> Snippet {
        Snippet {
            id: id.to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
            similarity: 0.9,
            source_path: "/notes/a.md".to_string(),
        }
    }

    // ── Envelope tags ──────────────────────────────────────────────────────

    #[test]
    fn message_tags_are_kebab_case() {
        let result = serde_json::to_value(WorkerMessage::Result(PipelineResult::default())).unwrap();
        assert_eq!(result["type"], "result");

        let update =
            serde_json::to_value(WorkerMessage::IncrementalUpdate(ResultPatch::default())).unwrap();
        assert_eq!(update["type"], "incremental-update");

        let error = serde_json::to_value(WorkerMessage::Error {
            message: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(error["type"], "error");
        assert_eq!(error["payload"]["message"], "boom");
    }

    #[test]
    fn message_round_trips_through_json() {
        let msg = WorkerMessage::IncrementalUpdate(ResultPatch {
            summary: Some("so far".to_string()),
            ..Default::default()
        });
        let json = serde_json::to_string(&msg).unwrap();
        let back: WorkerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn request_missing_goals_defaults_to_empty() {
        let json = r#"{"paragraph":"p","source_path":"/a.md"}"#;
        let req: WorkerRequest = serde_json::from_str(json).unwrap();
        assert!(req.user_goals.is_empty());
    }

    // ── Patch merge ────────────────────────────────────────────────────────

    #[test]
    fn patch_replaces_present_fields_only() {
        let mut pending = PipelineResult {
            snippets: vec![snippet("a")],
            summary: "old".to_string(),
            ..Default::default()
        };

        ResultPatch {
            summary: Some("new".to_string()),
            ..Default::default()
        }
        .apply(&mut pending);

        assert_eq!(pending.summary, "new");
        assert_eq!(pending.snippets.len(), 1, "absent field untouched");
    }

    #[test]
    fn successive_patches_accumulate() {
        let mut pending = PipelineResult::default();

        ResultPatch {
            snippets: Some(vec![snippet("a")]),
            summary: Some("summary".to_string()),
            ..Default::default()
        }
        .apply(&mut pending);

        ResultPatch {
            synthesis: Some("one sentence".to_string()),
            ..Default::default()
        }
        .apply(&mut pending);

        assert_eq!(pending.snippets.len(), 1);
        assert_eq!(pending.summary, "summary");
        assert_eq!(pending.synthesis.as_deref(), Some("one sentence"));
    }

    #[test]
    fn empty_patch_is_a_no_op() {
        let mut pending = PipelineResult {
            summary: "kept".to_string(),
            ..Default::default()
        };
        ResultPatch::default().apply(&mut pending);
        assert_eq!(pending.summary, "kept");
    }
}
