//! The staged computation: an explicit ordered list of named stages over one
//! [`PipelineState`], composed by a small driver that also handles the
//! incremental-emission side channel.
//!
//! Branch A (embed → retrieve → filter → summarise) and Branch B (queries →
//! search → select → scrape → page summaries) share the input paragraph but
//! not each other's output; they run in sequence inside the single worker
//! task.  Synthesis runs after both.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use marginalia_index::{IndexError, QueryMatch, VectorIndex};
use marginalia_providers::Providers;

use crate::messages::{ResultPatch, WorkerMessage, WorkerRequest};
use crate::prompts;
use crate::state::{PipelineState, Snippet, WebSearchResult};

/// Search queries generated per trigger, at most.
const MAX_SEARCH_QUERIES: usize = 3;
/// Hits requested from the search provider per query.
const HITS_PER_QUERY: usize = 5;
/// Pages selected for deep reading.
const PAGES_TO_SCRAPE: usize = 2;
/// Pause between consecutive search queries (provider rate limits).
const INTER_QUERY_DELAY: Duration = Duration::from_millis(1100);
/// Token budgets for the generation-backed stages.
const SUMMARY_TOKENS: u32 = 300;
const QUERY_TOKENS: u32 = 120;
const SELECT_TOKENS: u32 = 40;
const SYNTHESIS_TOKENS: u32 = 80;

/// Emitted when neither branch produced usable content.
const NOTHING_AVAILABLE: &str =
    "No related notes or web findings are available for this paragraph yet.";

// ── Stage topology ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embed,
    Retrieve,
    Filter,
    Summarize,
    SearchPrompt,
    Search,
    SelectPages,
    Scrape,
    SummarizePages,
    Synthesize,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Embed => "embed",
            Self::Retrieve => "retrieve",
            Self::Filter => "filter",
            Self::Summarize => "summarize",
            Self::SearchPrompt => "search-prompt",
            Self::Search => "search",
            Self::SelectPages => "select-pages",
            Self::Scrape => "scrape",
            Self::SummarizePages => "summarize-pages",
            Self::Synthesize => "synthesize",
        }
    }
}

/// Fixed execution order.  No stage re-enters an earlier one; the single
/// exception is the one-shot reindex-and-retry inside `Retrieve`.
pub const STAGES: [Stage; 10] = [
    Stage::Embed,
    Stage::Retrieve,
    Stage::Filter,
    Stage::Summarize,
    Stage::SearchPrompt,
    Stage::Search,
    Stage::SelectPages,
    Stage::Scrape,
    Stage::SummarizePages,
    Stage::Synthesize,
];

/// Rebuilds the vector index from the source corpus.  Invoked exactly once
/// when a query reports a dimension mismatch.
#[async_trait]
pub trait Reindex: Send + Sync {
    async fn rebuild(&self) -> Result<()>;
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

/// Stateless across requests: each call to [`Orchestrator::run`] gets a fresh
/// [`PipelineState`].
pub struct Orchestrator {
    pub index: Arc<dyn VectorIndex>,
    pub providers: Arc<Providers>,
    pub reindex: Arc<dyn Reindex>,
}

impl Orchestrator {
    /// Execute every stage in order, streaming incremental updates through
    /// `emit` and finishing with a terminal `Result` or `Error` message.
    pub async fn run(
        &self,
        request: WorkerRequest,
        similarity_threshold: f32,
        top_k: usize,
        emit: mpsc::Sender<WorkerMessage>,
    ) {
        let mut state = PipelineState::new(request, similarity_threshold, top_k);

        for stage in STAGES {
            debug!(stage = stage.name(), "pipeline stage starting");
            if let Err(err) = self.run_stage(stage, &mut state, &emit).await {
                warn!(stage = stage.name(), ?err, "pipeline stage failed");
                let _ = emit
                    .send(WorkerMessage::Error {
                        message: format!("{} stage failed: {err:#}", stage.name()),
                    })
                    .await;
                return;
            }
        }

        let _ = emit.send(WorkerMessage::Result(state.into_result())).await;
    }

    async fn run_stage(
        &self,
        stage: Stage,
        state: &mut PipelineState,
        emit: &mpsc::Sender<WorkerMessage>,
    ) -> Result<()> {
        match stage {
            Stage::Embed => self.embed(state).await,
            Stage::Retrieve => self.retrieve(state).await,
            Stage::Filter => {
                state.snippets = filter_matches(
                    &state.matches,
                    state.similarity_threshold,
                    &state.source_path,
                );
                Ok(())
            }
            Stage::Summarize => {
                self.summarize(state).await;
                send_patch(
                    emit,
                    ResultPatch {
                        snippets: Some(state.snippets.clone()),
                        summary: state.summary.clone(),
                        ..Default::default()
                    },
                )
                .await;
                Ok(())
            }
            Stage::SearchPrompt => {
                self.search_prompt(state).await;
                Ok(())
            }
            Stage::Search => {
                self.search(state).await;
                send_patch(
                    emit,
                    ResultPatch {
                        web_search_prompt: state.web_search_prompt.clone(),
                        web_search_results: Some(state.web_results.clone()),
                        ..Default::default()
                    },
                )
                .await;
                Ok(())
            }
            Stage::SelectPages => {
                self.select_pages(state).await;
                Ok(())
            }
            Stage::Scrape => {
                self.scrape(state).await;
                Ok(())
            }
            Stage::SummarizePages => {
                self.summarize_pages(state).await;
                send_patch(
                    emit,
                    ResultPatch {
                        web_search_results: Some(state.web_results.clone()),
                        ..Default::default()
                    },
                )
                .await;
                Ok(())
            }
            Stage::Synthesize => {
                self.synthesize(state).await;
                Ok(())
            }
        }
    }

    // ── Branch A ───────────────────────────────────────────────────────────

    async fn embed(&self, state: &mut PipelineState) -> Result<()> {
        state.embedding = self.providers.embed.embed(&state.paragraph).await;
        Ok(())
    }

    /// Query the index; a dimension mismatch triggers one delete-and-rebuild
    /// from the source corpus followed by exactly one retry.  Any further
    /// failure propagates and fails this request.
    async fn retrieve(&self, state: &mut PipelineState) -> Result<()> {
        let hits = match self.index.query(&state.embedding, state.top_k).await {
            Ok(hits) => hits,
            Err(IndexError::DimensionMismatch { detail }) => {
                warn!(%detail, "index dimensionality changed; rebuilding from corpus");
                self.index
                    .delete()
                    .await
                    .context("deleting stale index after dimension mismatch")?;
                self.reindex
                    .rebuild()
                    .await
                    .context("rebuilding index from corpus")?;
                self.index
                    .query(&state.embedding, state.top_k)
                    .await
                    .context("retry query after index rebuild")?
            }
            Err(err) => return Err(err.into()),
        };
        state.matches = hits;
        Ok(())
    }

    async fn summarize(&self, state: &mut PipelineState) {
        let prompt = prompts::retrieval_summary(&state.paragraph, &state.snippets, &state.user_goals);
        let summary = match self.providers.generate.generate(&prompt, SUMMARY_TOKENS).await {
            Ok(text) => text,
            Err(err) => {
                debug!(?err, "summary generation failed; using templated fallback");
                fallback_summary(&state.snippets)
            }
        };
        state.summary = Some(summary);
    }

    // ── Branch B ───────────────────────────────────────────────────────────

    async fn search_prompt(&self, state: &mut PipelineState) {
        let prompt = prompts::search_queries(&state.paragraph, &state.user_goals, MAX_SEARCH_QUERIES);
        let queries = match self.providers.generate.generate(&prompt, QUERY_TOKENS).await {
            Ok(text) => parse_query_lines(&text, MAX_SEARCH_QUERIES),
            Err(err) => {
                debug!(?err, "query generation failed; falling back to the paragraph");
                Vec::new()
            }
        };
        state.web_queries = if queries.is_empty() {
            vec![truncate_chars(state.paragraph.trim(), 120)]
        } else {
            queries
        };
        state.web_search_prompt = Some(state.web_queries.join("\n"));
    }

    async fn search(&self, state: &mut PipelineState) {
        for (i, query) in state.web_queries.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(INTER_QUERY_DELAY).await;
            }
            match self.providers.search.search(query, HITS_PER_QUERY).await {
                Ok(hits) => {
                    for hit in hits {
                        state.web_results.push(WebSearchResult {
                            query: query.clone(),
                            title: hit.title,
                            url: hit.url,
                            description: hit.description,
                            selected: false,
                            scraped_content: None,
                            page_summary: None,
                            scrape_error: None,
                        });
                    }
                }
                Err(err) => warn!(%query, ?err, "web search failed for query"),
            }
        }
    }

    async fn select_pages(&self, state: &mut PipelineState) {
        if state.web_results.is_empty() {
            return;
        }
        let selected = if state.web_results.len() <= PAGES_TO_SCRAPE {
            (0..state.web_results.len()).collect()
        } else {
            let prompt = prompts::select_pages(&state.web_results, PAGES_TO_SCRAPE);
            match self.providers.generate.generate(&prompt, SELECT_TOKENS).await {
                Ok(text) => parse_selection(&text, state.web_results.len(), PAGES_TO_SCRAPE),
                Err(err) => {
                    debug!(?err, "page selection failed; taking the first results");
                    (0..PAGES_TO_SCRAPE).collect()
                }
            }
        };
        for i in selected {
            state.web_results[i].selected = true;
        }
    }

    /// Fetch only the selected pages.  A failed fetch records a per-result
    /// error and never aborts the sibling pages or the pipeline.
    async fn scrape(&self, state: &mut PipelineState) {
        for result in state.web_results.iter_mut().filter(|r| r.selected) {
            match self.providers.scrape.fetch_readable(&result.url).await {
                Ok(text) => result.scraped_content = Some(text),
                Err(err) => {
                    debug!(url = %result.url, ?err, "scrape failed");
                    result.scrape_error = Some(format!("{err:#}"));
                }
            }
        }
    }

    async fn summarize_pages(&self, state: &mut PipelineState) {
        for result in state.web_results.iter_mut() {
            let Some(content) = result.scraped_content.as_deref() else {
                continue;
            };
            let prompt = prompts::page_summary(&result.url, content);
            let summary = match self.providers.generate.generate(&prompt, SUMMARY_TOKENS).await {
                Ok(text) => text,
                Err(err) => {
                    debug!(url = %result.url, ?err, "page summary failed; using excerpt");
                    fallback_page_summary(content)
                }
            };
            result.page_summary = Some(summary);
        }
    }

    // ── Synthesis ──────────────────────────────────────────────────────────

    async fn synthesize(&self, state: &mut PipelineState) {
        let summary = state.summary.clone().unwrap_or_default();
        let page_summaries = state
            .web_results
            .iter()
            .filter_map(|r| r.page_summary.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        if summary.trim().is_empty() && page_summaries.trim().is_empty() {
            state.synthesis = Some(NOTHING_AVAILABLE.to_string());
            return;
        }

        let prompt = prompts::synthesis(&summary, &page_summaries);
        let sentence = match self.providers.generate.generate(&prompt, SYNTHESIS_TOKENS).await {
            Ok(text) => text,
            Err(err) => {
                debug!(?err, "synthesis generation failed; using templated fallback");
                fallback_synthesis(&state.snippets, &state.web_results)
            }
        };
        state.synthesis = Some(sentence);
    }
}

async fn send_patch(emit: &mpsc::Sender<WorkerMessage>, patch: ResultPatch) {
    // A closed channel means the host superseded this worker; nothing to do.
    let _ = emit.send(WorkerMessage::IncrementalUpdate(patch)).await;
}

// ── Pure stage helpers ────────────────────────────────────────────────────────

/// Canonical distance → similarity mapping, used everywhere a similarity is
/// computed or compared.
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Turn raw index matches into display snippets.
///
/// Inclusion: `similarity ≥ threshold`, OR the record is a title record
/// (title records always pass).  Exclusion: a record from the currently
/// edited document is dropped unconditionally.  Ordering follows the index's
/// distance-ascending return order; no re-sort.
pub fn filter_matches(matches: &[QueryMatch], threshold: f32, exclude_path: &str) -> Vec<Snippet> {
    matches
        .iter()
        .filter(|m| m.meta.source_path != exclude_path)
        .filter_map(|m| {
            let similarity = similarity_from_distance(m.distance);
            if similarity >= threshold || m.meta.is_title {
                Some(Snippet {
                    id: m.id.clone(),
                    title: m.meta.title.clone(),
                    content: m.meta.content.clone(),
                    similarity,
                    source_path: m.meta.source_path.clone(),
                })
            } else {
                None
            }
        })
        .collect()
}

/// Deterministic summary used when the generation provider is unavailable:
/// reports counts only, never invents content.
pub fn fallback_summary(snippets: &[Snippet]) -> String {
    match snippets.len() {
        0 => "No related past writing was found for this paragraph.".to_string(),
        1 => "Found 1 related piece of past writing for this paragraph.".to_string(),
        n => format!("Found {n} related pieces of past writing for this paragraph."),
    }
}

fn fallback_page_summary(content: &str) -> String {
    format!("Excerpt: {}", truncate_chars(content.trim(), 280))
}

fn fallback_synthesis(snippets: &[Snippet], web_results: &[WebSearchResult]) -> String {
    let pages = web_results.iter().filter(|r| r.page_summary.is_some()).count();
    format!(
        "Connected this paragraph to {} past note(s) and {} web page(s).",
        snippets.len(),
        pages
    )
}

/// Parse generated search queries: one per line, trimmed, list markers
/// stripped, capped at `max`.
pub fn parse_query_lines(text: &str, max: usize) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim())
        .map(strip_numbering)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .take(max)
        .collect()
}

/// Strip "1." / "2)" style list numbering.  Leading digits that are not
/// followed by `.` or `)` belong to the query ("3D printing tips") and are
/// kept.
fn strip_numbering(line: &str) -> &str {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return line;
    }
    match line[digits..].strip_prefix(['.', ')']) {
        Some(rest) => rest.trim(),
        None => line,
    }
}

/// Parse a page-selection reply ("2, 4") into zero-based indices, keeping
/// only in-range picks.  Falls back to the first `pick` results when the
/// reply parses to nothing usable.
pub fn parse_selection(text: &str, n_results: usize, pick: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<usize>().ok())
        .filter(|&n| n >= 1 && n <= n_results)
        .map(|n| n - 1)
        .collect();
    indices.dedup();
    indices.truncate(pick);
    if indices.is_empty() {
        (0..pick.min(n_results)).collect()
    } else {
        indices
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}…", &text[..i]),
        None => text.to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use marginalia_config::ProviderConfig;
    use marginalia_index::RecordMeta;

    use super::*;

    fn matched(id: &str, distance: f32, is_title: bool, source_path: &str) -> QueryMatch {
        QueryMatch {
            id: id.to_string(),
            distance,
            meta: RecordMeta {
                title: id.to_string(),
                content: format!("content {id}"),
                is_title,
                source_path: source_path.to_string(),
                paragraph_index: None,
                preview: None,
            },
        }
    }

    // ── Similarity mapping ─────────────────────────────────────────────────

    #[test]
    fn zero_distance_maps_to_similarity_one() {
        assert!((similarity_from_distance(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn similarity_decreases_with_distance() {
        assert!(similarity_from_distance(0.2) > similarity_from_distance(0.8));
    }

    // ── Filter law ─────────────────────────────────────────────────────────

    #[test]
    fn filter_keeps_above_threshold_and_drops_below() {
        // distance 0.14 → similarity ≈ 0.877; distance 0.53 → ≈ 0.654.
        let matches = vec![
            matched("close", 0.14, false, "/notes/other.md"),
            matched("far", 0.53, false, "/notes/other.md"),
        ];
        let snippets = filter_matches(&matches, 0.75, "/notes/current.md");
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].id, "close");
        assert!((snippets[0].similarity - 0.877).abs() < 0.001);
    }

    #[test]
    fn title_records_bypass_the_threshold() {
        let matches = vec![matched("title", 0.9, true, "/notes/other.md")];
        let snippets = filter_matches(&matches, 0.75, "/notes/current.md");
        assert_eq!(snippets.len(), 1);
    }

    #[test]
    fn current_document_is_excluded_even_when_it_passes() {
        let matches = vec![
            matched("self-para", 0.01, false, "/notes/current.md"),
            matched("self-title", 0.01, true, "/notes/current.md"),
            matched("other", 0.1, false, "/notes/other.md"),
        ];
        let snippets = filter_matches(&matches, 0.75, "/notes/current.md");
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].id, "other");
    }

    #[test]
    fn filter_preserves_index_order() {
        let matches = vec![
            matched("a", 0.05, false, "/notes/x.md"),
            matched("b", 0.10, false, "/notes/y.md"),
            matched("c", 0.15, false, "/notes/z.md"),
        ];
        let snippets = filter_matches(&matches, 0.5, "/notes/current.md");
        let ids: Vec<&str> = snippets.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn every_filtered_snippet_satisfies_the_filter_law() {
        let matches = vec![
            matched("a", 0.05, false, "/n/a.md"),
            matched("b", 0.8, true, "/n/b.md"),
            matched("c", 0.9, false, "/n/c.md"),
            matched("d", 0.02, false, "/n/current.md"),
        ];
        let threshold = 0.75;
        let snippets = filter_matches(&matches, threshold, "/n/current.md");
        for s in &snippets {
            let is_title = matches.iter().find(|m| m.id == s.id).unwrap().meta.is_title;
            assert!(s.similarity >= threshold || is_title);
            assert_ne!(s.source_path, "/n/current.md");
        }
    }

    // ── Parsing helpers ────────────────────────────────────────────────────

    #[test]
    fn query_lines_strip_markers_and_cap() {
        let text = "1. rust async runtimes\n- vector databases\n\n• embeddings 101\nextra query";
        let queries = parse_query_lines(text, 3);
        assert_eq!(
            queries,
            vec!["rust async runtimes", "vector databases", "embeddings 101"]
        );
    }

    #[test]
    fn queries_starting_with_a_number_are_kept_intact() {
        let text = "1. 3D printing tips\n2) 2024 rust roadmap\n90s web design";
        let queries = parse_query_lines(text, 3);
        assert_eq!(
            queries,
            vec!["3D printing tips", "2024 rust roadmap", "90s web design"]
        );
    }

    #[test]
    fn selection_parses_numbers_and_clamps_range() {
        assert_eq!(parse_selection("2, 4", 5, 2), vec![1, 3]);
        assert_eq!(parse_selection("I'd pick 3 and 9", 4, 2), vec![2]);
    }

    #[test]
    fn unusable_selection_falls_back_to_first_pick() {
        assert_eq!(parse_selection("none of these", 5, 2), vec![0, 1]);
        assert_eq!(parse_selection("", 1, 2), vec![0]);
    }

    // ── Fallback texts ─────────────────────────────────────────────────────

    #[test]
    fn fallback_summary_reports_counts_only() {
        assert!(fallback_summary(&[]).contains("No related"));
        let one = vec![Snippet {
            id: "a".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
            similarity: 0.9,
            source_path: "/n/a.md".to_string(),
        }];
        assert!(fallback_summary(&one).contains('1'));
    }

    // ── Retrieve retry semantics ───────────────────────────────────────────

    /// Index stub that fails with a dimension mismatch a configurable number
    /// of times before succeeding.
    struct FlakyIndex {
        failures_left: AtomicUsize,
        deletes: AtomicUsize,
    }

    #[async_trait]
    impl VectorIndex for FlakyIndex {
        async fn upsert(&self, _records: Vec<marginalia_index::VectorRecord>) -> Result<(), IndexError> {
            Ok(())
        }

        async fn query(&self, _embedding: &[f32], _k: usize) -> Result<Vec<QueryMatch>, IndexError> {
            if self.failures_left.fetch_sub(1, Ordering::SeqCst) > 0 {
                Err(IndexError::DimensionMismatch {
                    detail: "collection holds 768, query has 256".to_string(),
                })
            } else {
                Ok(vec![matched("hit", 0.1, false, "/notes/other.md")])
            }
        }

        async fn count(&self) -> Result<usize, IndexError> {
            Ok(1)
        }

        async fn delete(&self) -> Result<(), IndexError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingReindex {
        rebuilds: AtomicUsize,
    }

    #[async_trait]
    impl Reindex for CountingReindex {
        async fn rebuild(&self) -> Result<()> {
            self.rebuilds.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn orchestrator(failures: usize) -> (Orchestrator, Arc<CountingReindex>) {
        let reindex = Arc::new(CountingReindex {
            rebuilds: AtomicUsize::new(0),
        });
        let orchestrator = Orchestrator {
            index: Arc::new(FlakyIndex {
                failures_left: AtomicUsize::new(failures),
                deletes: AtomicUsize::new(0),
            }),
            providers: Arc::new(Providers::from_config(&ProviderConfig::default())),
            reindex: reindex.clone(),
        };
        (orchestrator, reindex)
    }

    fn test_state() -> PipelineState {
        PipelineState::new(
            WorkerRequest {
                paragraph: "Ideas for app X.".to_string(),
                source_path: "/notes/current.md".to_string(),
                user_goals: String::new(),
            },
            0.75,
            10,
        )
    }

    #[tokio::test]
    async fn one_dimension_mismatch_rebuilds_and_retries_successfully() {
        let (orchestrator, reindex) = orchestrator(1);
        let mut state = test_state();
        state.embedding = vec![0.0; 4];

        orchestrator.retrieve(&mut state).await.unwrap();
        assert_eq!(state.matches.len(), 1);
        assert_eq!(reindex.rebuilds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn two_consecutive_mismatches_fail_the_request() {
        let (orchestrator, reindex) = orchestrator(2);
        let mut state = test_state();
        state.embedding = vec![0.0; 4];

        let err = orchestrator.retrieve(&mut state).await.unwrap_err();
        assert!(err.to_string().contains("retry query"));
        assert_eq!(reindex.rebuilds.load(Ordering::SeqCst), 1, "rebuild happens exactly once");
    }

    #[tokio::test]
    async fn healthy_query_never_triggers_a_rebuild() {
        let (orchestrator, reindex) = orchestrator(0);
        let mut state = test_state();
        state.embedding = vec![0.0; 4];

        orchestrator.retrieve(&mut state).await.unwrap();
        assert_eq!(reindex.rebuilds.load(Ordering::SeqCst), 0);
    }

    // ── Synthesis fallback ─────────────────────────────────────────────────

    #[tokio::test]
    async fn synthesis_without_any_content_emits_fixed_sentence() {
        let (orchestrator, _) = orchestrator(0);
        let mut state = test_state();
        state.summary = Some(String::new());

        orchestrator.synthesize(&mut state).await;
        assert_eq!(state.synthesis.as_deref(), Some(NOTHING_AVAILABLE));
    }
}
