//! Prompt builders for the generation-backed stages.  Only the role of each
//! prompt matters to the pipeline; wording is deliberately plain.

use crate::state::{Snippet, WebSearchResult};

fn goals_clause(user_goals: &str) -> String {
    if user_goals.trim().is_empty() {
        String::new()
    } else {
        format!("\nThe writer's stated goals: {}\n", user_goals.trim())
    }
}

/// Branch A summary: synthesise the fresh paragraph with retrieved snippets.
pub fn retrieval_summary(paragraph: &str, snippets: &[Snippet], user_goals: &str) -> String {
    let mut prompt = format!(
        "The writer just finished this paragraph:\n\n{paragraph}\n{}",
        goals_clause(user_goals)
    );
    if snippets.is_empty() {
        prompt.push_str("\nNo related past writing was found. In 2-3 sentences, reflect the paragraph back and suggest one direction to develop it.");
    } else {
        prompt.push_str("\nRelated past writing:\n");
        for snippet in snippets {
            prompt.push_str(&format!("- [{}] {}\n", snippet.title, snippet.content));
        }
        prompt.push_str("\nIn 2-3 sentences, connect the new paragraph to the related writing above.");
    }
    prompt
}

/// Branch B query generation: up to `max_queries` short web search queries.
pub fn search_queries(paragraph: &str, user_goals: &str, max_queries: usize) -> String {
    format!(
        "Generate at most {max_queries} short web search queries that would surface useful \
         background for this paragraph:\n\n{paragraph}\n{}\nReturn one query per line, nothing else.",
        goals_clause(user_goals)
    )
}

/// Page selection: pick the results worth reading in full.
pub fn select_pages(results: &[WebSearchResult], pick: usize) -> String {
    let mut prompt = format!(
        "From the numbered search results below, pick the {pick} most valuable pages to read \
         in full. Answer with the numbers only, comma-separated.\n\n"
    );
    for (i, result) in results.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {} - {} ({})\n",
            i + 1,
            result.title,
            result.description,
            result.url
        ));
    }
    prompt
}

/// Per-page summary of scraped content.
pub fn page_summary(url: &str, content: &str) -> String {
    format!("Summarise the key points of this page ({url}) in 2-3 sentences:\n\n{content}")
}

/// Final synthesis: one short, high-signal sentence.
pub fn synthesis(summary: &str, page_summaries: &str) -> String {
    format!(
        "Combine the following into ONE short, high-signal sentence for a writer glancing at a \
         side panel.\n\nNotes summary:\n{summary}\n\nWeb findings:\n{page_summaries}\n"
    )
}
