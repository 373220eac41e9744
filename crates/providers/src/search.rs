//! Web search with a primary/secondary provider pair.
//!
//! Brave Search (keyed) is primary when a key is configured; DuckDuckGo
//! Instant Answers (keyless) is both the secondary and the no-key default.
//! A primary call that errors or returns zero hits falls through to the
//! secondary.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub description: String,
}

pub struct SearchClient {
    client: reqwest::Client,
    brave_api_key: Option<String>,
}

impl SearchClient {
    pub fn new(brave_api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("marginalia/0.1 (+https://github.com/your-org/marginalia)")
            .build()
            .unwrap_or_default();
        Self {
            client,
            brave_api_key,
        }
    }

    /// Run one query, trying the primary provider first and the secondary
    /// when the primary errors or comes back empty.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        if let Some(key) = self.brave_api_key.as_deref() {
            match self.search_brave(query, max_results, key).await {
                Ok(hits) if !hits.is_empty() => return Ok(hits),
                Ok(_) => debug!(%query, "brave returned zero hits; trying duckduckgo"),
                Err(err) => debug!(%query, ?err, "brave search failed; trying duckduckgo"),
            }
        }
        self.search_duckduckgo(query, max_results).await
    }

    async fn search_brave(
        &self,
        query: &str,
        max_results: usize,
        api_key: &str,
    ) -> Result<Vec<SearchHit>> {
        let resp = self
            .client
            .get("https://api.search.brave.com/res/v1/web/search")
            .query(&[("q", query), ("count", &max_results.to_string())])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("brave search error {status}: {body}");
        }

        let json: serde_json::Value = resp.json().await?;
        let mut hits = Vec::new();
        if let Some(results) = json["web"]["results"].as_array() {
            for item in results.iter().take(max_results) {
                let title = item["title"].as_str().unwrap_or("").trim();
                let url = item["url"].as_str().unwrap_or("").trim();
                if title.is_empty() || url.is_empty() {
                    continue;
                }
                hits.push(SearchHit {
                    title: title.to_string(),
                    url: url.to_string(),
                    description: item["description"].as_str().unwrap_or("").trim().to_string(),
                });
            }
        }
        Ok(hits)
    }

    async fn search_duckduckgo(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let resp = self
            .client
            .get("https://api.duckduckgo.com/")
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;
        let json: serde_json::Value = resp.json().await?;

        let mut hits = Vec::new();

        let abstract_text = json["AbstractText"].as_str().unwrap_or("").trim();
        let abstract_url = json["AbstractURL"].as_str().unwrap_or("").trim();
        if !abstract_text.is_empty() && !abstract_url.is_empty() {
            hits.push(SearchHit {
                title: json["Heading"].as_str().unwrap_or(query).trim().to_string(),
                url: abstract_url.to_string(),
                description: abstract_text.to_string(),
            });
        }

        if let Some(topics) = json["RelatedTopics"].as_array() {
            for topic in topics {
                if hits.len() >= max_results {
                    break;
                }
                let text = topic["Text"].as_str().unwrap_or("").trim();
                let url = topic["FirstURL"].as_str().unwrap_or("").trim();
                if text.is_empty() || url.is_empty() {
                    continue;
                }
                hits.push(SearchHit {
                    title: text.chars().take(80).collect(),
                    url: url.to_string(),
                    description: text.to_string(),
                });
            }
        }

        Ok(hits)
    }
}
