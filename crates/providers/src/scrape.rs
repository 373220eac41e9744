//! Bounded page fetching and HTML-to-text conversion for the scrape stage.

use std::time::Duration;

use anyhow::{Result, anyhow};

/// Connect/read timeout for a single page fetch.  Enforced per call; there is
/// no pipeline-wide deadline.
const FETCH_TIMEOUT: Duration = Duration::from_secs(8);
/// Download cap; pages larger than this are truncated before conversion.
const MAX_BODY_BYTES: usize = 262_144;
/// Ceiling on the extracted plain text handed to summarisation.
const MAX_TEXT_CHARS: usize = 6_000;

pub struct ScrapeClient {
    client: reqwest::Client,
}

impl Default for ScrapeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrapeClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent("marginalia/0.1 (+https://github.com/your-org/marginalia)")
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Fetch `url` and convert the response to readable plain text.
    pub async fn fetch_readable(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header("Accept", "text/html")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(anyhow!("page fetch failed with status {}", resp.status()));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("text/html") && !content_type.contains("text/plain") {
            return Err(anyhow!("unsupported content type: {content_type}"));
        }

        let mut body = resp.text().await?;
        if body.len() > MAX_BODY_BYTES {
            let mut end = MAX_BODY_BYTES;
            while end > 0 && !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }

        let text = html_to_text(&body, MAX_TEXT_CHARS);
        if text.is_empty() {
            return Err(anyhow!("page yielded no readable text"));
        }
        Ok(text)
    }
}

// ── HTML → text ───────────────────────────────────────────────────────────────

/// Tags whose entire content is dropped.
const SKIP_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "noscript", "svg"];
/// Tags that break text flow; emit a newline in their place.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "article", "section",
];

/// Minimal tag-stripping HTML-to-text conversion.  No HTML parser crate:
/// "good enough" text for a summarisation prompt, capped at `max_chars`.
pub fn html_to_text(html: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(html.len().min(max_chars + 64));
    let mut skip_depth: usize = 0;
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        if skip_depth == 0 {
            out.push_str(&rest[..open]);
        }
        rest = &rest[open + 1..];

        let close = match rest.find('>') {
            Some(i) => i,
            None => break,
        };
        let tag_body = &rest[..close];
        rest = &rest[close + 1..];

        let is_closing = tag_body.starts_with('/');
        let name: String = tag_body
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        if SKIP_TAGS.contains(&name.as_str()) {
            if is_closing {
                skip_depth = skip_depth.saturating_sub(1);
            } else if !tag_body.ends_with('/') {
                skip_depth += 1;
            }
        } else if skip_depth == 0 && BLOCK_TAGS.contains(&name.as_str()) {
            out.push('\n');
        }
    }
    if skip_depth == 0 {
        out.push_str(rest);
    }

    let decoded = out
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    collapse_whitespace(&decoded, max_chars)
}

/// Collapse whitespace runs, keeping at most one blank line, and cap length
/// at a char boundary.
fn collapse_whitespace(text: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(text.len().min(max_chars + 8));
    let mut pending_space = false;
    let mut newlines = 0_u32;

    for ch in text.chars() {
        if out.chars().count() >= max_chars {
            break;
        }
        if ch == '\n' {
            newlines += 1;
            pending_space = false;
            if newlines <= 2 && !out.is_empty() {
                out.push('\n');
            }
        } else if ch.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space && !out.ends_with('\n') {
                out.push(' ');
            }
            pending_space = false;
            newlines = 0;
            out.push(ch);
        }
    }

    out.trim().to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
