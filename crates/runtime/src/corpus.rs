//! Builds the vector index from the watched document corpus.
//!
//! Every readable document contributes one title record (whole-document
//! identity, bypasses the similarity threshold downstream) plus one record
//! per blank-line-separated paragraph.  Record ids are derived from the
//! document path and ordinal, never the content, so re-indexing overwrites
//! in place instead of accumulating duplicates.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use walkdir::WalkDir;

use marginalia_config::WatchConfig;
use marginalia_index::{RecordMeta, VectorIndex, VectorRecord};
use marginalia_pipeline::Reindex;
use marginalia_providers::Providers;

/// Characters of leading document text stored as a title record's preview.
const PREVIEW_CHARS: usize = 200;

pub struct CorpusIndexer {
    index: Arc<dyn VectorIndex>,
    providers: Arc<Providers>,
    dir: PathBuf,
    extensions: Vec<String>,
}

impl CorpusIndexer {
    pub fn new(index: Arc<dyn VectorIndex>, providers: Arc<Providers>, watch: &WatchConfig) -> Self {
        Self {
            index,
            providers,
            dir: PathBuf::from(&watch.dir),
            extensions: watch.extensions.clone(),
        }
    }

    /// Walk the corpus and upsert records for every watchable document.
    /// Unreadable files are logged and skipped.  Returns the record count.
    pub async fn index_corpus(&self) -> Result<usize> {
        let mut records = Vec::new();
        for entry in WalkDir::new(&self.dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || !self.matches_extension(path) {
                continue;
            }
            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(err) => {
                    warn!(path = %path.display(), ?err, "unreadable document; skipping");
                    continue;
                }
            };
            records.extend(self.document_records(path, &text).await);
        }

        let count = records.len();
        if count > 0 {
            self.index
                .upsert(records)
                .await
                .context("upserting corpus records")?;
        }
        info!(records = count, dir = %self.dir.display(), "corpus indexed");
        Ok(count)
    }

    async fn document_records(&self, path: &Path, text: &str) -> Vec<VectorRecord> {
        let source_path = path.display().to_string();
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_path.clone());
        let preview = preview_of(text);

        let mut records = Vec::with_capacity(1);
        let title_text = format!("{title}\n{preview}");
        records.push(VectorRecord {
            id: record_id(&source_path, "title", 0),
            embedding: self.providers.embed.embed(&title_text).await,
            meta: RecordMeta {
                title: title.clone(),
                content: preview.clone(),
                is_title: true,
                source_path: source_path.clone(),
                paragraph_index: None,
                preview: Some(preview),
            },
        });

        for (i, paragraph) in paragraphs(text).into_iter().enumerate() {
            records.push(VectorRecord {
                id: record_id(&source_path, "para", i),
                embedding: self.providers.embed.embed(&paragraph).await,
                meta: RecordMeta {
                    title: title.clone(),
                    content: paragraph,
                    is_title: false,
                    source_path: source_path.clone(),
                    paragraph_index: Some(i),
                    preview: None,
                },
            });
        }
        records
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }
}

#[async_trait]
impl Reindex for CorpusIndexer {
    async fn rebuild(&self) -> Result<()> {
        self.index_corpus().await.map(|_| ())
    }
}

// ── Pure helpers ──────────────────────────────────────────────────────────────

/// Blank-line paragraph split, trimmed, empties dropped.
pub fn paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Stable record id: a hash of (path, kind, ordinal).  Content-independent,
/// so an edited paragraph keeps its id and re-indexing replaces it.
pub fn record_id(source_path: &str, kind: &str, ordinal: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_path.as_bytes());
    hasher.update([0]);
    hasher.update(kind.as_bytes());
    hasher.update(ordinal.to_le_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..32].to_string()
}

fn preview_of(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(PREVIEW_CHARS) {
        Some((i, _)) => trimmed[..i].to_string(),
        None => trimmed.to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_config::ProviderConfig;
    use marginalia_index::MemoryIndex;
    use tempfile::TempDir;

    #[test]
    fn paragraphs_split_on_blank_lines_and_drop_empties() {
        let text = "First paragraph.\n\n\n\nSecond one\nstill second.\n\n";
        assert_eq!(
            paragraphs(text),
            vec!["First paragraph.", "Second one\nstill second."]
        );
    }

    #[test]
    fn record_ids_are_stable_and_distinct() {
        assert_eq!(record_id("/n/a.md", "para", 0), record_id("/n/a.md", "para", 0));
        assert_ne!(record_id("/n/a.md", "para", 0), record_id("/n/a.md", "para", 1));
        assert_ne!(record_id("/n/a.md", "para", 0), record_id("/n/a.md", "title", 0));
        assert_ne!(record_id("/n/a.md", "para", 0), record_id("/n/b.md", "para", 0));
        assert_eq!(record_id("/n/a.md", "para", 0).len(), 32);
    }

    #[test]
    fn preview_truncates_by_chars() {
        let long = "x".repeat(500);
        assert_eq!(preview_of(&long).chars().count(), PREVIEW_CHARS);
        assert_eq!(preview_of("  short  "), "short");
    }

    fn indexer_over(dir: &TempDir) -> (CorpusIndexer, Arc<MemoryIndex>) {
        let index = Arc::new(MemoryIndex::new());
        let watch = WatchConfig {
            dir: dir.path().display().to_string(),
            extensions: vec!["md".to_string()],
        };
        let indexer = CorpusIndexer::new(
            index.clone(),
            Arc::new(Providers::from_config(&ProviderConfig::default())),
            &watch,
        );
        (indexer, index)
    }

    #[tokio::test]
    async fn indexes_title_and_paragraph_records_per_document() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "Para one.\n\nPara two.").unwrap();
        fs::write(dir.path().join("skip.log"), "not a document").unwrap();

        let (indexer, index) = indexer_over(&dir);
        let count = indexer.index_corpus().await.unwrap();

        // One title + two paragraphs; the .log file is ignored.
        assert_eq!(count, 3);
        assert_eq!(index.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn reindexing_replaces_rather_than_accumulates() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "Only paragraph.").unwrap();

        let (indexer, index) = indexer_over(&dir);
        indexer.index_corpus().await.unwrap();
        indexer.index_corpus().await.unwrap();

        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_directory_indexes_nothing() {
        let dir = TempDir::new().unwrap();
        let (indexer, index) = indexer_over(&dir);

        assert_eq!(indexer.index_corpus().await.unwrap(), 0);
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
