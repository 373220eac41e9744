//! Vector similarity index used by the retrieval stage.
//!
//! Two implementations satisfy the same [`VectorIndex`] contract:
//!
//! | Impl          | Backing                        | When used                      |
//! |---------------|--------------------------------|--------------------------------|
//! | [`ChromaIndex`] | Chroma-compatible REST service | remote reachable (probe passes) |
//! | [`MemoryIndex`] | in-process `Vec`               | probe fails or `backend = "memory"` |
//!
//! Selection happens once at construction via [`connect`]; there is no
//! runtime re-probing.  The in-memory index is a correctness reference:
//! O(n) per query is accepted for a personal-scale corpus.

pub mod chroma;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use marginalia_config::IndexConfig;

pub use chroma::ChromaIndex;
pub use memory::MemoryIndex;

// ── Records ───────────────────────────────────────────────────────────────────

/// Metadata carried alongside every stored embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordMeta {
    pub title: String,
    pub content: String,
    /// Title records represent a whole document and bypass the similarity
    /// threshold during filtering.
    #[serde(default)]
    pub is_title: bool,
    pub source_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// One (id, embedding, metadata) triple.  `id` is globally unique per logical
/// chunk; re-upserting an id replaces its embedding and metadata.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub meta: RecordMeta,
}

/// A single nearest-neighbour hit.  `distance` is cosine distance
/// (`1 - cosine_similarity`), so lower is closer.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub id: String,
    pub distance: f32,
    pub meta: RecordMeta,
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum IndexError {
    /// The query embedding's length does not match the collection's
    /// dimensionality.  Recoverable: callers may rebuild the index once and
    /// retry.
    #[error("embedding dimension mismatch: {detail}")]
    DimensionMismatch { detail: String },
    #[error("vector service error: {0}")]
    Service(String),
    #[error("vector service request failed: {0}")]
    Http(#[from] reqwest::Error),
}

// ── Contract ──────────────────────────────────────────────────────────────────

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records by id.  Idempotent per id.  Records whose
    /// embedding length differs from the collection's established
    /// dimensionality are rejected with [`IndexError::DimensionMismatch`].
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), IndexError>;

    /// Return up to `k` nearest records by distance, ascending.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryMatch>, IndexError>;

    async fn count(&self) -> Result<usize, IndexError>;

    /// Drop every record in the collection.
    async fn delete(&self) -> Result<(), IndexError>;
}

// ── Constructor-level backend selection ───────────────────────────────────────

/// Build the configured index backend.
///
/// `auto` probes the remote service with a throwaway collection and falls
/// back to the in-process index when the probe fails; `chroma` makes probe
/// failure fatal; `memory` skips the remote entirely.
pub async fn connect(config: &IndexConfig) -> Result<Arc<dyn VectorIndex>, IndexError> {
    match config.backend.as_str() {
        "memory" => {
            info!("vector index: in-memory backend (configured)");
            Ok(Arc::new(MemoryIndex::new()))
        }
        "chroma" => {
            let index = ChromaIndex::connect(&config.chroma_url, &config.collection).await?;
            info!(url = %config.chroma_url, collection = %config.collection, "vector index: chroma backend");
            Ok(Arc::new(index))
        }
        _ => match ChromaIndex::connect(&config.chroma_url, &config.collection).await {
            Ok(index) => {
                info!(url = %config.chroma_url, collection = %config.collection, "vector index: chroma backend (probe ok)");
                Ok(Arc::new(index))
            }
            Err(err) => {
                warn!(?err, "vector service probe failed; degrading to in-memory index");
                Ok(Arc::new(MemoryIndex::new()))
            }
        },
    }
}
