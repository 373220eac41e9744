//! Remote-backed index: a thin client for a Chroma-compatible collection API.
//!
//! The service is consumed, not owned.  Connectivity is verified once at
//! construction with a cheap probe (create and delete a throwaway
//! collection); callers fall back to [`crate::MemoryIndex`] when the probe
//! fails.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::{IndexError, QueryMatch, RecordMeta, VectorIndex, VectorRecord};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ChromaIndex {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    /// Cached collection UUID.  Cleared by [`VectorIndex::delete`] so the next
    /// upsert re-creates the collection.
    collection_id: Mutex<Option<String>>,
}

impl ChromaIndex {
    /// Probe the service, then resolve (or create) the named collection.
    pub async fn connect(base_url: &str, collection: &str) -> Result<Self, IndexError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let index = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            collection_id: Mutex::new(None),
        };
        index.probe().await?;
        index.ensure_collection().await?;
        Ok(index)
    }

    /// Cheap connectivity check: create a throwaway collection and delete it.
    async fn probe(&self) -> Result<(), IndexError> {
        let name = format!("probe-{}", Uuid::new_v4());
        self.create_collection(&name).await?;
        self.delete_collection(&name).await?;
        debug!(url = %self.base_url, "vector service probe succeeded");
        Ok(())
    }

    async fn create_collection(&self, name: &str) -> Result<String, IndexError> {
        let resp = self
            .client
            .post(format!("{}/api/v1/collections", self.base_url))
            .json(&json!({ "name": name, "get_or_create": true }))
            .send()
            .await?;
        let body = check(resp).await?;
        body["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| IndexError::Service("collection response missing id".to_string()))
    }

    async fn delete_collection(&self, name: &str) -> Result<(), IndexError> {
        let resp = self
            .client
            .delete(format!("{}/api/v1/collections/{}", self.base_url, name))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Resolve the cached collection id, creating the collection on first use
    /// (or after a delete).
    async fn ensure_collection(&self) -> Result<String, IndexError> {
        let mut cached = self.collection_id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }
        let id = self.create_collection(&self.collection).await?;
        *cached = Some(id.clone());
        Ok(id)
    }
}

#[async_trait]
impl VectorIndex for ChromaIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), IndexError> {
        if records.is_empty() {
            return Ok(());
        }
        let id = self.ensure_collection().await?;

        let mut ids = Vec::with_capacity(records.len());
        let mut embeddings = Vec::with_capacity(records.len());
        let mut metadatas = Vec::with_capacity(records.len());
        let mut documents = Vec::with_capacity(records.len());
        for record in records {
            ids.push(record.id);
            embeddings.push(record.embedding);
            documents.push(record.meta.content.clone());
            metadatas.push(serde_json::to_value(&record.meta).map_err(|e| {
                IndexError::Service(format!("metadata serialisation failed: {e}"))
            })?);
        }

        let resp = self
            .client
            .post(format!("{}/api/v1/collections/{}/upsert", self.base_url, id))
            .json(&json!({
                "ids": ids,
                "embeddings": embeddings,
                "metadatas": metadatas,
                "documents": documents,
            }))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryMatch>, IndexError> {
        let id = self.ensure_collection().await?;

        let resp = self
            .client
            .post(format!("{}/api/v1/collections/{}/query", self.base_url, id))
            .json(&json!({
                "query_embeddings": [embedding],
                "n_results": k,
                "include": ["metadatas", "distances"],
            }))
            .send()
            .await?;
        let body = check(resp).await?;

        // Responses are nested one level per query embedding; we always send one.
        let ids = body["ids"][0].as_array().cloned().unwrap_or_default();
        let distances = body["distances"][0].as_array().cloned().unwrap_or_default();
        let metadatas = body["metadatas"][0].as_array().cloned().unwrap_or_default();

        let mut matches = Vec::with_capacity(ids.len());
        for (i, record_id) in ids.iter().enumerate() {
            let Some(record_id) = record_id.as_str() else {
                continue;
            };
            let distance = distances
                .get(i)
                .and_then(|d| d.as_f64())
                .unwrap_or(f64::MAX) as f32;
            let meta: RecordMeta = metadatas
                .get(i)
                .cloned()
                .and_then(|m| serde_json::from_value(m).ok())
                .ok_or_else(|| {
                    IndexError::Service(format!("malformed metadata for record {record_id}"))
                })?;
            matches.push(QueryMatch {
                id: record_id.to_string(),
                distance,
                meta,
            });
        }
        Ok(matches)
    }

    async fn count(&self) -> Result<usize, IndexError> {
        let id = self.ensure_collection().await?;
        let resp = self
            .client
            .get(format!("{}/api/v1/collections/{}/count", self.base_url, id))
            .send()
            .await?;
        let body = check(resp).await?;
        Ok(body.as_u64().unwrap_or(0) as usize)
    }

    async fn delete(&self) -> Result<(), IndexError> {
        self.delete_collection(&self.collection).await?;
        *self.collection_id.lock().await = None;
        Ok(())
    }
}

/// Map a response to JSON, converting service errors to the typed taxonomy.
/// A 4xx/5xx whose body mentions embedding dimensions becomes the recoverable
/// [`IndexError::DimensionMismatch`]; everything else is a plain service error.
async fn check(resp: reqwest::Response) -> Result<serde_json::Value, IndexError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await.unwrap_or(serde_json::Value::Null));
    }
    let body = resp.text().await.unwrap_or_default();
    if body.to_ascii_lowercase().contains("dimension") {
        return Err(IndexError::DimensionMismatch { detail: body });
    }
    Err(IndexError::Service(format!("{status}: {body}")))
}
