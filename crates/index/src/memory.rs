//! In-process fallback index: every record in RAM, cosine distance computed
//! against the full store on each query.

use tokio::sync::Mutex;

use async_trait::async_trait;

use crate::{IndexError, QueryMatch, VectorIndex, VectorRecord};

#[derive(Debug, Default)]
pub struct MemoryIndex {
    records: Mutex<Vec<VectorRecord>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), IndexError> {
        let mut store = self.records.lock().await;

        // Validate the whole batch against the collection's established
        // dimensionality before touching the store, so a bad batch leaves
        // no partial state behind.
        let mut dim = store.first().map(|r| r.embedding.len());
        for record in &records {
            match dim {
                Some(d) if record.embedding.len() != d => {
                    return Err(IndexError::DimensionMismatch {
                        detail: format!(
                            "collection holds {}, record {} has {}",
                            d,
                            record.id,
                            record.embedding.len()
                        ),
                    });
                }
                None => dim = Some(record.embedding.len()),
                _ => {}
            }
        }

        for record in records {
            match store.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => store.push(record),
            }
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryMatch>, IndexError> {
        let store = self.records.lock().await;

        if let Some(first) = store.first() {
            if first.embedding.len() != embedding.len() {
                return Err(IndexError::DimensionMismatch {
                    detail: format!(
                        "collection holds {}, query has {}",
                        first.embedding.len(),
                        embedding.len()
                    ),
                });
            }
        }

        let mut matches: Vec<QueryMatch> = store
            .iter()
            .map(|record| QueryMatch {
                id: record.id.clone(),
                distance: cosine_distance(&record.embedding, embedding),
                meta: record.meta.clone(),
            })
            .collect();

        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(k);
        Ok(matches)
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.records.lock().await.len())
    }

    async fn delete(&self) -> Result<(), IndexError> {
        self.records.lock().await.clear();
        Ok(())
    }
}

// ── Distance ──────────────────────────────────────────────────────────────────

/// Cosine distance `1 - cosine_similarity`, with similarity clamped to
/// `[0, 1]`.  A zero-magnitude vector on either side yields similarity 0 and
/// therefore maximum distance, never NaN.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    (dot / (mag_a * mag_b)).clamp(0.0, 1.0)
}

// ── Tests ────────────────────────────────────────────────────────────────────
