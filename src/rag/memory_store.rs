//! Non-persistent store used when Qdrant cannot be reached.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::Similarity;
use crate::error::{RagError, Result};
use crate::models::MemoryRecord;
use super::store::{check_dimensions, euclid_relevance, MemoryStore, StoreBackend};

/// Collections live in nested maps: collection name → record id → record.
#[derive(Debug)]
pub struct VolatileStore {
    collections: RwLock<HashMap<String, HashMap<String, MemoryRecord>>>,
    dimensions: usize,
    similarity: Similarity,
}

impl VolatileStore {
    pub fn new(dimensions: usize, similarity: Similarity) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            dimensions,
            similarity,
        }
    }

    fn missing(collection: &str) -> RagError {
        RagError::Store {
            backend: "volatile",
            message: format!("collection '{collection}' does not exist"),
        }
    }

    fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.similarity {
            Similarity::Cosine => cosine_similarity(a, b),
            Similarity::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            Similarity::Euclid => {
                let distance = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt();
                euclid_relevance(distance)
            }
        }
    }
}

/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl MemoryStore for VolatileStore {
    async fn create_collection(&self, collection: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_string()).or_default();
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<MemoryRecord>> {
        let collections = self.collections.read().await;
        let records = collections.get(collection).ok_or_else(|| Self::missing(collection))?;
        Ok(records.get(id).cloned())
    }

    async fn upsert(&self, collection: &str, record: MemoryRecord) -> Result<()> {
        check_dimensions(self.dimensions, &record.embedding)?;
        let mut collections = self.collections.write().await;
        let records = collections.get_mut(collection).ok_or_else(|| Self::missing(collection))?;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_nearest_matches(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        min_relevance: f32,
    ) -> Result<Vec<(MemoryRecord, f32)>> {
        check_dimensions(self.dimensions, embedding)?;
        let collections = self.collections.read().await;
        let records = collections.get(collection).ok_or_else(|| Self::missing(collection))?;

        let mut scored: Vec<(MemoryRecord, f32)> = records
            .values()
            .map(|record| (record.clone(), self.score(&record.embedding, embedding)))
            .filter(|(_, score)| *score >= min_relevance)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        let collections = self.collections.read().await;
        let records = collections.get(collection).ok_or_else(|| Self::missing(collection))?;
        Ok(records.len() as u64)
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Volatile
    }
}
