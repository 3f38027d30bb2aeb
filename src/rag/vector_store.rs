use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, CountPointsBuilder, CreateCollectionBuilder, Distance,
    GetPointsBuilder, HnswConfigDiffBuilder, PointId, PointStruct, SearchParamsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Qdrant, QdrantError};
use serde_json::{Map as JsonMap, Value as JsonValue};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::{IndexConfig, Similarity, StoreConfig};
use crate::error::{RagError, Result};
use crate::models::MemoryRecord;
use super::store::{check_dimensions, euclid_relevance, MemoryStore, StoreBackend};

/// Maps a document id onto a Qdrant point id.
///
/// Qdrant only accepts unsigned integers and UUIDs, so any other id is turned into
/// a UUID taken from its SHA-256 digest. The document id itself stays in the payload.
pub fn point_id_for(id: &str) -> PointId {
    if let Ok(num) = id.parse::<u64>() {
        return PointId::from(num);
    }
    if let Ok(uuid) = Uuid::parse_str(id) {
        return PointId::from(uuid.to_string());
    }
    let digest = Sha256::digest(id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    PointId::from(Uuid::from_bytes(bytes).to_string())
}

fn payload_string(payload: &HashMap<String, QdrantValue>, key: &str) -> String {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

fn record_from_payload(payload: &HashMap<String, QdrantValue>, point_id: Option<&PointId>) -> MemoryRecord {
    let mut id = payload_string(payload, "id");
    if id.is_empty() {
        if let Some(PointId { point_id_options: Some(options) }) = point_id {
            id = match options {
                PointIdOptions::Uuid(uuid) => uuid.clone(),
                PointIdOptions::Num(num) => num.to_string(),
            };
        }
    }

    MemoryRecord {
        id,
        text: payload_string(payload, "text"),
        description: payload_string(payload, "description"),
        additional_metadata: payload_string(payload, "additional_metadata"),
        embedding: Vec::new(),
    }
}

fn distance_for(similarity: Similarity) -> Distance {
    match similarity {
        Similarity::Cosine => Distance::Cosine,
        Similarity::Dot => Distance::Dot,
        Similarity::Euclid => Distance::Euclid,
    }
}

/// Qdrant's `score_threshold` for a minimum relevance. Euclid scores are
/// distances, so the bound flips into a maximum distance.
fn score_threshold_for(similarity: Similarity, min_relevance: f32) -> Option<f32> {
    match similarity {
        Similarity::Cosine | Similarity::Dot => Some(min_relevance),
        Similarity::Euclid if min_relevance > 0.0 => Some(1.0 / min_relevance - 1.0),
        Similarity::Euclid => None,
    }
}

/// Converts a Qdrant score into the relevance reported by every store.
fn relevance_from_score(similarity: Similarity, score: f32) -> f32 {
    match similarity {
        Similarity::Cosine | Similarity::Dot => score,
        Similarity::Euclid => euclid_relevance(score),
    }
}

pub struct QdrantStore {
    client: Qdrant,
    index: IndexConfig,
    request_timeout: Duration,
}

impl QdrantStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        tracing::info!("Building Qdrant client for URL: {}", config.url);
        let request_timeout = Duration::from_secs(config.request_timeout_secs);

        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.clone())
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(Self::map_err)?;

        Ok(Self {
            client,
            index: config.index.clone(),
            request_timeout,
        })
    }

    fn map_err(e: QdrantError) -> RagError {
        RagError::Store {
            backend: "qdrant",
            message: e.to_string(),
        }
    }

    /// Runs a client call under the request timeout so a stalled call surfaces as
    /// `RagError::Timeout` rather than a generic store error.
    async fn with_deadline<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, QdrantError>>,
    {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result.map_err(Self::map_err),
            Err(_) => Err(RagError::Timeout(format!(
                "qdrant {} exceeded {:?}",
                op, self.request_timeout
            ))),
        }
    }
}

impl QdrantStore {
    /// Succeeds once the server answers; any transport failure is an error.
    pub async fn health_check(&self) -> Result<()> {
        let reply = self
            .with_deadline("health_check", self.client.health_check())
            .await?;
        tracing::debug!(version = %reply.version, "qdrant is reachable");
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for QdrantStore {
    async fn create_collection(&self, collection: &str) -> Result<()> {
        tracing::info!("Checking Qdrant collection {}...", collection);
        if self
            .with_deadline("collection_exists", self.client.collection_exists(collection))
            .await?
        {
            tracing::debug!(collection, "qdrant collection already exists");
            return Ok(());
        }

        let builder = CreateCollectionBuilder::new(collection)
            .vectors_config(VectorParamsBuilder::new(
                self.index.dimensions as u64,
                distance_for(self.index.similarity),
            ))
            .hnsw_config(
                HnswConfigDiffBuilder::default()
                    .m(self.index.m)
                    .ef_construct(self.index.ef_construction),
            );

        self.with_deadline("create_collection", self.client.create_collection(builder))
            .await?;
        tracing::info!(collection, dimensions = self.index.dimensions, "created qdrant collection");
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<MemoryRecord>> {
        let response = self
            .with_deadline(
                "get_points",
                self.client.get_points(
                    GetPointsBuilder::new(collection, vec![point_id_for(id)]).with_payload(true),
                ),
            )
            .await?;

        Ok(response
            .result
            .first()
            .map(|point| record_from_payload(&point.payload, point.id.as_ref())))
    }

    async fn upsert(&self, collection: &str, record: MemoryRecord) -> Result<()> {
        check_dimensions(self.index.dimensions, &record.embedding)?;

        let mut payload_map = JsonMap::new();
        payload_map.insert("id".to_string(), JsonValue::String(record.id.clone()));
        payload_map.insert("text".to_string(), JsonValue::String(record.text));
        payload_map.insert("description".to_string(), JsonValue::String(record.description));
        payload_map.insert(
            "additional_metadata".to_string(),
            JsonValue::String(record.additional_metadata),
        );
        let point = PointStruct::new(point_id_for(&record.id), record.embedding, payload_map);

        self.with_deadline(
            "upsert_points",
            self.client
                .upsert_points(UpsertPointsBuilder::new(collection, vec![point]).wait(true)),
        )
        .await?;

        Ok(())
    }

    async fn get_nearest_matches(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        min_relevance: f32,
    ) -> Result<Vec<(MemoryRecord, f32)>> {
        check_dimensions(self.index.dimensions, embedding)?;

        let similarity = self.index.similarity;
        let mut request = SearchPointsBuilder::new(collection, embedding.to_vec(), limit as u64)
            .with_payload(true)
            .params(SearchParamsBuilder::default().hnsw_ef(self.index.ef_search));
        if let Some(threshold) = score_threshold_for(similarity, min_relevance) {
            request = request.score_threshold(threshold);
        }

        let search_result = self
            .with_deadline("search_points", self.client.search_points(request))
            .await?;

        Ok(search_result
            .result
            .into_iter()
            .map(|point| {
                let relevance = relevance_from_score(similarity, point.score);
                (record_from_payload(&point.payload, point.id.as_ref()), relevance)
            })
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        let response = self
            .with_deadline(
                "count",
                self.client.count(CountPointsBuilder::new(collection).exact(true)),
            )
            .await?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Qdrant
    }
}
