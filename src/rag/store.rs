use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::error::{RagError, Result};
use crate::models::MemoryRecord;
use super::memory_store::VolatileStore;
use super::vector_store::QdrantStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Qdrant,
    Volatile,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Qdrant => f.write_str("qdrant"),
            StoreBackend::Volatile => f.write_str("volatile"),
        }
    }
}

/// Vector-level storage for memory records, grouped into named collections.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// No-op if the collection already exists.
    async fn create_collection(&self, collection: &str) -> Result<()>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<MemoryRecord>>;

    /// The record's embedding must match the collection's dimensions.
    async fn upsert(&self, collection: &str, record: MemoryRecord) -> Result<()>;

    /// Records ordered by descending relevance, at most `limit` of them.
    async fn get_nearest_matches(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        min_relevance: f32,
    ) -> Result<Vec<(MemoryRecord, f32)>>;

    async fn count(&self, collection: &str) -> Result<u64>;

    fn backend(&self) -> StoreBackend;
}

pub(crate) fn check_dimensions(expected: usize, embedding: &[f32]) -> Result<()> {
    if embedding.len() != expected {
        return Err(RagError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(())
}

/// Relevance of a euclidean distance, in (0, 1] with 1 for identical vectors.
pub(crate) fn euclid_relevance(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

/// Why a Qdrant connection attempt did not produce a store.
#[derive(Debug)]
enum ConnectFailure {
    /// Nothing answered in time; the volatile store takes over.
    Unreachable(String),
    /// The server answered but refused the setup, e.g. bad credentials or an
    /// incompatible collection. Not recoverable by falling back.
    Rejected(RagError),
}

impl From<RagError> for ConnectFailure {
    fn from(e: RagError) -> Self {
        match e {
            RagError::Timeout(message) => ConnectFailure::Unreachable(message),
            other => ConnectFailure::Rejected(other),
        }
    }
}

/// Connects to Qdrant, falling back to a volatile in-process store when it cannot
/// be reached within the configured timeout. A server that is reachable but
/// rejects the collection setup is an error.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn MemoryStore>> {
    let collection = config.qualified_collection();
    tracing::info!("Creating or updating Qdrant memory store at {}...", config.url);

    match try_connect_qdrant(config, &collection).await {
        Ok(store) => {
            tracing::info!("Successfully registered Qdrant memory store ({})", collection);
            Ok(Arc::new(store))
        }
        Err(ConnectFailure::Unreachable(reason)) => {
            tracing::error!("Failed to create or update Qdrant memory store: {}", reason);
            tracing::info!("Creating volatile memory store...");
            let store = VolatileStore::new(config.index.dimensions, config.index.similarity);
            store.create_collection(&collection).await?;
            tracing::info!("Successfully registered volatile memory store");
            Ok(Arc::new(store))
        }
        Err(ConnectFailure::Rejected(e)) => {
            tracing::error!("Qdrant at {} rejected the collection setup: {}", config.url, e);
            Err(e)
        }
    }
}

async fn try_connect_qdrant(
    config: &StoreConfig,
    collection: &str,
) -> std::result::Result<QdrantStore, ConnectFailure> {
    let store = QdrantStore::new(config).map_err(ConnectFailure::Rejected)?;
    let timeout = Duration::from_secs(config.connect_timeout_secs);
    let no_response = || {
        ConnectFailure::Unreachable(format!("no response from {} within {:?}", config.url, timeout))
    };

    match tokio::time::timeout(timeout, store.health_check()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(ConnectFailure::Unreachable(e.to_string())),
        Err(_) => return Err(no_response()),
    }

    match tokio::time::timeout(timeout, store.create_collection(collection)).await {
        Ok(Ok(())) => Ok(store),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(no_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_qdrant_falls_back_to_volatile() {
        let config = StoreConfig {
            url: "http://127.0.0.1:1".to_string(),
            connect_timeout_secs: 2,
            ..StoreConfig::default()
        };
        let store = connect(&config).await.unwrap();
        assert_eq!(store.backend(), StoreBackend::Volatile);
        assert_eq!(store.count(&config.qualified_collection()).await.unwrap(), 0);
    }

    #[test]
    fn test_only_timeouts_count_as_unreachable() {
        let failure = ConnectFailure::from(RagError::Timeout("qdrant create_collection".to_string()));
        assert!(matches!(failure, ConnectFailure::Unreachable(_)));

        let failure = ConnectFailure::from(RagError::Store {
            backend: "qdrant",
            message: "Unauthenticated: invalid api key".to_string(),
        });
        assert!(matches!(failure, ConnectFailure::Rejected(RagError::Store { .. })));
    }

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(3, &[0.0, 1.0, 0.0]).is_ok());
        assert!(matches!(
            check_dimensions(3, &[0.0]),
            Err(RagError::DimensionMismatch { expected: 3, actual: 1 })
        ));
    }
}
