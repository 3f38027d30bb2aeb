use std::sync::Arc;

use crate::error::Result;
use crate::models::{MemoryRecord, SearchResult};
use super::embeddings::EmbeddingService;
use super::store::{MemoryStore, StoreBackend};

/// Text-level view over a `MemoryStore`: embeddings are generated on the way in
/// and on every search.
#[derive(Clone)]
pub struct SemanticMemory {
    store: Arc<dyn MemoryStore>,
    embeddings: Arc<dyn EmbeddingService>,
}

impl SemanticMemory {
    pub fn new(store: Arc<dyn MemoryStore>, embeddings: Arc<dyn EmbeddingService>) -> Self {
        Self { store, embeddings }
    }

    pub fn backend(&self) -> StoreBackend {
        self.store.backend()
    }

    pub async fn save_information(
        &self,
        collection: &str,
        id: &str,
        text: &str,
        description: &str,
        additional_metadata: Option<&str>,
    ) -> Result<()> {
        let embedding = self.embeddings.embed(text).await?;
        let record = MemoryRecord {
            id: id.to_string(),
            text: text.to_string(),
            description: description.to_string(),
            additional_metadata: additional_metadata.unwrap_or_default().to_string(),
            embedding,
        };
        self.store.upsert(collection, record).await
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<MemoryRecord>> {
        self.store.get(collection, id).await
    }

    pub async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
        min_relevance: f32,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embeddings.embed(query).await?;
        let matches = self
            .store
            .get_nearest_matches(collection, &query_embedding, limit, min_relevance)
            .await?;

        Ok(matches
            .into_iter()
            .map(|(record, relevance)| SearchResult::from_record(record, relevance))
            .collect())
    }

    pub async fn count(&self, collection: &str) -> Result<u64> {
        self.store.count(collection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Similarity;
    use crate::rag::embeddings::HashedEmbeddings;
    use crate::rag::memory_store::VolatileStore;

    async fn memory() -> SemanticMemory {
        let store = VolatileStore::new(128, Similarity::Cosine);
        store.create_collection("docs").await.unwrap();
        SemanticMemory::new(Arc::new(store), Arc::new(HashedEmbeddings::new(128)))
    }

    #[tokio::test]
    async fn test_save_then_search_returns_best_match_first() {
        let memory = memory().await;
        memory
            .save_information("docs", "1", "Qdrant stores vectors for similarity search", "Qdrant", Some("{\"id\":\"1\"}"))
            .await
            .unwrap();
        memory
            .save_information("docs", "2", "Sourdough bread needs a starter", "Bread", None)
            .await
            .unwrap();

        let results = memory.search("docs", "similarity search over vectors", 2, 0.0).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "1");
        assert_eq!(results[0].description, "Qdrant");
        assert_eq!(results[0].metadata, "{\"id\":\"1\"}");
        assert!(results[0].relevance >= results[1].relevance);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let memory = memory().await;
        assert!(memory.get("docs", "missing").await.unwrap().is_none());
        assert_eq!(memory.count("docs").await.unwrap(), 0);
    }
}
