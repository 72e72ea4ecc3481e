//! Long-term vector memory: embedders and similarity stores.
//!
//! Consolidated memories are upserted under their [`MemoryId`] together
//! with [`MemoryMetadata`]; retrieval embeds the query and ranks stored
//! documents by cosine similarity. The store is shared by every agent, so
//! implementations take `&self` and synchronize internally.

use std::collections::HashMap;
use std::future::Future;

use civ_types::{AgentId, MemoryId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::VectorError;

/// Metadata attached to every upserted memory document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// Owning agent.
    pub agent_id: AgentId,
    /// Turn of origin.
    pub timestamp: u64,
    /// Importance at consolidation time.
    pub importance: f64,
    /// Entropy level after this consolidation.
    pub entropy_level: f64,
}

/// One ranked retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    /// Document key.
    pub id: MemoryId,
    /// Stored document text.
    pub document: String,
    /// Stored metadata.
    pub metadata: MemoryMetadata,
    /// Cosine similarity to the query, higher is closer.
    pub score: f32,
}

/// Turns text into a dense vector.
pub trait Embedder: Send + Sync {
    /// Embed `text`.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, VectorError>> + Send;
}

/// Similarity-searchable document store keyed by memory id.
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite the document stored under `id`.
    fn upsert(
        &self,
        id: MemoryId,
        text: &str,
        metadata: MemoryMetadata,
    ) -> impl Future<Output = Result<(), VectorError>> + Send;

    /// Return up to `top_k` documents ranked by similarity to `text`.
    fn query(
        &self,
        text: &str,
        top_k: usize,
    ) -> impl Future<Output = Result<Vec<VectorMatch>, VectorError>> + Send;
}

// ---------------------------------------------------------------------------
// Hashing embedder
// ---------------------------------------------------------------------------

/// Deterministic bag-of-words embedder that needs no model server.
///
/// Each lower-cased alphanumeric token is hashed (FNV-1a) into one of
/// `dimensions` buckets with a hash-derived sign; the result is
/// L2-normalized. Texts sharing words land close together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of `dimensions` components
    /// (at least one).
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Output dimensionality.
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed synchronously.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        let buckets = u64::try_from(self.dimensions).unwrap_or(u64::MAX);

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(&token.to_lowercase());
            let bucket = hash
                .checked_rem(buckets)
                .and_then(|b| usize::try_from(b).ok())
                .unwrap_or_default();
            let sign = if hash.leading_zeros() == 0 { -1.0 } else { 1.0 };
            if let Some(slot) = vector.get_mut(bucket) {
                *slot += sign;
            }
        }

        normalize(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        Ok(self.embed_sync(text))
    }
}

/// 64-bit FNV-1a.
fn fnv1a(text: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    text.bytes().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    })
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom > f32::EPSILON { dot / denom } else { 0.0 }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StoredDocument {
    text: String,
    metadata: MemoryMetadata,
    embedding: Vec<f32>,
}

/// Process-local vector store backed by a hash map.
///
/// Contents are lost on exit; the engine persists long-term memory in
/// `PostgreSQL` instead and this store backs tests and scratch runs.
pub struct InMemoryVectorStore<E> {
    embedder: E,
    documents: RwLock<HashMap<MemoryId, StoredDocument>>,
}

impl<E: Embedder> InMemoryVectorStore<E> {
    /// Create an empty store using `embedder` for documents and queries.
    pub fn new(embedder: E) -> Self {
        Self {
            embedder,
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Fetch a stored document's text and metadata by id.
    pub async fn get(&self, id: MemoryId) -> Option<(String, MemoryMetadata)> {
        self.documents
            .read()
            .await
            .get(&id)
            .map(|doc| (doc.text.clone(), doc.metadata.clone()))
    }
}

impl<E: Embedder> VectorStore for InMemoryVectorStore<E> {
    async fn upsert(
        &self,
        id: MemoryId,
        text: &str,
        metadata: MemoryMetadata,
    ) -> Result<(), VectorError> {
        let embedding = self.embedder.embed(text).await?;

        let mut documents = self.documents.write().await;
        if let Some(existing) = documents.values().find(|doc| doc.embedding.len() != embedding.len())
        {
            return Err(VectorError::DimensionMismatch {
                expected: existing.embedding.len(),
                actual: embedding.len(),
            });
        }
        documents.insert(
            id,
            StoredDocument {
                text: text.to_owned(),
                metadata,
                embedding,
            },
        );
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<VectorMatch>, VectorError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let needle = self.embedder.embed(text).await?;

        let documents = self.documents.read().await;
        let scored = documents
            .iter()
            .map(|(id, doc)| VectorMatch {
                id: *id,
                document: doc.text.clone(),
                metadata: doc.metadata.clone(),
                score: cosine_similarity(&needle, &doc.embedding),
            })
            .collect();
        Ok(rank(scored, top_k))
    }
}

/// Best `top_k` matches, highest score first. Ties go to the newer memory.
pub fn rank(mut scored: Vec<VectorMatch>, top_k: usize) -> Vec<VectorMatch> {
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.metadata.timestamp.cmp(&a.metadata.timestamp))
    });
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(timestamp: u64) -> MemoryMetadata {
        MemoryMetadata {
            agent_id: AgentId::new(),
            timestamp,
            importance: 0.7,
            entropy_level: 0.1,
        }
    }

    #[test]
    fn rank_orders_by_score_then_recency_and_truncates() {
        let hit = |document: &str, score: f32, timestamp: u64| VectorMatch {
            id: MemoryId::new(),
            document: document.to_owned(),
            metadata: metadata(timestamp),
            score,
        };
        let ranked = rank(
            vec![
                hit("old tie", 0.5, 1),
                hit("best", 0.9, 0),
                hit("new tie", 0.5, 8),
                hit("worst", 0.1, 9),
            ],
            3,
        );
        let documents: Vec<&str> = ranked.iter().map(|m| m.document.as_str()).collect();
        assert_eq!(documents, vec!["best", "new tie", "old tie"]);
    }

    #[test]
    fn hashing_embedder_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(32);
        let a = embedder.embed_sync("The wolf howled at night");
        let b = embedder.embed_sync("the WOLF howled at night!");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let vector = HashingEmbedder::new(8).embed_sync("");
        assert!(vector.iter().all(|v| v.abs() < f32::EPSILON));
    }

    #[test]
    fn cosine_similarity_bounds() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
    }

    #[tokio::test]
    async fn upsert_overwrites_duplicate_ids() {
        let store = InMemoryVectorStore::new(HashingEmbedder::default());
        let id = MemoryId::new();
        store.upsert(id, "first draft", metadata(1)).await.ok();
        store.upsert(id, "second draft", metadata(2)).await.ok();

        assert_eq!(store.len().await, 1);
        let stored = store.get(id).await;
        assert_eq!(
            stored.map(|(text, meta)| (text, meta.timestamp)),
            Some(("second draft".to_owned(), 2))
        );
    }

    #[tokio::test]
    async fn query_ranks_by_similarity() {
        let store = InMemoryVectorStore::new(HashingEmbedder::default());
        let wolf = MemoryId::new();
        store.upsert(wolf, "a giant wolf stalked the river", metadata(1)).await.ok();
        store.upsert(MemoryId::new(), "baked bread for the elders", metadata(2)).await.ok();
        store.upsert(MemoryId::new(), "carved a flute from bone", metadata(3)).await.ok();

        let results = store.query("wolf river", 2).await.unwrap_or_default();
        assert_eq!(results.len(), 2);
        assert_eq!(results.first().map(|m| m.id), Some(wolf));
    }

    #[tokio::test]
    async fn query_with_zero_top_k_is_empty() {
        let store = InMemoryVectorStore::new(HashingEmbedder::default());
        store.upsert(MemoryId::new(), "anything", metadata(1)).await.ok();
        assert!(store.query("anything", 0).await.unwrap_or_default().is_empty());
    }
}
