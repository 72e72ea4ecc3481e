//! The embedder backing the engine's long-term memory store.

use std::sync::Arc;

use civ_agents::{Embedder, HashingEmbedder, VectorError};
use civ_llm::LlmRouter;

/// Local hashing or the router's embedding model, chosen by config.
pub enum EngineEmbedder {
    /// Feature hashing, no model server needed.
    Hashing(HashingEmbedder),
    /// The embedding model tier of the LLM router.
    Model(Arc<LlmRouter>),
}

impl Embedder for EngineEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        match self {
            Self::Hashing(hashing) => hashing.embed(text).await,
            Self::Model(router) => router
                .embed(text)
                .await
                .map_err(|e| VectorError::Embedding(e.to_string())),
        }
    }
}
