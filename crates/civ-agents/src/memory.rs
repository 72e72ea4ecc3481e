//! Tiered agent memory: a short-term buffer over shared long-term storage.
//!
//! New experiences land in the short-term buffer via
//! [`TieredMemory::add`]. On the consolidation cadence,
//! [`TieredMemory::consolidate`] promotes every buffered item whose
//! importance reaches [`PROMOTION_THRESHOLD`]: the item is distorted by the
//! agent's [`EntropyTransform`], its entropy level rises by
//! [`ENTROPY_STEP`], and it is upserted into the vector store. The buffer
//! is then cleared whether or not anything was promoted.

use std::sync::Arc;

use civ_types::{AgentId, MemoryId, MemoryItem};
use tracing::{debug, warn};

use crate::entropy::{EntropyTransform, Passthrough};
use crate::vector::{MemoryMetadata, VectorMatch, VectorStore};

/// Minimum importance for promotion to long-term memory.
pub const PROMOTION_THRESHOLD: f64 = 0.5;

/// Entropy added to an item each time it is consolidated.
pub const ENTROPY_STEP: f64 = 0.1;

/// One agent's memory.
pub struct TieredMemory<V> {
    agent_id: AgentId,
    short_term: Vec<MemoryItem>,
    store: Arc<V>,
    entropy: Box<dyn EntropyTransform>,
}

impl<V: VectorStore> TieredMemory<V> {
    /// Create an empty memory for `agent_id` with a passthrough transform.
    pub fn new(agent_id: AgentId, store: Arc<V>) -> Self {
        Self::with_entropy(agent_id, store, Box::new(Passthrough))
    }

    /// Create an empty memory with a custom entropy transform.
    pub fn with_entropy(
        agent_id: AgentId,
        store: Arc<V>,
        entropy: Box<dyn EntropyTransform>,
    ) -> Self {
        Self {
            agent_id,
            short_term: Vec::new(),
            store,
            entropy,
        }
    }

    /// Buffer a new experience and return its id. Importance is clamped to
    /// `0.0..=1.0`.
    pub fn add(&mut self, content: impl Into<String>, importance: f64, timestamp: u64) -> MemoryId {
        let item = MemoryItem::new(content, importance, timestamp);
        let id = item.id;
        self.short_term.push(item);
        id
    }

    /// The short-term buffer, oldest first.
    pub fn short_term(&self) -> &[MemoryItem] {
        &self.short_term
    }

    /// Promote important buffered items to long-term storage.
    ///
    /// Returns the promoted items in buffer order, already distorted and
    /// with their entropy raised. A failed upsert is logged and the item is
    /// still returned. The buffer is empty afterwards.
    pub async fn consolidate(&mut self, current_time: u64) -> Vec<MemoryItem> {
        let buffered = std::mem::take(&mut self.short_term);
        let total = buffered.len();
        let mut promoted = Vec::new();

        for mut item in buffered {
            if item.importance < PROMOTION_THRESHOLD {
                continue;
            }

            item.content = self.entropy.apply(&item.content);
            item.entropy_level += ENTROPY_STEP;

            let metadata = MemoryMetadata {
                agent_id: self.agent_id,
                timestamp: item.timestamp,
                importance: item.importance,
                entropy_level: item.entropy_level,
            };
            if let Err(e) = self.store.upsert(item.id, &item.content, metadata).await {
                warn!(
                    agent = %self.agent_id,
                    memory = %item.id,
                    error = %e,
                    "long-term upsert failed, keeping item in consolidation result"
                );
            }
            promoted.push(item);
        }

        debug!(
            agent = %self.agent_id,
            turn = current_time,
            buffered = total,
            promoted = promoted.len(),
            "memory consolidated"
        );
        promoted
    }

    /// Retrieve up to `top_k` long-term memories similar to `query`.
    ///
    /// Store errors are logged and yield an empty result.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<VectorMatch> {
        match self.store.query(query, top_k).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(agent = %self.agent_id, error = %e, "memory retrieval failed");
                Vec::new()
            }
        }
    }
}
