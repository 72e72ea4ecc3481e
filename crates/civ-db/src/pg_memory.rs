//! Long-term agent memory in `PostgreSQL`.
//!
//! [`PgVectorStore`] keeps every consolidated memory in
//! `long_term_memories` with its embedding as a `REAL[]`, so legends outlive
//! the process. Upserts overwrite on id. Queries load the embeddings and
//! rank them in Rust; a village's memory stays in the thousands of rows.

use civ_agents::{
    Embedder, MemoryMetadata, VectorError, VectorMatch, VectorStore, cosine_similarity, rank,
};
use civ_types::{AgentId, MemoryId};
use sqlx::PgPool;
use uuid::Uuid;

/// A row from the `long_term_memories` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemoryRow {
    /// Memory id.
    pub id: Uuid,
    /// Owning agent.
    pub agent_id: Uuid,
    /// Stored (already distorted) text.
    pub document: String,
    /// Turn of origin.
    pub turn: i64,
    /// Importance at consolidation.
    pub importance: f64,
    /// Entropy after the latest consolidation.
    pub entropy_level: f64,
    /// Document embedding.
    pub embedding: Vec<f32>,
}

impl MemoryRow {
    fn metadata(&self) -> Result<MemoryMetadata, VectorError> {
        Ok(MemoryMetadata {
            agent_id: AgentId::from(self.agent_id),
            timestamp: u64::try_from(self.turn).map_err(store_error)?,
            importance: self.importance,
            entropy_level: self.entropy_level,
        })
    }
}

const MEMORY_COLUMNS: &str = "id, agent_id, document, turn, importance, entropy_level, embedding";

fn store_error(e: impl std::fmt::Display) -> VectorError {
    VectorError::Store(e.to_string())
}

fn dimensions(len: i32) -> usize {
    usize::try_from(len).unwrap_or_default()
}

/// Vector store persisted in `PostgreSQL`.
pub struct PgVectorStore<E> {
    pool: PgPool,
    embedder: E,
}

impl<E: Embedder> PgVectorStore<E> {
    /// Create a store over an existing pool. Migrations must already be
    /// applied.
    pub const fn new(pool: PgPool, embedder: E) -> Self {
        Self { pool, embedder }
    }

    /// Fetch a stored document's text and metadata by id.
    pub async fn get(
        &self,
        id: MemoryId,
    ) -> Result<Option<(String, MemoryMetadata)>, VectorError> {
        let sql = format!("SELECT {MEMORY_COLUMNS} FROM long_term_memories WHERE id = $1");
        let row = sqlx::query_as::<_, MemoryRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        match row {
            Some(row) => {
                let metadata = row.metadata()?;
                Ok(Some((row.document, metadata)))
            }
            None => Ok(None),
        }
    }

    /// Number of stored memories.
    pub async fn count(&self) -> Result<u64, VectorError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM long_term_memories")
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

impl<E: Embedder> VectorStore for PgVectorStore<E> {
    async fn upsert(
        &self,
        id: MemoryId,
        text: &str,
        metadata: MemoryMetadata,
    ) -> Result<(), VectorError> {
        let embedding = self.embedder.embed(text).await?;

        let stored: Option<(i32,)> = sqlx::query_as(
            "SELECT COALESCE(array_length(embedding, 1), 0) FROM long_term_memories \
             WHERE id <> $1 LIMIT 1",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        if let Some((len,)) = stored {
            let expected = dimensions(len);
            if expected != embedding.len() {
                return Err(VectorError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        sqlx::query(
            r"
            INSERT INTO long_term_memories
                (id, agent_id, document, turn, importance, entropy_level, embedding)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                agent_id = EXCLUDED.agent_id,
                document = EXCLUDED.document,
                turn = EXCLUDED.turn,
                importance = EXCLUDED.importance,
                entropy_level = EXCLUDED.entropy_level,
                embedding = EXCLUDED.embedding,
                updated_at = now()
            ",
        )
        .bind(id.into_inner())
        .bind(metadata.agent_id.into_inner())
        .bind(text)
        .bind(i64::try_from(metadata.timestamp).unwrap_or(i64::MAX))
        .bind(metadata.importance)
        .bind(metadata.entropy_level)
        .bind(&embedding)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        tracing::trace!(memory = %id, agent = %metadata.agent_id, "Memory upserted");
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<VectorMatch>, VectorError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let needle = self.embedder.embed(text).await?;

        let sql = format!("SELECT {MEMORY_COLUMNS} FROM long_term_memories");
        let rows = sqlx::query_as::<_, MemoryRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        let scored = rows
            .into_iter()
            .map(|row| -> Result<VectorMatch, VectorError> {
                let metadata = row.metadata()?;
                Ok(VectorMatch {
                    id: MemoryId::from(row.id),
                    score: cosine_similarity(&needle, &row.embedding),
                    document: row.document,
                    metadata,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rank(scored, top_k))
    }
}
