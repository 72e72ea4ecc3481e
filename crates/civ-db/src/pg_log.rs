//! `PostgreSQL` implementation of [`EventLog`].
//!
//! Events live in `simulation_events`, epochs in `historical_epochs`. Agent
//! sources are stored as their UUID text or the `SYSTEM` sentinel, and kinds
//! as their upper-case tag, so rows stay readable by other tools.

use chrono::{DateTime, Utc};
use civ_types::{Epoch, Event, EventKind, EventSource, MemoryId, NewEpoch, NewEvent};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::DbError;
use crate::log::{EventLog, EventQuery};

/// A row from the `simulation_events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Sequence id.
    pub id: i64,
    /// Turn the event belongs to.
    pub turn: i64,
    /// Agent UUID text or `SYSTEM`.
    pub agent_id: String,
    /// Upper-case kind tag.
    pub event_type: String,
    /// Event text.
    pub content: String,
    /// Optional vector-store document id.
    pub vector_ref: Option<Uuid>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = DbError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            turn: u64::try_from(row.turn).map_err(|e| DbError::invalid_row("turn", e))?,
            source: EventSource::try_from(row.agent_id)
                .map_err(|e| DbError::invalid_row("agent_id", e))?,
            kind: row
                .event_type
                .parse()
                .map_err(|e| DbError::invalid_row("event_type", e))?,
            content: row.content,
            vector_ref: row.vector_ref.map(MemoryId::from),
            created_at: row.created_at,
        })
    }
}

/// A row from the `historical_epochs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EpochRow {
    /// Sequence id.
    pub id: i64,
    /// First turn covered.
    pub turn_start: i64,
    /// First turn not covered, if closed.
    pub turn_end: Option<i64>,
    /// Era name.
    pub epoch_name: String,
    /// Art prompt for the era.
    pub master_prompt: Option<String>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<EpochRow> for Epoch {
    type Error = DbError;

    fn try_from(row: EpochRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.epoch_name,
            turn_start: u64::try_from(row.turn_start)
                .map_err(|e| DbError::invalid_row("turn_start", e))?,
            turn_end: row
                .turn_end
                .map(u64::try_from)
                .transpose()
                .map_err(|e| DbError::invalid_row("turn_end", e))?,
            master_prompt: row.master_prompt,
            created_at: row.created_at,
        })
    }
}

const EVENT_COLUMNS: &str = "id, turn, agent_id, event_type, content, vector_ref, created_at";
const EPOCH_COLUMNS: &str = "id, turn_start, turn_end, epoch_name, master_prompt, created_at";

fn to_db_turn(turn: u64) -> i64 {
    i64::try_from(turn).unwrap_or(i64::MAX)
}

/// Event log backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    /// Create a log over an existing pool. Migrations must already be applied.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// UNNEST-based multi-row insert inside an open transaction.
    async fn insert_events(
        tx: &mut Transaction<'_, Postgres>,
        events: &[NewEvent],
    ) -> Result<Vec<i64>, DbError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let len = events.len();
        let mut turns = Vec::with_capacity(len);
        let mut agent_ids = Vec::with_capacity(len);
        let mut event_types = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut vector_refs: Vec<Option<Uuid>> = Vec::with_capacity(len);

        for event in events {
            turns.push(to_db_turn(event.turn));
            agent_ids.push(event.source.to_string());
            event_types.push(event.kind.as_str().to_owned());
            contents.push(event.content.clone());
            vector_refs.push(event.vector_ref.map(MemoryId::into_inner));
        }

        // WITH ORDINALITY keeps RETURNING in input order.
        let ids: Vec<(i64,)> = sqlx::query_as(
            r"
            INSERT INTO simulation_events (turn, agent_id, event_type, content, vector_ref)
            SELECT turn, agent_id, event_type, content, vector_ref
            FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[], $4::TEXT[], $5::UUID[])
                WITH ORDINALITY AS t(turn, agent_id, event_type, content, vector_ref, ord)
            ORDER BY ord
            RETURNING id
            ",
        )
        .bind(&turns)
        .bind(&agent_ids)
        .bind(&event_types)
        .bind(&contents)
        .bind(&vector_refs)
        .fetch_all(&mut **tx)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}

impl EventLog for PgEventLog {
    async fn append_batch(&self, events: &[NewEvent]) -> Result<Vec<i64>, DbError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let mut tx = self.pool.begin().await?;
        let ids = Self::insert_events(&mut tx, events).await?;
        tx.commit().await?;

        tracing::debug!(count = ids.len(), "Appended events");
        Ok(ids)
    }

    async fn query(&self, query: &EventQuery) -> Result<Vec<Event>, DbError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM simulation_events \
             WHERE ($1::BIGINT IS NULL OR turn >= $1) \
               AND ($2::BIGINT IS NULL OR turn < $2) \
               AND ($3::TEXT IS NULL OR event_type = $3) \
               AND ($4::TEXT IS NULL OR agent_id = $4) \
             ORDER BY turn ASC, id ASC \
             LIMIT $5"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(query.turn_from.map(to_db_turn))
            .bind(query.turn_to.map(to_db_turn))
            .bind(query.kind.map(EventKind::as_str))
            .bind(query.source.as_ref().map(ToString::to_string))
            .bind(query.limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX)))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Event>, DbError> {
        let sql =
            format!("SELECT {EVENT_COLUMNS} FROM simulation_events ORDER BY id DESC LIMIT $1");
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    async fn max_turn(&self) -> Result<Option<u64>, DbError> {
        let (max,): (Option<i64>,) = sqlx::query_as("SELECT MAX(turn) FROM simulation_events")
            .fetch_one(&self.pool)
            .await?;

        max.map(u64::try_from)
            .transpose()
            .map_err(|e| DbError::invalid_row("turn", e))
    }

    async fn latest_epoch(&self) -> Result<Option<Epoch>, DbError> {
        let sql = format!(
            "SELECT {EPOCH_COLUMNS} FROM historical_epochs ORDER BY turn_start DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, EpochRow>(&sql)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Epoch::try_from).transpose()
    }

    async fn epochs(&self) -> Result<Vec<Epoch>, DbError> {
        let sql = format!("SELECT {EPOCH_COLUMNS} FROM historical_epochs ORDER BY turn_start ASC");
        let rows = sqlx::query_as::<_, EpochRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Epoch::try_from).collect()
    }

    async fn record_epoch(
        &self,
        epoch: &NewEpoch,
        announcement: Option<&NewEvent>,
    ) -> Result<Option<Epoch>, DbError> {
        let mut tx = self.pool.begin().await?;

        // Serialize epoch writers so the guard and the insert see the same table.
        sqlx::query("LOCK TABLE historical_epochs IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let (latest,): (Option<i64>,) =
            sqlx::query_as("SELECT MAX(turn_start) FROM historical_epochs")
                .fetch_one(&mut *tx)
                .await?;
        let start = to_db_turn(epoch.turn_start);
        if latest.is_some_and(|latest| latest >= start) {
            tx.rollback().await?;
            return Ok(None);
        }

        let sql = format!(
            "INSERT INTO historical_epochs (turn_start, turn_end, epoch_name, master_prompt) \
             VALUES ($1, $2, $3, $4) RETURNING {EPOCH_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EpochRow>(&sql)
            .bind(start)
            .bind(epoch.turn_end.map(to_db_turn))
            .bind(&epoch.name)
            .bind(epoch.master_prompt.as_deref())
            .fetch_one(&mut *tx)
            .await?;

        if let Some(event) = announcement {
            Self::insert_events(&mut tx, std::slice::from_ref(event)).await?;
        }
        tx.commit().await?;

        tracing::info!(
            epoch = %row.epoch_name,
            turn_start = row.turn_start,
            "Recorded epoch"
        );
        Epoch::try_from(row).map(Some)
    }
}
