//! The event log abstraction and its in-memory implementation.
//!
//! The log is append-only: events and epochs are inserted, never updated or
//! deleted. Every read is a scan over a window of the log, so derived state
//! (epochs, chronicles, the resume point) can always be recomputed.

use std::future::Future;

use chrono::Utc;
use civ_types::{Epoch, Event, EventKind, EventSource, NewEpoch, NewEvent};
use tokio::sync::Mutex;

use crate::error::DbError;

/// Filter for [`EventLog::query`]. Results are ordered by turn ascending,
/// then by sequence id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    /// First turn included.
    pub turn_from: Option<u64>,
    /// First turn excluded.
    pub turn_to: Option<u64>,
    /// Only events of this kind.
    pub kind: Option<EventKind>,
    /// Only events from this source.
    pub source: Option<EventSource>,
    /// Maximum number of rows returned.
    pub limit: Option<usize>,
}

impl EventQuery {
    /// Everything in the log.
    pub fn all() -> Self {
        Self::default()
    }

    /// Events with `start <= turn < end`.
    pub const fn turns(start: u64, end: u64) -> Self {
        Self {
            turn_from: Some(start),
            turn_to: Some(end),
            kind: None,
            source: None,
            limit: None,
        }
    }

    /// Restrict to one event kind.
    #[must_use]
    pub const fn kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to one source.
    #[must_use]
    pub const fn source(mut self, source: EventSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Cap the number of rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `event` passes every filter except the limit.
    pub fn matches(&self, event: &Event) -> bool {
        self.turn_from.is_none_or(|from| event.turn >= from)
            && self.turn_to.is_none_or(|to| event.turn < to)
            && self.kind.is_none_or(|kind| event.kind == kind)
            && self.source.is_none_or(|source| event.source == source)
    }
}

/// Append-only store of simulation events and detected epochs.
pub trait EventLog: Send + Sync {
    /// Append `events` in one transaction: either every event is stored or
    /// none is. Returns the assigned sequence ids in input order.
    fn append_batch(
        &self,
        events: &[NewEvent],
    ) -> impl Future<Output = Result<Vec<i64>, DbError>> + Send;

    /// Events matching `query`, ordered by turn ascending.
    fn query(&self, query: &EventQuery) -> impl Future<Output = Result<Vec<Event>, DbError>> + Send;

    /// The `limit` most recently appended events, newest first.
    fn recent(&self, limit: usize) -> impl Future<Output = Result<Vec<Event>, DbError>> + Send;

    /// The highest turn present in the log, or `None` when it is empty.
    fn max_turn(&self) -> impl Future<Output = Result<Option<u64>, DbError>> + Send;

    /// The epoch with the greatest start turn.
    fn latest_epoch(&self) -> impl Future<Output = Result<Option<Epoch>, DbError>> + Send;

    /// Every epoch, ordered by start turn ascending.
    fn epochs(&self) -> impl Future<Output = Result<Vec<Epoch>, DbError>> + Send;

    /// Record `epoch` unless an epoch starting at or after its start already
    /// exists. When recorded, `announcement` (if any) is appended in the same
    /// transaction. Returns the stored epoch, or `None` if the guard refused
    /// it.
    fn record_epoch(
        &self,
        epoch: &NewEpoch,
        announcement: Option<&NewEvent>,
    ) -> impl Future<Output = Result<Option<Epoch>, DbError>> + Send;
}

#[derive(Default)]
struct Tables {
    events: Vec<Event>,
    epochs: Vec<Epoch>,
    next_event_id: i64,
    next_epoch_id: i64,
}

impl Tables {
    fn insert_event(&mut self, new: &NewEvent) -> i64 {
        self.next_event_id = self.next_event_id.saturating_add(1);
        let id = self.next_event_id;
        self.events.push(Event {
            id,
            turn: new.turn,
            source: new.source,
            kind: new.kind,
            content: new.content.clone(),
            vector_ref: new.vector_ref,
            created_at: Utc::now(),
        });
        id
    }
}

/// Event log held in process memory. Used by tests and by runs without a
/// database.
#[derive(Default)]
pub struct InMemoryEventLog {
    tables: Mutex<Tables>,
}

impl InMemoryEventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events.
    pub async fn len(&self) -> usize {
        self.tables.lock().await.events.len()
    }

    /// Whether no events are stored.
    pub async fn is_empty(&self) -> bool {
        self.tables.lock().await.events.is_empty()
    }
}

impl EventLog for InMemoryEventLog {
    async fn append_batch(&self, events: &[NewEvent]) -> Result<Vec<i64>, DbError> {
        let mut tables = self.tables.lock().await;
        Ok(events.iter().map(|event| tables.insert_event(event)).collect())
    }

    async fn query(&self, query: &EventQuery) -> Result<Vec<Event>, DbError> {
        let tables = self.tables.lock().await;
        let mut found: Vec<Event> = tables
            .events
            .iter()
            .filter(|event| query.matches(event))
            .cloned()
            .collect();
        found.sort_by_key(|event| (event.turn, event.id));
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Event>, DbError> {
        let tables = self.tables.lock().await;
        Ok(tables.events.iter().rev().take(limit).cloned().collect())
    }

    async fn max_turn(&self) -> Result<Option<u64>, DbError> {
        let tables = self.tables.lock().await;
        Ok(tables.events.iter().map(|event| event.turn).max())
    }

    async fn latest_epoch(&self) -> Result<Option<Epoch>, DbError> {
        let tables = self.tables.lock().await;
        Ok(tables.epochs.iter().max_by_key(|epoch| epoch.turn_start).cloned())
    }

    async fn epochs(&self) -> Result<Vec<Epoch>, DbError> {
        let tables = self.tables.lock().await;
        let mut epochs = tables.epochs.clone();
        epochs.sort_by_key(|epoch| epoch.turn_start);
        Ok(epochs)
    }

    async fn record_epoch(
        &self,
        epoch: &NewEpoch,
        announcement: Option<&NewEvent>,
    ) -> Result<Option<Epoch>, DbError> {
        let mut tables = self.tables.lock().await;
        let covered = tables
            .epochs
            .iter()
            .any(|existing| existing.turn_start >= epoch.turn_start);
        if covered {
            return Ok(None);
        }

        tables.next_epoch_id = tables.next_epoch_id.saturating_add(1);
        let stored = Epoch {
            id: tables.next_epoch_id,
            name: epoch.name.clone(),
            turn_start: epoch.turn_start,
            turn_end: epoch.turn_end,
            master_prompt: epoch.master_prompt.clone(),
            created_at: Utc::now(),
        };
        tables.epochs.push(stored.clone());
        if let Some(event) = announcement {
            tables.insert_event(event);
        }
        Ok(Some(stored))
    }
}

#[cfg(test)]
mod tests {
    use civ_types::AgentId;

    use super::*;

    fn epoch(name: &str, start: u64, end: u64) -> NewEpoch {
        NewEpoch {
            name: name.to_owned(),
            turn_start: start,
            turn_end: Some(end),
            master_prompt: None,
        }
    }

    #[tokio::test]
    async fn empty_log_has_no_max_turn() {
        let log = InMemoryEventLog::new();
        assert_eq!(log.max_turn().await.ok().flatten(), None);
        assert!(log.is_empty().await);
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids() {
        let log = InMemoryEventLog::new();
        let agent = AgentId::new();
        let ids = log
            .append_batch(&[
                NewEvent::daily_action(3, agent, "fished"),
                NewEvent::daily_action(3, agent, "slept"),
            ])
            .await
            .unwrap_or_default();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(log.max_turn().await.ok().flatten(), Some(3));
    }

    #[tokio::test]
    async fn query_filters_by_window_and_kind() {
        let log = InMemoryEventLog::new();
        let agent = AgentId::new();
        let batch = [
            NewEvent::daily_action(9, agent, "before"),
            NewEvent::reflection(10, agent, "inside", None),
            NewEvent::daily_action(12, agent, "inside too"),
            NewEvent::reflection(15, agent, "after", None),
        ];
        assert!(log.append_batch(&batch).await.is_ok());

        let window = log.query(&EventQuery::turns(10, 15)).await.unwrap_or_default();
        let contents: Vec<&str> = window.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["inside", "inside too"]);

        let reflections = log
            .query(&EventQuery::turns(0, 100).kind(EventKind::Reflection))
            .await
            .unwrap_or_default();
        assert_eq!(reflections.len(), 2);

        let limited = log.query(&EventQuery::all().limit(1)).await.unwrap_or_default();
        assert_eq!(limited.first().map(|e| e.turn), Some(9));
    }

    #[tokio::test]
    async fn query_orders_by_turn_not_insertion() {
        let log = InMemoryEventLog::new();
        assert!(log.append_batch(&[NewEvent::system(20, EventKind::ChronicleSummary, "late")]).await.is_ok());
        assert!(log.append_batch(&[NewEvent::system(5, EventKind::Epoch, "early")]).await.is_ok());
        let all = log.query(&EventQuery::all()).await.unwrap_or_default();
        let turns: Vec<u64> = all.iter().map(|e| e.turn).collect();
        assert_eq!(turns, vec![5, 20]);
    }

    #[tokio::test]
    async fn recent_is_newest_first() {
        let log = InMemoryEventLog::new();
        for turn in 0..5 {
            assert!(log.append_batch(&[NewEvent::system(turn, EventKind::Epoch, "x")]).await.is_ok());
        }
        let recent = log.recent(2).await.unwrap_or_default();
        let ids: Vec<i64> = recent.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![5, 4]);
    }

    #[tokio::test]
    async fn epoch_guard_refuses_regression() {
        let log = InMemoryEventLog::new();
        let first = log.record_epoch(&epoch("The Era of Fire", 50, 100), None).await;
        assert!(first.is_ok_and(|e| e.is_some()));

        let same = log.record_epoch(&epoch("Again", 50, 100), None).await;
        assert!(same.is_ok_and(|e| e.is_none()));
        let older = log.record_epoch(&epoch("Older", 0, 50), None).await;
        assert!(older.is_ok_and(|e| e.is_none()));

        let later = log.record_epoch(&epoch("The Era of Ice", 100, 150), None).await;
        assert!(later.is_ok_and(|e| e.is_some()));

        let starts: Vec<u64> = log.epochs().await.unwrap_or_default().iter().map(|e| e.turn_start).collect();
        assert_eq!(starts, vec![50, 100]);
        let latest = log.latest_epoch().await.ok().flatten();
        assert_eq!(latest.map(|e| e.name), Some("The Era of Ice".to_owned()));
    }

    #[tokio::test]
    async fn announcement_is_written_only_with_the_epoch() {
        let log = InMemoryEventLog::new();
        let note = NewEvent::system(50, EventKind::Epoch, "[Epoch T0-50] Dawn");
        assert!(log.record_epoch(&epoch("Dawn", 0, 50), Some(&note)).await.is_ok());
        assert!(log.record_epoch(&epoch("Dawn", 0, 50), Some(&note)).await.is_ok());
        assert_eq!(log.len().await, 1);
    }
}
