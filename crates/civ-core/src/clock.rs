//! The simulation turn counter and periodic cadences.
//!
//! The turn number is the only notion of time in the simulation. A
//! [`TurnClock`] is owned by the simulation state, never shared, and only
//! moves forward. On startup it resumes from the event log: the next turn is
//! one past the highest turn already recorded.
//!
//! A [`Cadence`] decides which turns a periodic task (consolidation, epoch
//! detection, chronicles) runs on, and which trailing window it looks at.

use std::num::NonZeroU64;

use civ_db::EventLog;
use tracing::{info, warn};

/// Errors that can occur when building clock components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// A cadence interval of zero would fire never (or always).
    #[error("{name} interval must be at least 1 turn")]
    ZeroInterval {
        /// Which cadence was misconfigured.
        name: &'static str,
    },
}

/// Monotonic turn counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnClock {
    turn: u64,
}

impl TurnClock {
    /// A clock whose next turn is `turn`.
    pub const fn starting_at(turn: u64) -> Self {
        Self { turn }
    }

    /// Resume from `log`: one past the highest recorded turn, or 0 when the
    /// log is empty. A log that cannot be read is logged and treated as
    /// empty.
    pub async fn resume<L: EventLog>(log: &L) -> Self {
        match log.max_turn().await {
            Ok(Some(max)) => {
                let turn = max.saturating_add(1);
                info!(turn, "Resuming from event log");
                Self::starting_at(turn)
            }
            Ok(None) => {
                info!("Event log empty, starting at turn 0");
                Self::default()
            }
            Err(e) => {
                warn!(error = %e, "Could not read last turn, starting at turn 0");
                Self::default()
            }
        }
    }

    /// The turn about to run (or running).
    pub const fn turn(&self) -> u64 {
        self.turn
    }

    /// Move to the next turn and return it. Saturates at `u64::MAX`.
    pub const fn advance(&mut self) -> u64 {
        self.turn = self.turn.saturating_add(1);
        self.turn
    }
}

/// A task that runs every `interval` turns, never on turn 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    interval: NonZeroU64,
}

impl Cadence {
    /// Build a cadence; `name` labels the error when `interval` is zero.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::ZeroInterval`] if `interval` is 0.
    pub fn new(name: &'static str, interval: u64) -> Result<Self, ClockError> {
        NonZeroU64::new(interval)
            .map(|interval| Self { interval })
            .ok_or(ClockError::ZeroInterval { name })
    }

    /// The interval in turns.
    pub const fn interval(&self) -> u64 {
        self.interval.get()
    }

    /// Whether the task runs on `turn`.
    pub const fn fires_at(&self, turn: u64) -> bool {
        turn > 0 && matches!(turn.checked_rem(self.interval.get()), Some(0))
    }

    /// First turn of the trailing window ending (exclusive) at `turn`.
    pub const fn window_start(&self, turn: u64) -> u64 {
        turn.saturating_sub(self.interval.get())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use civ_db::{DbError, EventQuery, InMemoryEventLog};
    use civ_types::{AgentId, Epoch, Event, NewEpoch, NewEvent};

    use super::*;

    /// A log whose every call fails.
    struct DownLog;

    impl EventLog for DownLog {
        async fn append_batch(&self, _: &[NewEvent]) -> Result<Vec<i64>, DbError> {
            Err(DbError::Config("down".to_owned()))
        }
        async fn query(&self, _: &EventQuery) -> Result<Vec<Event>, DbError> {
            Err(DbError::Config("down".to_owned()))
        }
        async fn recent(&self, _: usize) -> Result<Vec<Event>, DbError> {
            Err(DbError::Config("down".to_owned()))
        }
        async fn max_turn(&self) -> Result<Option<u64>, DbError> {
            Err(DbError::Config("down".to_owned()))
        }
        async fn latest_epoch(&self) -> Result<Option<Epoch>, DbError> {
            Err(DbError::Config("down".to_owned()))
        }
        async fn epochs(&self) -> Result<Vec<Epoch>, DbError> {
            Err(DbError::Config("down".to_owned()))
        }
        async fn record_epoch(
            &self,
            _: &NewEpoch,
            _: Option<&NewEvent>,
        ) -> Result<Option<Epoch>, DbError> {
            Err(DbError::Config("down".to_owned()))
        }
    }

    #[test]
    fn advance_is_monotonic_and_saturating() {
        let mut clock = TurnClock::default();
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.turn(), 1);

        let mut edge = TurnClock::starting_at(u64::MAX);
        assert_eq!(edge.advance(), u64::MAX);
    }

    #[test]
    fn cadence_never_fires_on_turn_zero() {
        let cadence = Cadence::new("epoch", 50).unwrap();
        assert!(!cadence.fires_at(0));
        assert!(!cadence.fires_at(49));
        assert!(cadence.fires_at(50));
        assert!(cadence.fires_at(100));
        assert_eq!(cadence.window_start(100), 50);
    }

    #[test]
    fn zero_cadence_is_rejected() {
        assert_eq!(
            Cadence::new("chronicle", 0),
            Err(ClockError::ZeroInterval { name: "chronicle" })
        );
    }

    #[tokio::test]
    async fn resume_from_empty_log_starts_at_zero() {
        let clock = TurnClock::resume(&InMemoryEventLog::new()).await;
        assert_eq!(clock.turn(), 0);
    }

    #[tokio::test]
    async fn resume_continues_after_max_turn() {
        let log = InMemoryEventLog::new();
        let agent = AgentId::new();
        log.append_batch(&[
            NewEvent::daily_action(4, agent, "fished"),
            NewEvent::daily_action(11, agent, "slept"),
        ])
        .await
        .unwrap();
        assert_eq!(TurnClock::resume(&log).await.turn(), 12);
    }

    #[tokio::test]
    async fn resume_with_unreadable_log_starts_at_zero() {
        assert_eq!(TurnClock::resume(&DownLog).await.turn(), 0);
    }
}
