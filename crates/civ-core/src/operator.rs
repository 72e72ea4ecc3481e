//! Operator control state for a running simulation.
//!
//! Shared between the run loop and whatever may end it (the Ctrl-C handler
//! in the engine binary, tests). A stop takes effect between turns: a turn
//! that has started always finishes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// Reason why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEndReason {
    /// Ran the configured number of turns.
    MaxTurnsReached,
    /// An operator (or Ctrl-C) requested a stop.
    OperatorStop,
}

/// Shared operator control state, wrapped in [`std::sync::Arc`].
#[derive(Debug)]
pub struct OperatorState {
    stop_requested: AtomicBool,
    /// Cuts the inter-turn sleep short on stop.
    wake: Notify,
    turn_interval: Duration,
    max_turns: u64,
}

impl OperatorState {
    /// Create control state. `max_turns` of 0 means unlimited.
    pub fn new(turn_interval_ms: u64, max_turns: u64) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            wake: Notify::new(),
            turn_interval: Duration::from_millis(turn_interval_ms),
            max_turns,
        }
    }

    /// Request a clean stop before the next turn.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify_waiters();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Sleep for the turn interval, returning early if a stop is requested.
    pub async fn pause_between_turns(&self) {
        if self.turn_interval.is_zero() {
            return;
        }
        let woken = self.wake.notified();
        if self.is_stop_requested() {
            return;
        }
        tokio::select! {
            () = tokio::time::sleep(self.turn_interval) => {}
            () = woken => {}
        }
    }

    /// Pause between turns.
    pub const fn turn_interval(&self) -> Duration {
        self.turn_interval
    }

    /// Configured turn limit (0 = unlimited).
    pub const fn max_turns(&self) -> u64 {
        self.max_turns
    }

    /// Whether `turns_run` turns exhaust the limit.
    pub const fn turn_limit_reached(&self, turns_run: u64) -> bool {
        self.max_turns > 0 && turns_run >= self.max_turns
    }
}
