//! Turn orchestration for the Entropy Civ simulation.
//!
//! This crate owns the simulation clock and the turn loop. Each turn the
//! [`Orchestrator`] collects daily actions, periodically consolidates and
//! mythologizes memories, commits the turn's events in one transaction,
//! runs the [`EpochDetector`] and [`ChronicleSummarizer`], and publishes a
//! sandbox snapshot.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration
//! - [`clock`] -- Turn counter, resume, and cadences
//! - [`state`] -- Simulation state (clock, roster, RNG)
//! - [`orchestrator`] -- One turn, end to end
//! - [`epoch`] -- Era detection and naming
//! - [`chronicle`] -- Periodic narrative summaries
//! - [`snapshot`] -- Sandbox view listeners
//! - [`operator`] -- Pause, resume, speed, stop
//! - [`runner`] -- The bounded run loop

pub mod chronicle;
pub mod clock;
pub mod config;
pub mod epoch;
pub mod operator;
pub mod orchestrator;
pub mod runner;
pub mod snapshot;
pub mod state;

pub use chronicle::ChronicleSummarizer;
pub use clock::{Cadence, ClockError, TurnClock};
pub use config::{ConfigError, EmbedderKind, SimulationConfig};
pub use epoch::{EpochDetector, sanitize_era_name};
pub use operator::{OperatorState, SimulationEndReason};
pub use orchestrator::{Orchestrator, TurnSettings, TurnSummary};
pub use runner::{SimulationResult, run_simulation};
pub use snapshot::{JsonFileSnapshot, SnapshotError, SnapshotListener, WatchSnapshot};
pub use state::SimulationState;
