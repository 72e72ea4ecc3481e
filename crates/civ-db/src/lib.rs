//! Event log and durable long-term memory for the Entropy Civ simulation.
//!
//! The event log is the single source of truth for simulation history. It
//! is append-only; the orchestrator writes one transaction per turn, and the
//! epoch and chronicle detectors write their own. Consolidated agent
//! memories live next to it in `long_term_memories`.
//!
//! ```text
//! Orchestrator::step
//!     |
//!     +-- append_batch ---------> simulation_events
//!     +-- EpochDetector ---------> historical_epochs (+ EPOCH event)
//!     +-- ChronicleSummarizer ---> simulation_events
//! ```
//!
//! # Modules
//!
//! - [`log`] -- The [`EventLog`] trait, [`EventQuery`], and [`InMemoryEventLog`]
//! - [`pg_log`] -- [`PgEventLog`], the `PostgreSQL` implementation
//! - [`pg_memory`] -- [`PgVectorStore`], long-term agent memory in `PostgreSQL`
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`error`] -- Shared error types

pub mod error;
pub mod log;
pub mod pg_log;
pub mod pg_memory;
pub mod postgres;

pub use error::DbError;
pub use log::{EventLog, EventQuery, InMemoryEventLog};
pub use pg_log::{EpochRow, EventRow, PgEventLog};
pub use pg_memory::{MemoryRow, PgVectorStore};
pub use postgres::{
    DEFAULT_ACQUIRE_TIMEOUT_MS, DEFAULT_DATABASE_URL, DEFAULT_IDLE_TIMEOUT_SECS,
    DEFAULT_MAX_CONNECTIONS, PostgresConfig, PostgresPool,
};
