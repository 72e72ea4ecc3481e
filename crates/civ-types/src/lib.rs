//! Shared type definitions for the Entropy Civ simulation.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace. The event log rows and the sandbox snapshot flow
//! downstream to `TypeScript` via `ts-rs` for the presentation layer.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agents and memory items
//! - [`enums`] -- Event kinds and the classifier's display tags
//! - [`structs`] -- Events, epochs, memories, agent state, snapshots

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{ActionLabel, Emotion, EventKind, UnknownTag};
pub use ids::{AgentId, MemoryId};
pub use structs::{
    ActionClassification, AgentIdentity, AgentState, AgentView, COORD_MAX, COORD_MIN, Epoch,
    Event, EventSource, MemoryItem, Needs, NewEpoch, NewEvent, Position, SYSTEM_SOURCE,
    SandboxSnapshot,
};
