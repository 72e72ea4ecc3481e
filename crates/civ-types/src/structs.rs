//! Core entity structs for the Entropy Civ simulation.
//!
//! Covers the event log rows ([`Event`], [`Epoch`]), agent memory
//! ([`MemoryItem`]), agent identity and runtime state, and the sandbox
//! snapshot published after each turn.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ActionLabel, Emotion, EventKind};
use crate::ids::{AgentId, MemoryId};

/// Tag stored in place of an agent id for events the system itself emits.
pub const SYSTEM_SOURCE: &str = "SYSTEM";

/// Lower bound of the sandbox coordinate range.
pub const COORD_MIN: f64 = 0.0;

/// Upper bound of the sandbox coordinate range.
pub const COORD_MAX: f64 = 100.0;

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

/// Who produced an event: a specific agent, or the simulation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EventSource {
    /// An agent-authored event.
    Agent(AgentId),
    /// Emitted by a detector or the orchestrator (the `SYSTEM` sentinel).
    System,
}

impl EventSource {
    /// The agent id, if this event came from an agent.
    pub const fn agent(self) -> Option<AgentId> {
        match self {
            Self::Agent(id) => Some(id),
            Self::System => None,
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent(id) => write!(f, "{id}"),
            Self::System => f.write_str(SYSTEM_SOURCE),
        }
    }
}

impl From<EventSource> for String {
    fn from(source: EventSource) -> Self {
        source.to_string()
    }
}

impl TryFrom<String> for EventSource {
    type Error = uuid::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == SYSTEM_SOURCE {
            Ok(Self::System)
        } else {
            AgentId::parse(&value).map(Self::Agent)
        }
    }
}

/// An event as staged by the orchestrator or a detector, before the store
/// assigns a sequence id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// The turn this event belongs to.
    pub turn: u64,
    /// Authoring agent or `SYSTEM`.
    pub source: EventSource,
    /// Type tag.
    pub kind: EventKind,
    /// Free-text payload.
    pub content: String,
    /// Optional key of a related vector-store document.
    pub vector_ref: Option<MemoryId>,
}

impl NewEvent {
    /// A `DAILY_ACTION` event authored by `agent`.
    pub fn daily_action(turn: u64, agent: AgentId, content: impl Into<String>) -> Self {
        Self {
            turn,
            source: EventSource::Agent(agent),
            kind: EventKind::DailyAction,
            content: content.into(),
            vector_ref: None,
        }
    }

    /// A `REFLECTION` event authored by `agent`, linked to the memory
    /// document it was fed back into.
    pub fn reflection(
        turn: u64,
        agent: AgentId,
        content: impl Into<String>,
        vector_ref: Option<MemoryId>,
    ) -> Self {
        Self {
            turn,
            source: EventSource::Agent(agent),
            kind: EventKind::Reflection,
            content: content.into(),
            vector_ref,
        }
    }

    /// A `SYSTEM` event of the given kind.
    pub fn system(turn: u64, kind: EventKind, content: impl Into<String>) -> Self {
        Self {
            turn,
            source: EventSource::System,
            kind,
            content: content.into(),
            vector_ref: None,
        }
    }
}

/// A persisted, immutable event log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Monotonic sequence id assigned by the store.
    pub id: i64,
    /// The turn this event belongs to.
    pub turn: u64,
    /// Authoring agent id or `SYSTEM`.
    #[ts(type = "string")]
    pub source: EventSource,
    /// Type tag.
    pub kind: EventKind,
    /// Free-text payload.
    pub content: String,
    /// Optional key of a related vector-store document.
    pub vector_ref: Option<MemoryId>,
    /// When the store accepted the row.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Epochs
// ---------------------------------------------------------------------------

/// A detected era, before insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEpoch {
    /// Sanitized era name (single line, at most 100 characters).
    pub name: String,
    /// First turn of the era (inclusive).
    pub turn_start: u64,
    /// Turn the era ends at (exclusive); `None` while open.
    pub turn_end: Option<u64>,
    /// Generative art prompt describing the era.
    pub master_prompt: Option<String>,
}

/// A persisted historical era.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Epoch {
    /// Sequence id assigned by the store.
    pub id: i64,
    /// Sanitized era name.
    pub name: String,
    /// First turn of the era (inclusive).
    pub turn_start: u64,
    /// Turn the era ends at (exclusive); `None` while open.
    pub turn_end: Option<u64>,
    /// Generative art prompt describing the era.
    pub master_prompt: Option<String>,
    /// When the store accepted the row.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// A unit of an agent's experience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Identifier, also the vector-store key once promoted.
    pub id: MemoryId,
    /// Turn of origin.
    pub timestamp: u64,
    /// The remembered text. Rewritten by entropy injection.
    pub content: String,
    /// How much this memory matters, in `0.0..=1.0`.
    pub importance: f64,
    /// Accumulated distortion. Never decreases.
    pub entropy_level: f64,
}

impl MemoryItem {
    /// Create a fresh, undistorted memory. Importance is clamped to
    /// `0.0..=1.0`.
    pub fn new(content: impl Into<String>, importance: f64, timestamp: u64) -> Self {
        Self {
            id: MemoryId::new(),
            timestamp,
            content: content.into(),
            importance: importance.clamp(0.0, 1.0),
            entropy_level: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Immutable agent identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Stable id.
    pub id: AgentId,
    /// Display name, e.g. `Agent-0`.
    pub name: String,
    /// Personality tag, e.g. `Curious pioneer`.
    pub personality: String,
    /// Skill levels keyed by skill name, each in `0.0..=1.0`.
    pub skills: BTreeMap<String, f64>,
}

/// Maslow-style needs, each in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Needs {
    /// Food, water, shelter.
    pub survival: f64,
    /// Freedom from threat.
    pub safety: f64,
    /// Company of others.
    pub belonging: f64,
    /// Recognition.
    pub esteem: f64,
    /// Growth.
    pub self_actualization: f64,
}

impl Default for Needs {
    fn default() -> Self {
        Self {
            survival: 1.0,
            safety: 1.0,
            belonging: 0.5,
            esteem: 0.5,
            self_actualization: 0.1,
        }
    }
}

/// A point in the sandbox, both axes within [`COORD_MIN`]..=[`COORD_MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Create a position, clamping both axes into range.
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(COORD_MIN, COORD_MAX),
            y: y.clamp(COORD_MIN, COORD_MAX),
        }
    }

    /// Move by `(dx, dy)`, clamping the result into range.
    #[must_use]
    pub const fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(50.0, 50.0)
    }
}

/// Mutable per-agent state that evolves turn by turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Stamina, `0.0..=1.0`; decreases with actions.
    pub energy: f64,
    /// Rises with repetitive actions, `0.0..=1.0`.
    pub boredom: f64,
    /// Drive to seek novelty, `0.0..=1.0`.
    pub curiosity: f64,
    /// Current needs.
    pub needs: Needs,
    /// Displayed location in the sandbox.
    pub position: Position,
    /// Last displayed emotion.
    pub emotion: Emotion,
    /// Last displayed action label.
    pub action: ActionLabel,
    /// Last displayed speech excerpt.
    pub speech: String,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            energy: 1.0,
            boredom: 0.0,
            curiosity: 1.0,
            needs: Needs::default(),
            position: Position::default(),
            emotion: Emotion::default(),
            action: ActionLabel::default(),
            speech: String::new(),
        }
    }
}

/// Output of the action classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionClassification {
    /// Emotional tag.
    pub emotion: Emotion,
    /// Coarse action label.
    pub action: ActionLabel,
    /// Short speech excerpt.
    pub speech: String,
}

// ---------------------------------------------------------------------------
// Sandbox snapshot
// ---------------------------------------------------------------------------

/// One agent as shown in the sandbox view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentView {
    /// Agent id.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// Emotion glyph.
    pub emotion: String,
    /// Action label.
    pub action: String,
    /// Speech excerpt.
    pub speech: String,
}

/// Point-in-time view of the sandbox, published after every turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SandboxSnapshot {
    /// The turn that just finished.
    pub turn: u64,
    /// Every agent, in roster order.
    pub agents: Vec<AgentView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_source_round_trips_through_string() {
        let agent = AgentId::new();
        let source = EventSource::Agent(agent);
        assert_eq!(EventSource::try_from(source.to_string()).ok(), Some(source));
        assert_eq!(
            EventSource::try_from(String::from("SYSTEM")).ok(),
            Some(EventSource::System)
        );
    }

    #[test]
    fn event_source_serializes_as_plain_string() {
        let json = serde_json::to_string(&EventSource::System).ok();
        assert_eq!(json.as_deref(), Some("\"SYSTEM\""));
    }

    #[test]
    fn memory_importance_is_clamped() {
        let high = MemoryItem::new("flood", 1.7, 3);
        let low = MemoryItem::new("drizzle", -0.2, 3);
        assert!((high.importance - 1.0).abs() < f64::EPSILON);
        assert!(low.importance.abs() < f64::EPSILON);
        assert!(high.entropy_level.abs() < f64::EPSILON);
    }

    #[test]
    fn position_offset_clamps_to_range() {
        let corner = Position::new(98.0, 1.0).offset(5.0, -5.0);
        assert!((corner.x - COORD_MAX).abs() < f64::EPSILON);
        assert!((corner.y - COORD_MIN).abs() < f64::EPSILON);
    }

    #[test]
    fn daily_action_constructor_sets_kind_and_source() {
        let agent = AgentId::new();
        let event = NewEvent::daily_action(4, agent, "gathered berries");
        assert_eq!(event.kind, EventKind::DailyAction);
        assert_eq!(event.source.agent(), Some(agent));
        assert!(event.vector_ref.is_none());
    }
}
