//! Enumeration types for the Entropy Civ simulation.
//!
//! Event kinds are persisted as upper-case tags (`DAILY_ACTION`, ...) so
//! the stored log stays readable by tools outside this workspace. Emotion
//! and action labels are the coarse display tags derived by the action
//! classifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error returned when a persisted tag does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} tag: {tag}")]
pub struct UnknownTag {
    /// Which enumeration was being parsed.
    pub kind: &'static str,
    /// The offending tag.
    pub tag: String,
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// The type tag carried by every row in the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// What an agent did during the day.
    DailyAction,
    /// A nightly reflection, factual or mythologized.
    Reflection,
    /// A narrative summary over a trailing window of turns.
    ChronicleSummary,
    /// A newly detected historical era.
    Epoch,
}

impl EventKind {
    /// Every known kind, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::DailyAction,
        Self::Reflection,
        Self::ChronicleSummary,
        Self::Epoch,
    ];

    /// The persisted tag for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DailyAction => "DAILY_ACTION",
            Self::Reflection => "REFLECTION",
            Self::ChronicleSummary => "CHRONICLE_SUMMARY",
            Self::Epoch => "EPOCH",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownTag {
                kind: "event kind",
                tag: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Display tags
// ---------------------------------------------------------------------------

/// Coarse emotional tag shown above an agent in the sandbox view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Emotion {
    /// Asleep or resting.
    Sleeping,
    /// Deep in thought.
    Thinking,
    /// Struck by a discovery or idea.
    Inspired,
    /// Talking or otherwise active. The default.
    #[default]
    Speaking,
    /// Lost or unsure.
    Confused,
}

impl Emotion {
    /// The glyph the presentation layer renders for this emotion.
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Sleeping => "\u{1F4A4}",
            Self::Thinking => "\u{1F914}",
            Self::Inspired => "\u{1F4A1}",
            Self::Speaking => "\u{1F4AC}",
            Self::Confused => "\u{2753}",
        }
    }
}

/// Coarse action label shown alongside an agent in the sandbox view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ActionLabel {
    /// Sleeping or recovering.
    Resting,
    /// Pondering.
    Thinking,
    /// Finding something new.
    Discovering,
    /// Talking with neighbors.
    Conversing,
    /// Lost.
    Confused,
    /// Nothing more specific matched. The default.
    #[default]
    Wandering,
}

impl ActionLabel {
    /// Human-readable label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resting => "Resting",
            Self::Thinking => "Thinking",
            Self::Discovering => "Discovering",
            Self::Conversing => "Conversing",
            Self::Confused => "Confused",
            Self::Wandering => "Wandering",
        }
    }
}

impl fmt::Display for ActionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_tags_parse_back() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().ok(), Some(kind));
        }
    }

    #[test]
    fn unknown_event_kind_is_rejected() {
        let err = "LOCAL_CHAT".parse::<EventKind>();
        assert!(err.is_err());
    }

    #[test]
    fn event_kind_serializes_as_tag() {
        let json = serde_json::to_string(&EventKind::ChronicleSummary).ok();
        assert_eq!(json.as_deref(), Some("\"CHRONICLE_SUMMARY\""));
    }

    #[test]
    fn display_defaults() {
        assert_eq!(Emotion::default(), Emotion::Speaking);
        assert_eq!(ActionLabel::default(), ActionLabel::Wandering);
        assert_eq!(Emotion::Sleeping.glyph(), "\u{1F4A4}");
    }
}
