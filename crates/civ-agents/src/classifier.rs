//! Keyword classifier mapping free-text actions onto display tags.
//!
//! Rules are evaluated top-down on the lower-cased text and the first rule
//! with any matching keyword wins. Matching is plain substring search, so
//! "what" also matches inside "whatever".

use civ_types::{ActionClassification, ActionLabel, Emotion};

/// One classifier rule.
struct Rule {
    keywords: &'static [&'static str],
    emotion: Emotion,
    action: ActionLabel,
}

/// Ordered rule table. Earlier rules take precedence.
const RULES: &[Rule] = &[
    Rule {
        keywords: &["sleep", "rest", "night", "tired"],
        emotion: Emotion::Sleeping,
        action: ActionLabel::Resting,
    },
    Rule {
        keywords: &["think", "ponder", "wonder", "reflect"],
        emotion: Emotion::Thinking,
        action: ActionLabel::Thinking,
    },
    Rule {
        keywords: &["discover", "found", "aha", "idea"],
        emotion: Emotion::Inspired,
        action: ActionLabel::Discovering,
    },
    Rule {
        keywords: &["talk", "discuss", "speak", "ask", "say"],
        emotion: Emotion::Speaking,
        action: ActionLabel::Conversing,
    },
    Rule {
        keywords: &["confused", "lost", "don't know", "what"],
        emotion: Emotion::Confused,
        action: ActionLabel::Confused,
    },
];

/// Texts longer than this many characters get a truncated speech excerpt.
pub const SPEECH_LIMIT: usize = 20;

/// Classify an action text into emotion, action label, and speech excerpt.
pub fn classify(text: &str) -> ActionClassification {
    let lower = text.to_lowercase();
    let (emotion, action) = RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| lower.contains(kw)))
        .map_or((Emotion::default(), ActionLabel::default()), |rule| {
            (rule.emotion, rule.action)
        });

    ActionClassification {
        emotion,
        action,
        speech: speech_excerpt(text),
    }
}

/// The text up to its first `.` followed by `...` when the text is longer
/// than [`SPEECH_LIMIT`] characters; otherwise the whole text.
pub fn speech_excerpt(text: &str) -> String {
    if text.chars().count() > SPEECH_LIMIT {
        let first = text.split('.').next().unwrap_or_default();
        format!("{first}...")
    } else {
        text.to_owned()
    }
}
