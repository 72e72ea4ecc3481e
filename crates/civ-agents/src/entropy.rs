//! Entropy injection: controlled distortion of memories during consolidation.
//!
//! Every consolidated memory passes through an [`EntropyTransform`] before
//! it is written to long-term storage. [`Passthrough`] leaves content
//! untouched; [`Embellish`] exaggerates known words ("large wolf" becomes
//! "giant beast") with a configurable per-word probability, so myths
//! accumulate slowly as memories are re-consolidated.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Rewrites a memory's content. Must never touch importance.
pub trait EntropyTransform: Send + Sync {
    /// Return the distorted form of `content`. Empty input yields empty output.
    fn apply(&mut self, content: &str) -> String;
}

/// The identity transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl EntropyTransform for Passthrough {
    fn apply(&mut self, content: &str) -> String {
        content.to_owned()
    }
}

/// Word-level exaggerations, matched case-insensitively on whole words.
const EXAGGERATIONS: &[(&str, &str)] = &[
    ("large", "giant"),
    ("big", "colossal"),
    ("small", "tiny"),
    ("wolf", "beast"),
    ("dog", "wolf"),
    ("bird", "thunderbird"),
    ("storm", "tempest"),
    ("rain", "deluge"),
    ("fire", "inferno"),
    ("hill", "mountain"),
    ("river", "great river"),
    ("stranger", "spirit"),
    ("elder", "ancient one"),
    ("light", "divine light"),
    ("sound", "roar"),
    ("saw", "beheld"),
    ("found", "was granted"),
    ("fish", "sea serpent"),
];

/// Probabilistic word-level exaggeration.
pub struct Embellish {
    chance: f64,
    rng: StdRng,
}

impl Embellish {
    /// Create an embellisher that rewrites each known word with probability
    /// `chance` (clamped to `0.0..=1.0`), seeded from the OS.
    pub fn new(chance: f64) -> Self {
        Self {
            chance: chance.clamp(0.0, 1.0),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Create a reproducible embellisher.
    pub fn seeded(chance: f64, seed: u64) -> Self {
        Self {
            chance: chance.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl EntropyTransform for Embellish {
    fn apply(&mut self, content: &str) -> String {
        let mut out = String::with_capacity(content.len());
        let mut word = String::new();

        for c in content.chars() {
            if c.is_alphabetic() {
                word.push(c);
            } else {
                self.flush(&mut word, &mut out);
                out.push(c);
            }
        }
        self.flush(&mut word, &mut out);
        out
    }
}

impl Embellish {
    fn flush(&mut self, word: &mut String, out: &mut String) {
        if word.is_empty() {
            return;
        }
        let lower = word.to_lowercase();
        let replacement = EXAGGERATIONS
            .iter()
            .find(|(plain, _)| *plain == lower)
            .map(|(_, grand)| *grand);

        match replacement {
            Some(grand) if self.rng.random_bool(self.chance) => {
                out.push_str(&match_case(word, grand));
            }
            _ => out.push_str(word),
        }
        word.clear();
    }
}

/// Carry a leading capital over to the replacement.
fn match_case(original: &str, replacement: &str) -> String {
    let capitalized = original.chars().next().is_some_and(char::is_uppercase);
    if !capitalized {
        return replacement.to_owned();
    }
    let mut chars = replacement.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_is_identity() {
        let mut t = Passthrough;
        assert_eq!(t.apply("I saw a large wolf."), "I saw a large wolf.");
        assert_eq!(t.apply(""), "");
    }

    #[test]
    fn certain_embellishment_rewrites_every_known_word() {
        let mut t = Embellish::seeded(1.0, 7);
        assert_eq!(t.apply("I saw a large wolf."), "I beheld a giant beast.");
    }

    #[test]
    fn zero_chance_changes_nothing() {
        let mut t = Embellish::seeded(0.0, 7);
        assert_eq!(t.apply("A large wolf by the river"), "A large wolf by the river");
    }

    #[test]
    fn capitalization_is_preserved() {
        let mut t = Embellish::seeded(1.0, 1);
        assert_eq!(t.apply("Wolf tracks near the Hill"), "Beast tracks near the Mountain");
    }

    #[test]
    fn empty_input_stays_empty() {
        let mut t = Embellish::seeded(1.0, 3);
        assert_eq!(t.apply(""), "");
    }

    #[test]
    fn same_seed_same_myth() {
        let text = "A large dog chased a small bird through the rain near the river";
        let a = Embellish::seeded(0.5, 42).apply(text);
        let b = Embellish::seeded(0.5, 42).apply(text);
        assert_eq!(a, b);
    }
}
