//! Tiered text generation for the Entropy Civ simulation.
//!
//! Every piece of free text in the simulation (daily actions, reflections,
//! era names, chronicles) comes from a [`TextGenerator`]. Production code
//! uses [`LlmRouter`], which talks to an Ollama or `OpenAI`-compatible
//! server and bounds each call with a per-tier deadline. Tests substitute
//! scripted generators.
//!
//! # Failure semantics
//!
//! A generation call either yields text (possibly empty) or a
//! [`GenerationError`]. Text containing [`FALLBACK_MARKER`] is never a
//! success: [`reject_fallback`] turns it into [`GenerationError::Fallback`]
//! so callers only ever branch on `Result`.
//!
//! # Modules
//!
//! - [`backend`] -- HTTP backends (Ollama native, `OpenAI`-compatible)
//! - [`config`] -- Environment-driven model configuration
//! - [`error`] -- Error types
//! - [`prompt`] -- `minijinja` prompt templates
//! - [`router`] -- Tier routing with per-call timeouts

pub mod backend;
pub mod config;
pub mod error;
pub mod prompt;
pub mod router;

use std::fmt;
use std::future::Future;

pub use config::{BackendType, LlmConfig, TierModels, TierTimeouts};
pub use error::{GenerationError, LlmConfigError, PromptError};
pub use prompt::PromptEngine;
pub use router::LlmRouter;

/// Sentinel that marks a failed generation in returned text.
pub const FALLBACK_MARKER: &str = "[FALLBACK]";

/// The canned text a generator emits when it gives up.
pub const FALLBACK_TEXT: &str = "[FALLBACK] The agent pondered silently.";

/// Which class of model serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    /// Cheap and quick; used for daily chatter.
    Fast,
    /// Stronger; used for reflection, myth-making, and era naming.
    Smart,
}

impl ModelTier {
    /// Lower-case tier name for logs and errors.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Smart => "smart",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can turn a prompt into text.
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt` on `tier`.
    ///
    /// Returns `Ok` with possibly-empty text on success. Timeouts, transport
    /// failures, and fallback-marked text are all errors.
    fn generate(
        &self,
        tier: ModelTier,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// Whether `text` carries the fallback marker.
pub fn is_fallback(text: &str) -> bool {
    text.contains(FALLBACK_MARKER)
}

/// Pass `text` through unless it carries the fallback marker.
pub fn reject_fallback(tier: ModelTier, text: String) -> Result<String, GenerationError> {
    if is_fallback(&text) {
        Err(GenerationError::Fallback { tier })
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_text_is_detected() {
        assert!(is_fallback(FALLBACK_TEXT));
        assert!(is_fallback("prefix [FALLBACK] suffix"));
        assert!(!is_fallback("Agent-2 built a fire."));
    }

    #[test]
    fn reject_fallback_keeps_empty_text() {
        let empty = reject_fallback(ModelTier::Fast, String::new());
        assert_eq!(empty.ok().as_deref(), Some(""));

        let failed = reject_fallback(ModelTier::Smart, FALLBACK_TEXT.to_owned());
        assert!(matches!(
            failed,
            Err(GenerationError::Fallback { tier: ModelTier::Smart })
        ));
    }
}
