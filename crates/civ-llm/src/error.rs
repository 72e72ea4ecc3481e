//! Error types for text generation, configuration, and prompt rendering.
//!
//! A [`GenerationError`] is always recoverable from the simulation's point
//! of view: callers skip the agent or detector step that needed the text
//! and carry on with the turn.

use crate::ModelTier;

/// A generation or embedding call that did not produce usable output.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The HTTP request could not be sent or the connection failed.
    #[error("{backend} request failed: {message}")]
    Request {
        /// Backend name (`ollama`, `openai-compatible`).
        backend: &'static str,
        /// Underlying transport error.
        message: String,
    },

    /// The backend answered with a non-success status code.
    #[error("{backend} returned {status}: {body}")]
    Status {
        /// Backend name.
        backend: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, if it could be read.
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("{backend} response malformed: {message}")]
    MalformedResponse {
        /// Backend name.
        backend: &'static str,
        /// What was missing or wrong.
        message: String,
    },

    /// The per-tier deadline elapsed before the backend answered.
    #[error("{tier} call timed out after {after_ms}ms")]
    Timeout {
        /// Which tier was being called (`embed` for embeddings).
        tier: &'static str,
        /// The deadline that elapsed.
        after_ms: u128,
    },

    /// The text carried the fallback marker.
    #[error("generator returned the fallback marker on the {tier} tier")]
    Fallback {
        /// The tier that produced the fallback.
        tier: ModelTier,
    },
}

/// The model configuration could not be loaded from the environment.
#[derive(Debug, thiserror::Error)]
pub enum LlmConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid {name}: {message}")]
    InvalidValue {
        /// Variable name.
        name: String,
        /// Parse failure description.
        message: String,
    },

    /// `LLM_BACKEND` named an unsupported backend.
    #[error("unknown backend type: {0}")]
    UnknownBackend(String),

    /// A variable required by the selected backend is unset.
    #[error("missing required env var {0}")]
    Missing(String),
}

/// A prompt template failed to load or render.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// A template override could not be read from disk.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path that failed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The template engine rejected a template or failed to render it.
    #[error("template {name}: {source}")]
    Template {
        /// Template name.
        name: &'static str,
        /// Underlying engine error.
        source: minijinja::Error,
    },
}
