//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup. Once the turn loop
//! is running nothing is fatal, so these only surface from `main` before the
//! first turn.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: civ_core::ConfigError,
    },

    /// A cadence was misconfigured.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: civ_core::ClockError,
    },

    /// The LLM environment configuration is invalid.
    #[error("LLM config error: {source}")]
    Llm {
        /// The underlying LLM config error.
        #[from]
        source: civ_llm::LlmConfigError,
    },

    /// Prompt templates failed to load.
    #[error("prompt error: {source}")]
    Prompt {
        /// The underlying template error.
        #[from]
        source: civ_llm::PromptError,
    },

    /// The database could not be reached or migrated.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: civ_db::DbError,
    },
}
