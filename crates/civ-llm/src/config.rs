//! Model configuration loaded from environment variables.
//!
//! The simulation config file says nothing about models; everything the
//! router needs (backend type, base URL, model names per tier, timeouts)
//! comes from the environment so a deployment can swap models without
//! touching the YAML.

use std::time::Duration;

use crate::error::LlmConfigError;

/// Default base URL of a local Ollama daemon.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Complete router configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Wire protocol of the backend.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `http://localhost:11434` or `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key, required only by the `OpenAI`-compatible backend.
    pub api_key: Option<String>,
    /// Model names per tier.
    pub models: TierModels,
    /// Deadlines per tier.
    pub timeouts: TierTimeouts,
}

/// Model names for each tier plus the embedding model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierModels {
    /// Cheap model for daily chatter.
    pub fast: String,
    /// Stronger model for reflection, myth-making, and era naming.
    pub smart: String,
    /// Embedding model.
    pub embed: String,
}

impl Default for TierModels {
    fn default() -> Self {
        Self {
            fast: "llama3.2:latest".to_owned(),
            smart: "gemma2:9b".to_owned(),
            embed: "mxbai-embed-large:latest".to_owned(),
        }
    }
}

/// Per-call deadlines for each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierTimeouts {
    /// Fast-tier deadline.
    pub fast: Duration,
    /// Smart-tier deadline.
    pub smart: Duration,
    /// Embedding deadline.
    pub embed: Duration,
}

impl Default for TierTimeouts {
    fn default() -> Self {
        Self {
            fast: Duration::from_secs(60),
            smart: Duration::from_secs(90),
            embed: Duration::from_secs(30),
        }
    }
}

/// Supported backend wire protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Ollama native API (`/api/generate`, `/api/embeddings`).
    Ollama,
    /// `OpenAI`-compatible API (`/chat/completions`, `/embeddings`).
    OpenAi,
}

impl LlmConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `LLM_BACKEND` -- `ollama` (default) or `openai`
    /// - `OLLAMA_BASE_URL` -- base URL (default `http://localhost:11434`)
    /// - `LLM_API_KEY` -- API key, required when `LLM_BACKEND=openai`
    /// - `LLM_FAST_MODEL` / `LLM_SMART_MODEL` / `LLM_EMBED_MODEL` -- model names
    /// - `LLM_FAST_TIMEOUT_MS` (60000) / `LLM_SMART_TIMEOUT_MS` (90000) /
    ///   `LLM_EMBED_TIMEOUT_MS` (30000) -- per-tier deadlines
    pub fn from_env() -> Result<Self, LlmConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// [`LlmConfig::from_env`] passes the process environment; tests pass a
    /// map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LlmConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_type = match lookup("LLM_BACKEND") {
            None => BackendType::Ollama,
            Some(raw) => parse_backend(&raw)?,
        };

        let api_url = lookup("OLLAMA_BASE_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_owned());
        let api_key = lookup("LLM_API_KEY");
        if backend_type == BackendType::OpenAi && api_key.is_none() {
            return Err(LlmConfigError::Missing("LLM_API_KEY".to_owned()));
        }

        let defaults = TierModels::default();
        let models = TierModels {
            fast: lookup("LLM_FAST_MODEL").unwrap_or(defaults.fast),
            smart: lookup("LLM_SMART_MODEL").unwrap_or(defaults.smart),
            embed: lookup("LLM_EMBED_MODEL").unwrap_or(defaults.embed),
        };

        let default_timeouts = TierTimeouts::default();
        let timeouts = TierTimeouts {
            fast: timeout_var(&lookup, "LLM_FAST_TIMEOUT_MS", default_timeouts.fast)?,
            smart: timeout_var(&lookup, "LLM_SMART_TIMEOUT_MS", default_timeouts.smart)?,
            embed: timeout_var(&lookup, "LLM_EMBED_TIMEOUT_MS", default_timeouts.embed)?,
        };

        Ok(Self {
            backend_type,
            api_url: api_url.trim_end_matches('/').to_owned(),
            api_key,
            models,
            timeouts,
        })
    }
}

/// Map a backend name onto its wire protocol.
fn parse_backend(raw: &str) -> Result<BackendType, LlmConfigError> {
    match raw.to_lowercase().as_str() {
        "ollama" => Ok(BackendType::Ollama),
        "openai" | "deepseek" | "vllm" => Ok(BackendType::OpenAi),
        other => Err(LlmConfigError::UnknownBackend(other.to_owned())),
    }
}

/// Read an optional millisecond timeout, falling back to `default`.
fn timeout_var<F>(lookup: &F, name: &str, default: Duration) -> Result<Duration, LlmConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    let ms: u64 = raw.parse().map_err(|e| LlmConfigError::InvalidValue {
        name: name.to_owned(),
        message: format!("{e}"),
    })?;
    Ok(Duration::from_millis(ms))
}
