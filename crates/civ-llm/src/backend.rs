//! HTTP backends for text generation and embeddings.
//!
//! Enum dispatch over the supported wire protocols, since async methods on
//! trait objects are not dyn-compatible. Each backend speaks one protocol:
//! the Ollama native API or an `OpenAI`-compatible chat/embeddings API.
//! Backends know nothing about tiers or timeouts; the router layers those
//! on top.

use crate::config::{BackendType, LlmConfig};
use crate::error::GenerationError;

/// A model backend that can complete a prompt and embed text.
pub enum LlmBackend {
    /// Ollama native API.
    Ollama(OllamaBackend),
    /// `OpenAI`-compatible API.
    OpenAi(OpenAiBackend),
}

impl LlmBackend {
    /// Create a backend from configuration.
    pub fn from_config(config: &LlmConfig) -> Self {
        match config.backend_type {
            BackendType::Ollama => Self::Ollama(OllamaBackend::new(&config.api_url)),
            BackendType::OpenAi => Self::OpenAi(OpenAiBackend::new(
                &config.api_url,
                config.api_key.as_deref().unwrap_or_default(),
            )),
        }
    }

    /// Complete `prompt` with `model` and return the trimmed response text.
    pub async fn complete(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        match self {
            Self::Ollama(backend) => backend.complete(model, prompt, temperature, max_tokens).await,
            Self::OpenAi(backend) => backend.complete(model, prompt, temperature, max_tokens).await,
        }
    }

    /// Embed `text` with `model`.
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, GenerationError> {
        match self {
            Self::Ollama(backend) => backend.embed(model, text).await,
            Self::OpenAi(backend) => backend.embed(model, text).await,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ollama(_) => OLLAMA,
            Self::OpenAi(_) => OPENAI,
        }
    }
}

const OLLAMA: &str = "ollama";
const OPENAI: &str = "openai-compatible";

// ---------------------------------------------------------------------------
// Ollama native backend
// ---------------------------------------------------------------------------

/// Backend for the Ollama native API.
///
/// Sends non-streaming requests to `{api_url}/api/generate` and
/// `{api_url}/api/embeddings`.
pub struct OllamaBackend {
    client: reqwest::Client,
    api_url: String,
}

impl OllamaBackend {
    /// Create a new Ollama backend.
    pub fn new(api_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_owned(),
        }
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.api_url);
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens,
            }
        });

        let json = post_json(&self.client, OLLAMA, &url, &body, None).await?;
        extract_ollama_content(&json)
    }

    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, GenerationError> {
        let url = format!("{}/api/embeddings", self.api_url);
        let body = serde_json::json!({
            "model": model,
            "prompt": text,
        });

        let json = post_json(&self.client, OLLAMA, &url, &body, None).await?;
        extract_embedding(OLLAMA, json.get("embedding"))
    }
}

/// Extract the text from an Ollama `/api/generate` response.
fn extract_ollama_content(json: &serde_json::Value) -> Result<String, GenerationError> {
    json.get("response")
        .and_then(serde_json::Value::as_str)
        .map(|text| text.trim().to_owned())
        .ok_or_else(|| GenerationError::MalformedResponse {
            backend: OLLAMA,
            message: "missing response field".to_owned(),
        })
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for `OpenAI`-compatible chat completions APIs.
///
/// Works with `OpenAI`, `DeepSeek`, vLLM, and Ollama's compatibility layer.
/// Sends requests to `{api_url}/chat/completions` and `{api_url}/embeddings`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    pub fn new(api_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_owned(),
            api_key: api_key.to_owned(),
        }
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.api_url);
        let body = serde_json::json!({
            "model": model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let json = post_json(&self.client, OPENAI, &url, &body, Some(&self.api_key)).await?;
        extract_openai_content(&json)
    }

    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, GenerationError> {
        let url = format!("{}/embeddings", self.api_url);
        let body = serde_json::json!({
            "model": model,
            "input": text,
        });

        let json = post_json(&self.client, OPENAI, &url, &body, Some(&self.api_key)).await?;
        let embedding = json
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("embedding"));
        extract_embedding(OPENAI, embedding)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, GenerationError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(|text| text.trim().to_owned())
        .ok_or_else(|| GenerationError::MalformedResponse {
            backend: OPENAI,
            message: "missing choices[0].message.content".to_owned(),
        })
}

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

/// POST a JSON body and return the parsed JSON response.
async fn post_json(
    client: &reqwest::Client,
    backend: &'static str,
    url: &str,
    body: &serde_json::Value,
    bearer: Option<&str>,
) -> Result<serde_json::Value, GenerationError> {
    let mut request = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(body);
    if let Some(key) = bearer {
        request = request.header("Authorization", format!("Bearer {key}"));
    }

    let response = request.send().await.map_err(|e| GenerationError::Request {
        backend,
        message: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error body".to_owned());
        return Err(GenerationError::Status {
            backend,
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| GenerationError::MalformedResponse {
            backend,
            message: format!("response parse failed: {e}"),
        })
}

/// Convert a JSON number array into an embedding vector.
#[allow(clippy::cast_possible_truncation)]
fn extract_embedding(
    backend: &'static str,
    value: Option<&serde_json::Value>,
) -> Result<Vec<f32>, GenerationError> {
    let malformed = |message: &str| GenerationError::MalformedResponse {
        backend,
        message: message.to_owned(),
    };

    let values = value
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| malformed("missing embedding array"))?;
    if values.is_empty() {
        return Err(malformed("empty embedding"));
    }

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| malformed("non-numeric embedding component"))
        })
        .collect()
}
